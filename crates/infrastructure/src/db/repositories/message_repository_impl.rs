//! 消息 Repository 实现
//!
//! 序列号由 `seq BIGSERIAL` 在插入时分配，是会话内唯一的全序依据：
//! `created_at` 由服务进程取样，并发提交下可能与提交顺序倒挂，
//! 只作展示字段，排序和游标都只看 `seq`。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ConversationId, Message, MessageContent, MessageId, RepositoryError, Timestamp, UserId,
};
use sqlx::{query, query_as, FromRow};
use uuid::Uuid;

use super::map_sqlx_err;
use crate::db::DbPool;

/// 数据库消息模型。`read` 是 SQL 关键字，列名用 `is_read`。
#[derive(Debug, Clone, FromRow)]
struct MessageRecord {
    id: Uuid,
    conversation_id: Uuid,
    sender_id: Uuid,
    receiver_id: Uuid,
    content: String,
    seq: i64,
    created_at: DateTime<Utc>,
    is_read: bool,
    read_at: Option<DateTime<Utc>>,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Message {
            id: MessageId::from(record.id),
            conversation_id: ConversationId::from(record.conversation_id),
            sender_id: UserId::from(record.sender_id),
            receiver_id: UserId::from(record.receiver_id),
            content: MessageContent::from_stored(record.content),
            seq: record.seq,
            created_at: record.created_at,
            read: record.is_read,
            read_at: record.read_at,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, conversation_id, sender_id, receiver_id, content, seq, created_at, is_read, read_at";

pub struct PostgresMessageRepository {
    pool: DbPool,
}

impl PostgresMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl application::MessageRepository for PostgresMessageRepository {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, receiver_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.conversation_id))
        .bind(Uuid::from(message.sender_id))
        .bind(Uuid::from(message.receiver_id))
        .bind(message.content.as_str())
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(record.into())
    }

    async fn list_page(
        &self,
        conversation_id: ConversationId,
        after_seq: Option<i64>,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM messages
            WHERE conversation_id = $1 AND seq > COALESCE($2, 0)
            ORDER BY seq ASC
            LIMIT $3
            "#
        ))
        .bind(Uuid::from(conversation_id))
        .bind(after_seq)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(records.into_iter().map(Message::from).collect())
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
        at: Timestamp,
    ) -> Result<u64, RepositoryError> {
        // 只触达未读行，已设置的 read_at 不被覆盖
        let result = query(
            r#"
            UPDATE messages
            SET is_read = TRUE, read_at = $3
            WHERE conversation_id = $1 AND receiver_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(Uuid::from(conversation_id))
        .bind(Uuid::from(reader))
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected())
    }
}
