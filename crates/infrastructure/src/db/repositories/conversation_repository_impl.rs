//! 会话 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Conversation, ConversationId, PairKey, RepositoryError, UserId};
use sqlx::{query, query_as, FromRow};
use uuid::Uuid;

use super::{map_sqlx_err, pair_from_columns};
use crate::db::DbPool;
use crate::retry::{retry_repository, RetryConfig};

/// 数据库会话模型
#[derive(Debug, Clone, FromRow)]
struct ConversationRecord {
    id: Uuid,
    user_a: Uuid,
    user_b: Uuid,
    created_at: DateTime<Utc>,
    unread_a: i32,
    unread_b: i32,
}

impl TryFrom<ConversationRecord> for Conversation {
    type Error = RepositoryError;

    fn try_from(record: ConversationRecord) -> Result<Self, Self::Error> {
        let pair = pair_from_columns(record.user_a, record.user_b)?;
        let mut conversation =
            Conversation::new(ConversationId::from(record.id), pair, record.created_at);
        conversation.unread_a = u32::try_from(record.unread_a).unwrap_or(0);
        conversation.unread_b = u32::try_from(record.unread_b).unwrap_or(0);
        Ok(conversation)
    }
}

const SELECT_COLUMNS: &str = "id, user_a, user_b, created_at, unread_a, unread_b";

pub struct PostgresConversationRepository {
    pool: DbPool,
    retry: RetryConfig,
}

impl PostgresConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            retry: RetryConfig::default(),
        }
    }

    async fn fetch_by_pair(&self, pair: PairKey) -> Result<Option<Conversation>, RepositoryError> {
        let record = query_as::<_, ConversationRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM conversations WHERE user_a = $1 AND user_b = $2"
        ))
        .bind(Uuid::from(pair.user_a()))
        .bind(Uuid::from(pair.user_b()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        record.map(Conversation::try_from).transpose()
    }
}

#[async_trait]
impl application::ConversationRepository for PostgresConversationRepository {
    async fn get_or_create(
        &self,
        candidate: Conversation,
    ) -> Result<(Conversation, bool), RepositoryError> {
        let inserted = query_as::<_, ConversationRecord>(&format!(
            r#"
            INSERT INTO conversations (id, user_a, user_b, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_a, user_b) DO NOTHING
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(Uuid::from(candidate.id))
        .bind(Uuid::from(candidate.pair.user_a()))
        .bind(Uuid::from(candidate.pair.user_b()))
        .bind(candidate.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if let Some(record) = inserted {
            return Ok((record.try_into()?, true));
        }

        let existing = self
            .fetch_by_pair(candidate.pair)
            .await?
            .ok_or_else(|| RepositoryError::storage("conflicting conversation row disappeared"))?;
        Ok((existing, false))
    }

    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let record = query_as::<_, ConversationRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        record.map(Conversation::try_from).transpose()
    }

    async fn find_by_pair(&self, pair: PairKey) -> Result<Option<Conversation>, RepositoryError> {
        self.fetch_by_pair(pair).await
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Conversation>, RepositoryError> {
        // 只读查询，瞬态错误下有界重试
        let records = retry_repository(&self.retry, || async {
            query_as::<_, ConversationRecord>(&format!(
                r#"
                SELECT {SELECT_COLUMNS} FROM conversations
                WHERE user_a = $1 OR user_b = $1
                ORDER BY created_at DESC
                "#
            ))
            .bind(Uuid::from(user))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)
        })
        .await?;
        records
            .into_iter()
            .map(Conversation::try_from)
            .collect()
    }

    async fn increment_unread(
        &self,
        id: ConversationId,
        for_user: UserId,
    ) -> Result<(), RepositoryError> {
        // 单条 UPDATE 原子加一，按参与者落到对应计数列
        query(
            r#"
            UPDATE conversations
            SET unread_a = unread_a + CASE WHEN user_a = $2 THEN 1 ELSE 0 END,
                unread_b = unread_b + CASE WHEN user_b = $2 THEN 1 ELSE 0 END
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(for_user))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn clear_unread(
        &self,
        id: ConversationId,
        for_user: UserId,
    ) -> Result<(), RepositoryError> {
        query(
            r#"
            UPDATE conversations
            SET unread_a = CASE WHEN user_a = $2 THEN 0 ELSE unread_a END,
                unread_b = CASE WHEN user_b = $2 THEN 0 ELSE unread_b END
            WHERE id = $1
            "#,
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(for_user))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(())
    }
}
