//! 通知 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    Notification, NotificationId, NotificationKind, RepositoryError, Timestamp, UserId,
};
use sqlx::{query, query_as, query_scalar, FromRow};
use uuid::Uuid;

use super::map_sqlx_err;
use crate::db::DbPool;

/// 数据库通知模型
#[derive(Debug, Clone, FromRow)]
struct NotificationRecord {
    id: Uuid,
    user_id: Uuid,
    kind: String,
    title: String,
    content: String,
    related_user_id: Option<Uuid>,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        Notification {
            id: NotificationId::from(record.id),
            user_id: UserId::from(record.user_id),
            kind: NotificationKind::from(record.kind.as_str()),
            title: record.title,
            content: record.content,
            related_user_id: record.related_user_id.map(UserId::from),
            read: record.is_read,
            created_at: record.created_at,
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, user_id, kind, title, content, related_user_id, is_read, created_at";

pub struct PostgresNotificationRepository {
    pool: DbPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl application::NotificationRepository for PostgresNotificationRepository {
    async fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let record = query_as::<_, NotificationRecord>(&format!(
            r#"
            INSERT INTO notifications (id, user_id, kind, title, content, related_user_id, is_read, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(Uuid::from(notification.id))
        .bind(Uuid::from(notification.user_id))
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.content)
        .bind(notification.related_user_id.map(Uuid::from))
        .bind(notification.read)
        .bind(notification.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(record.into())
    }

    async fn list_for_user(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let records = query_as::<_, NotificationRecord>(&format!(
            r#"
            SELECT {SELECT_COLUMNS} FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(Uuid::from(user))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(records.into_iter().map(Notification::from).collect())
    }

    async fn mark_read(&self, id: NotificationId, user: UserId) -> Result<bool, RepositoryError> {
        let result = query(
            r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE id = $1 AND user_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(user))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn profile_view_exists_since(
        &self,
        viewed: UserId,
        viewer: UserId,
        since: Timestamp,
    ) -> Result<bool, RepositoryError> {
        let exists = query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM notifications
                WHERE user_id = $1 AND related_user_id = $2
                  AND kind = 'profile_view' AND created_at >= $3
            )
            "#,
        )
        .bind(Uuid::from(viewed))
        .bind(Uuid::from(viewer))
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(exists)
    }
}
