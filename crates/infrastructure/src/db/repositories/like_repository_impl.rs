//! 点赞边 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Like, LikeId, RepositoryError, UserId};
use sqlx::{query, query_as, query_scalar, FromRow};
use uuid::Uuid;

use super::map_sqlx_err;
use crate::db::DbPool;

/// 数据库点赞模型
#[derive(Debug, Clone, FromRow)]
struct LikeRecord {
    id: Uuid,
    from_user_id: Uuid,
    to_user_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<LikeRecord> for Like {
    type Error = RepositoryError;

    fn try_from(record: LikeRecord) -> Result<Self, Self::Error> {
        Like::new(
            LikeId::from(record.id),
            UserId::from(record.from_user_id),
            UserId::from(record.to_user_id),
            record.created_at,
        )
        .map_err(|_| RepositoryError::storage("stored like targets its own author"))
    }
}

pub struct PostgresLikeRepository {
    pool: DbPool,
}

impl PostgresLikeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl application::LikeRepository for PostgresLikeRepository {
    async fn insert(&self, like: Like) -> Result<Like, RepositoryError> {
        // 同向重复点赞由唯一约束兜底，冲突时无副作用
        let inserted = query_as::<_, LikeRecord>(
            r#"
            INSERT INTO likes (id, from_user_id, to_user_id, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (from_user_id, to_user_id) DO NOTHING
            RETURNING id, from_user_id, to_user_id, created_at
            "#,
        )
        .bind(Uuid::from(like.id))
        .bind(Uuid::from(like.from_user))
        .bind(Uuid::from(like.to_user))
        .bind(like.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match inserted {
            Some(record) => record.try_into(),
            None => Err(RepositoryError::Conflict),
        }
    }

    async fn delete(&self, from: UserId, to: UserId) -> Result<bool, RepositoryError> {
        let result = query("DELETE FROM likes WHERE from_user_id = $1 AND to_user_id = $2")
            .bind(Uuid::from(from))
            .bind(Uuid::from(to))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn exists(&self, from: UserId, to: UserId) -> Result<bool, RepositoryError> {
        let exists = query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM likes WHERE from_user_id = $1 AND to_user_id = $2)",
        )
        .bind(Uuid::from(from))
        .bind(Uuid::from(to))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(exists)
    }
}
