//! 匹配 Repository 实现

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Match, MatchId, PairKey, RepositoryError, UserId};
use sqlx::{query_as, FromRow};
use uuid::Uuid;

use super::{map_sqlx_err, pair_from_columns};
use crate::db::DbPool;
use crate::retry::{retry_repository, RetryConfig};

/// 数据库匹配模型
#[derive(Debug, Clone, FromRow)]
struct MatchRecord {
    id: Uuid,
    user_a: Uuid,
    user_b: Uuid,
    matched_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<MatchRecord> for Match {
    type Error = RepositoryError;

    fn try_from(record: MatchRecord) -> Result<Self, Self::Error> {
        let pair = pair_from_columns(record.user_a, record.user_b)?;
        Ok(Match::new(
            MatchId::from(record.id),
            pair,
            UserId::from(record.matched_by),
            record.created_at,
        ))
    }
}

pub struct PostgresMatchRepository {
    pool: DbPool,
    retry: RetryConfig,
}

impl PostgresMatchRepository {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            retry: RetryConfig::default(),
        }
    }

    async fn fetch_by_pair(&self, pair: PairKey) -> Result<Option<Match>, RepositoryError> {
        let record = query_as::<_, MatchRecord>(
            r#"
            SELECT id, user_a, user_b, matched_by, created_at
            FROM matches
            WHERE user_a = $1 AND user_b = $2
            "#,
        )
        .bind(Uuid::from(pair.user_a()))
        .bind(Uuid::from(pair.user_b()))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        record.map(Match::try_from).transpose()
    }
}

#[async_trait]
impl application::MatchRepository for PostgresMatchRepository {
    async fn create_if_absent(&self, candidate: Match) -> Result<(Match, bool), RepositoryError> {
        // 唯一约束 (user_a, user_b) 仲裁并发创建：赢家拿到 RETURNING 行
        let inserted = query_as::<_, MatchRecord>(
            r#"
            INSERT INTO matches (id, user_a, user_b, matched_by, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_a, user_b) DO NOTHING
            RETURNING id, user_a, user_b, matched_by, created_at
            "#,
        )
        .bind(Uuid::from(candidate.id))
        .bind(Uuid::from(candidate.pair.user_a()))
        .bind(Uuid::from(candidate.pair.user_b()))
        .bind(Uuid::from(candidate.matched_by))
        .bind(candidate.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if let Some(record) = inserted {
            return Ok((record.try_into()?, true));
        }

        // 落败方读取赢家的行
        let existing = self
            .fetch_by_pair(candidate.pair)
            .await?
            .ok_or_else(|| RepositoryError::storage("conflicting match row disappeared"))?;
        Ok((existing, false))
    }

    async fn find_by_pair(&self, pair: PairKey) -> Result<Option<Match>, RepositoryError> {
        self.fetch_by_pair(pair).await
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Match>, RepositoryError> {
        // 只读查询，瞬态错误下有界重试
        let records = retry_repository(&self.retry, || async {
            query_as::<_, MatchRecord>(
                r#"
                SELECT id, user_a, user_b, matched_by, created_at
                FROM matches
                WHERE user_a = $1 OR user_b = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(Uuid::from(user))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_err)
        })
        .await?;
        records.into_iter().map(Match::try_from).collect()
    }
}
