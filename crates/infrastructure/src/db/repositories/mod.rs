//! 存储接口的 PostgreSQL 实现
//!
//! 匹配与会话的唯一性都落在数据库唯一约束上，条件写入用
//! `ON CONFLICT ... DO NOTHING` 表达：赢家拿到 RETURNING 行，
//! 落败方读到已存在的行。进程内不做任何正确性判断。

use domain::{PairKey, RepositoryError, UserId};
use uuid::Uuid;

pub mod conversation_repository_impl;
pub mod like_repository_impl;
pub mod match_repository_impl;
pub mod message_repository_impl;
pub mod notification_repository_impl;

pub use conversation_repository_impl::PostgresConversationRepository;
pub use like_repository_impl::PostgresLikeRepository;
pub use match_repository_impl::PostgresMatchRepository;
pub use message_repository_impl::PostgresMessageRepository;
pub use notification_repository_impl::PostgresNotificationRepository;

/// sqlx 错误到存储层错误的统一映射。唯一约束冲突单独区分，
/// 其余归为可重试的存储错误。
pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict;
        }
    }
    RepositoryError::storage(err.to_string())
}

/// 从已存储的两列恢复规范化用户对。表上有 CHECK (user_a < user_b)，
/// 这里失败只可能是数据损坏。
pub(crate) fn pair_from_columns(user_a: Uuid, user_b: Uuid) -> Result<PairKey, RepositoryError> {
    PairKey::new(UserId::from(user_a), UserId::from(user_b))
        .map_err(|_| RepositoryError::storage("stored pair has identical users"))
}
