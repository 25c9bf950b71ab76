//! 存储层错误定义
//!
//! 持久化存储是唯一性约束的唯一仲裁者，条件写入落败时返回 `Conflict`。

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// 目标记录不存在
    #[error("record not found")]
    NotFound,

    /// 唯一性约束冲突（条件写入落败）
    #[error("record already exists")]
    Conflict,

    /// 底层存储错误，调用方可按瞬态错误有界重试
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// 是否为可重试的瞬态错误。
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
