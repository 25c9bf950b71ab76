//! 领域模型错误定义
//!
//! 覆盖点赞、匹配、消息相关的所有业务错误，提供清晰的错误上下文。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 对自己执行点赞/查看等动作
    #[error("cannot target yourself")]
    InvalidTarget,

    /// 同方向的点赞边已存在
    #[error("already liked this profile")]
    AlreadyLiked,

    /// 操作者不是会话的参与者
    #[error("user is not a participant of this conversation")]
    NotParticipant,

    /// 消息内容为空（裁剪后）
    #[error("message content cannot be empty")]
    EmptyContent,

    /// 消息内容超长
    #[error("message content too long: {length} chars (max {max})")]
    ContentTooLong { length: usize, max: usize },

    /// 参数验证错误
    #[error("invalid argument: {field}: {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl DomainError {
    /// 创建参数验证错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
