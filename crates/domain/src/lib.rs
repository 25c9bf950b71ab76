//! 婚恋匹配系统核心领域模型
//!
//! 包含点赞、匹配、会话、消息、通知等核心实体，
//! 以及相关的业务规则（互相点赞才能匹配、每对用户至多一个会话等）。

pub mod conversation;
pub mod errors;
pub mod like;
pub mod matching;
pub mod message;
pub mod notification;
pub mod repository;
pub mod value_objects;

pub use conversation::Conversation;
pub use errors::{DomainError, DomainResult};
pub use like::Like;
pub use matching::Match;
pub use message::Message;
pub use notification::{notification_kinds, Notification, NotificationKind};
pub use repository::{RepositoryError, RepositoryResult};
pub use value_objects::{
    ConversationId, LikeId, MatchId, MessageContent, MessageId, NotificationId, PairKey,
    Timestamp, UserId,
};
