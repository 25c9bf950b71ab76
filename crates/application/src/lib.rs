//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务：点赞/匹配账本、消息通道、
//! 通知发射器，以及准入控制（限流）和消息广播的抽象。
//! 服务只依赖注入进来的接口，不持有任何全局单例。

pub mod broadcaster;
pub mod clock;
pub mod dto;
pub mod error;
pub mod local_broadcast;
pub mod memory;
pub mod rate_limiter;
pub mod repository;
pub mod services;
pub mod typing;

pub use broadcaster::{BroadcastError, MessageBroadcast, MessageBroadcaster};
pub use clock::{Clock, SystemClock};
pub use dto::{ConversationDto, LikeOutcome, MatchDto, MessageDto, NotificationDto};
pub use error::ApplicationError;
pub use local_broadcast::{LocalMessageBroadcaster, MessageStream, StreamScope};
pub use memory::{
    MemoryConversationRepository, MemoryCounterStore, MemoryLikeRepository,
    MemoryMatchRepository, MemoryMessageRepository, MemoryNotificationRepository,
};
pub use rate_limiter::{
    ActionClass, AdmissionController, AdmissionDecision, AdmissionError, CounterStore,
    CounterStoreError, RateLimitPolicy, WindowState,
};
pub use repository::{
    ConversationRepository, LikeRepository, MatchRepository, MessageRepository,
    NotificationRepository,
};
pub use services::{
    AffinityService, AffinityServiceDependencies, MessageService, MessageServiceDependencies,
    NotificationService, NotificationServiceDependencies,
};
pub use typing::TypingTracker;
