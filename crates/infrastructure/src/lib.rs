//! 基础设施层
//!
//! 提供应用层存储接口的 PostgreSQL 实现、基于 Redis 的滑动窗口计数器
//! 与跨节点消息广播，以及针对瞬态存储错误的有界重试工具。

pub mod db;
pub mod redis;
pub mod retry;

pub use db::repositories::{
    PostgresConversationRepository, PostgresLikeRepository, PostgresMatchRepository,
    PostgresMessageRepository, PostgresNotificationRepository,
};
pub use db::{connect, DbPool};
pub use self::redis::broadcast::{spawn_redis_bridge, RedisMessageBroadcaster};
pub use self::redis::counter::RedisCounterStore;
pub use retry::{retry_repository, Backoff, RetryConfig};
