//! 主应用程序入口
//!
//! 组装存储、限流计数器与广播器，启动 Axum Web API 服务。
//! Redis 可选：未配置时限流计数退化为进程内存储，广播只在本进程扇出。

use std::sync::Arc;

use application::{
    AdmissionController, AffinityService, AffinityServiceDependencies, Clock, CounterStore,
    LocalMessageBroadcaster, MessageBroadcaster, MessageService, MessageServiceDependencies,
    NotificationService, NotificationServiceDependencies, SystemClock, TypingTracker,
};
use config::AppConfig;
use infrastructure::{
    connect, spawn_redis_bridge, PostgresConversationRepository, PostgresLikeRepository,
    PostgresMatchRepository, PostgresMessageRepository, PostgresNotificationRepository,
    RedisCounterStore, RedisMessageBroadcaster,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app_config = AppConfig::from_env_with_defaults();

    tracing::info!(
        "连接数据库: {}",
        app_config.database.url.split('@').next_back().unwrap_or("unknown")
    );
    let pg_pool = connect(&app_config.database.url, app_config.database.max_connections).await?;

    // 运行迁移
    sqlx::migrate!("../../migrations").run(&pg_pool).await?;

    // 存储实现
    let likes = Arc::new(PostgresLikeRepository::new(pg_pool.clone()));
    let matches = Arc::new(PostgresMatchRepository::new(pg_pool.clone()));
    let conversations = Arc::new(PostgresConversationRepository::new(pg_pool.clone()));
    let messages = Arc::new(PostgresMessageRepository::new(pg_pool.clone()));
    let notifications = Arc::new(PostgresNotificationRepository::new(pg_pool));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let local_broadcaster = Arc::new(LocalMessageBroadcaster::new(app_config.broadcast.capacity));

    // Redis 可用时：计数器落到 Redis，消息广播走 Pub/Sub 跨节点扇出
    let (counter_store, broadcaster): (Arc<dyn CounterStore>, Arc<dyn MessageBroadcaster>) =
        match &app_config.redis {
            Some(redis_config) => {
                let counter = RedisCounterStore::connect(&redis_config.url).await?;
                let publisher = RedisMessageBroadcaster::connect(&redis_config.url).await?;
                let client = redis::Client::open(redis_config.url.as_str())?;
                spawn_redis_bridge(client, local_broadcaster.clone());
                tracing::info!("Redis 已接入：限流计数与跨节点广播已启用");
                (Arc::new(counter), Arc::new(publisher))
            }
            None => {
                tracing::warn!("未配置 REDIS_URL，限流计数与广播均为进程内实现");
                (
                    Arc::new(application::MemoryCounterStore::new()),
                    local_broadcaster.clone() as Arc<dyn MessageBroadcaster>,
                )
            }
        };

    // 应用层服务
    let notification_service = Arc::new(NotificationService::new(NotificationServiceDependencies {
        notifications,
        clock: clock.clone(),
    }));
    let affinity_service = Arc::new(AffinityService::new(AffinityServiceDependencies {
        likes,
        matches,
        conversations: conversations.clone(),
        notifier: notification_service.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        conversations,
        messages,
        broadcaster,
        notifier: notification_service.clone(),
        typing: Arc::new(TypingTracker::new()),
        clock: clock.clone(),
    }));
    let admission = Arc::new(AdmissionController::new(counter_store, clock));

    let state = AppState::new(
        affinity_service,
        message_service,
        notification_service,
        admission,
        local_broadcaster,
    );

    // 启动 Web 服务器
    let app = router(state);
    let bind_address = app_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!("服务器启动在 http://{bind_address}");
    axum::serve(listener, app).await?;

    Ok(())
}
