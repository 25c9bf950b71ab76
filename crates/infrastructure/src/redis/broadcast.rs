//! Redis Pub/Sub 消息广播
//!
//! 发布端把事件写到每个会话自己的频道；订阅端用模式订阅把全部
//! 会话事件桥接进进程内广播器，WebSocket 订阅者从那里各取所需。
//! 连接断开时指数退避重连，断线期间的事件不补投，
//! 客户端用历史读取（seq 游标）补齐。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use application::{BroadcastError, LocalMessageBroadcaster, MessageBroadcast, MessageBroadcaster};

const CHANNEL_PREFIX: &str = "conversation:";
const RECONNECT_MAX: Duration = Duration::from_secs(30);

pub struct RedisMessageBroadcaster {
    connection: ConnectionManager,
}

impl RedisMessageBroadcaster {
    pub async fn connect(url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

#[async_trait]
impl MessageBroadcaster for RedisMessageBroadcaster {
    async fn broadcast(&self, payload: MessageBroadcast) -> Result<(), BroadcastError> {
        let body = serde_json::to_string(&payload)
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        let channel = format!("{CHANNEL_PREFIX}{}", payload.conversation_id);

        let mut conn = self.connection.clone();
        let _subscribers: i64 = conn
            .publish(channel, body)
            .await
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }
}

/// 启动后台任务：订阅 Redis 会话频道，把事件转发进本地广播器。
pub fn spawn_redis_bridge(
    client: redis::Client,
    local: Arc<LocalMessageBroadcaster>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut backoff = Duration::from_secs(1);
        loop {
            match pump(&client, &local).await {
                Ok(()) => {
                    // 正常返回意味着连接被对端关闭
                    backoff = Duration::from_secs(1);
                    warn!("redis subscription closed, reconnecting");
                }
                Err(err) => {
                    warn!(error = %err, delay = ?backoff, "redis subscription failed");
                }
            }
            sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, RECONNECT_MAX);
        }
    })
}

async fn pump(
    client: &redis::Client,
    local: &LocalMessageBroadcaster,
) -> Result<(), redis::RedisError> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(format!("{CHANNEL_PREFIX}*")).await?;
    info!("redis bridge subscribed to conversation channels");

    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let payload: String = match msg.get_payload() {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "unreadable broadcast payload, skipped");
                continue;
            }
        };
        match serde_json::from_str::<MessageBroadcast>(&payload) {
            Ok(event) => {
                if let Err(err) = local.broadcast(event).await {
                    warn!(error = %err, "local fan-out failed");
                }
            }
            Err(err) => warn!(error = %err, "malformed broadcast payload, skipped"),
        }
    }
    Ok(())
}
