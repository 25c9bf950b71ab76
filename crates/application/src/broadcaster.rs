use async_trait::async_trait;
use domain::{ConversationId, Message};
use thiserror::Error;

/// 新消息广播事件，按会话主题扇出给订阅者。
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MessageBroadcast {
    pub conversation_id: ConversationId,
    pub message: Message,
}

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("broadcast failed: {0}")]
    Failed(String),
}

impl BroadcastError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// 消息广播器抽象。
///
/// 底层可以是进程内通道、Redis Pub/Sub 或其他消息代理；
/// 消息通道对具体传输方式保持无感知。
#[async_trait]
pub trait MessageBroadcaster: Send + Sync {
    async fn broadcast(&self, payload: MessageBroadcast) -> Result<(), BroadcastError>;
}
