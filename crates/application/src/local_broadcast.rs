// 进程内广播器实现
use async_trait::async_trait;
use domain::{ConversationId, UserId};
use tokio::sync::broadcast;

use crate::broadcaster::{BroadcastError, MessageBroadcast, MessageBroadcaster};

#[derive(Clone)]
pub struct LocalMessageBroadcaster {
    sender: broadcast::Sender<MessageBroadcast>,
}

impl LocalMessageBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MessageBroadcast> {
        self.sender.subscribe()
    }
}

impl Default for LocalMessageBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[async_trait]
impl MessageBroadcaster for LocalMessageBroadcaster {
    async fn broadcast(&self, payload: MessageBroadcast) -> Result<(), BroadcastError> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender
            .send(payload)
            .map_err(|err| BroadcastError::failed(err.to_string()))?;
        Ok(())
    }
}

/// 订阅范围：单个会话，或某用户的全部会话（收件箱视角）。
#[derive(Debug, Clone, Copy)]
pub enum StreamScope {
    Conversation(ConversationId),
    Inbox(UserId),
}

impl StreamScope {
    fn matches(&self, event: &MessageBroadcast) -> bool {
        match self {
            StreamScope::Conversation(id) => event.conversation_id == *id,
            StreamScope::Inbox(user) => {
                event.message.sender_id == *user || event.message.receiver_id == *user
            }
        }
    }
}

/// 按范围过滤的消息流。
///
/// 事件按广播器收到的顺序送达；消费过慢被挤掉的事件直接跳过，
/// 客户端用历史读取（seq 游标）补齐，传输层不承诺断线期间的投递。
pub struct MessageStream {
    receiver: broadcast::Receiver<MessageBroadcast>,
    scope: StreamScope,
}

impl MessageStream {
    pub fn new(receiver: broadcast::Receiver<MessageBroadcast>, scope: StreamScope) -> Self {
        Self { receiver, scope }
    }

    /// 下一条属于本范围的事件；通道关闭时返回 `None`。
    pub async fn recv(&mut self) -> Option<MessageBroadcast> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.scope.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber lagged, events dropped");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{Message, MessageContent, MessageId};

    fn event(conversation_id: ConversationId, sender: UserId, receiver: UserId) -> MessageBroadcast {
        MessageBroadcast {
            conversation_id,
            message: Message::new(
                MessageId::random(),
                conversation_id,
                sender,
                receiver,
                MessageContent::parse("hi").unwrap(),
                Utc::now(),
            ),
        }
    }

    #[tokio::test]
    async fn conversation_stream_filters_other_conversations() {
        let broadcaster = LocalMessageBroadcaster::new(16);
        let target = ConversationId::random();
        let other = ConversationId::random();
        let (a, b) = (UserId::random(), UserId::random());

        let mut stream =
            MessageStream::new(broadcaster.subscribe(), StreamScope::Conversation(target));

        broadcaster.broadcast(event(other, a, b)).await.unwrap();
        broadcaster.broadcast(event(target, a, b)).await.unwrap();

        let received = stream.recv().await.unwrap();
        assert_eq!(received.conversation_id, target);
    }

    #[tokio::test]
    async fn inbox_stream_sees_all_conversations_of_user() {
        let broadcaster = LocalMessageBroadcaster::new(16);
        let user = UserId::random();
        let (peer1, peer2, stranger1, stranger2) = (
            UserId::random(),
            UserId::random(),
            UserId::random(),
            UserId::random(),
        );
        let (c1, c2, c3) = (
            ConversationId::random(),
            ConversationId::random(),
            ConversationId::random(),
        );

        let mut stream = MessageStream::new(broadcaster.subscribe(), StreamScope::Inbox(user));

        broadcaster.broadcast(event(c3, stranger1, stranger2)).await.unwrap();
        broadcaster.broadcast(event(c1, peer1, user)).await.unwrap();
        broadcaster.broadcast(event(c2, user, peer2)).await.unwrap();

        assert_eq!(stream.recv().await.unwrap().conversation_id, c1);
        assert_eq!(stream.recv().await.unwrap().conversation_id, c2);
    }
}
