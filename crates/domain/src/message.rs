use serde::{Deserialize, Serialize};

use crate::value_objects::{ConversationId, MessageContent, MessageId, Timestamp, UserId};

/// 会话内的一条消息。
///
/// 除 `read`/`read_at` 之外不可变。已读状态只能从 false 变为 true，
/// 重复标记是幂等空操作。会话内全序由 `seq` 决定，即存储层在插入时
/// 分配的单调递增序列号；`created_at` 取样自服务进程，只作展示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: MessageContent,
    /// 存储层分配的序列号，插入前为 0。
    pub seq: i64,
    pub created_at: Timestamp,
    pub read: bool,
    pub read_at: Option<Timestamp>,
}

impl Message {
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        receiver_id: UserId,
        content: MessageContent,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            receiver_id,
            content,
            seq: 0,
            created_at,
            read: false,
            read_at: None,
        }
    }

    /// 标记为已读。返回本次是否发生了状态变化。
    pub fn mark_read(&mut self, at: Timestamp) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        self.read_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sample_message() -> Message {
        let sender = UserId::random();
        let receiver = UserId::random();
        Message::new(
            MessageId::random(),
            ConversationId::random(),
            sender,
            receiver,
            MessageContent::parse("hello").unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn mark_read_is_monotonic_and_idempotent() {
        let mut message = sample_message();
        let first = Utc::now();
        let later = first + Duration::seconds(30);

        assert!(message.mark_read(first));
        assert_eq!(message.read_at, Some(first));

        // 重复标记不改变已有的 read_at
        assert!(!message.mark_read(later));
        assert_eq!(message.read_at, Some(first));
        assert!(message.read);
    }
}
