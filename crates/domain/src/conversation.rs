use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{ConversationId, PairKey, Timestamp, UserId};

/// 匹配成对后建立的一对一会话。
///
/// 以规范化用户对为唯一键，每对用户至多一个会话。
/// 未读计数按参与者分别维护；输入中状态是进程内临时状态，不在这里持久化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub pair: PairKey,
    pub created_at: Timestamp,
    /// `pair.user_a()` 的未读消息数
    pub unread_a: u32,
    /// `pair.user_b()` 的未读消息数
    pub unread_b: u32,
}

impl Conversation {
    pub fn new(id: ConversationId, pair: PairKey, created_at: Timestamp) -> Self {
        Self {
            id,
            pair,
            created_at,
            unread_a: 0,
            unread_b: 0,
        }
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.pair.contains(user)
    }

    /// 返回对方参与者；`user` 不在会话内时报 `NotParticipant`。
    pub fn other_participant(&self, user: UserId) -> Result<UserId, DomainError> {
        self.pair.other(user).ok_or(DomainError::NotParticipant)
    }

    /// 指定参与者的未读计数。
    pub fn unread_for(&self, user: UserId) -> Option<u32> {
        if user == self.pair.user_a() {
            Some(self.unread_a)
        } else if user == self.pair.user_b() {
            Some(self.unread_b)
        } else {
            None
        }
    }
}
