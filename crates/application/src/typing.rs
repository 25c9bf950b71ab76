//! 输入中状态跟踪
//!
//! 纯进程内的临时 UI 状态，不写入持久存储，进程重启即丢失。

use std::collections::HashMap;
use std::sync::RwLock;

use domain::{ConversationId, UserId};

#[derive(Default)]
pub struct TypingTracker {
    flags: RwLock<HashMap<(ConversationId, UserId), bool>>,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, conversation_id: ConversationId, user_id: UserId, is_typing: bool) {
        if let Ok(mut flags) = self.flags.write() {
            if is_typing {
                flags.insert((conversation_id, user_id), true);
            } else {
                flags.remove(&(conversation_id, user_id));
            }
        }
    }

    pub fn is_typing(&self, conversation_id: ConversationId, user_id: UserId) -> bool {
        self.flags
            .read()
            .map(|flags| flags.contains_key(&(conversation_id, user_id)))
            .unwrap_or(false)
    }

    /// 会话结束或参与者断开时清理。
    pub fn clear_conversation(&self, conversation_id: ConversationId) {
        if let Ok(mut flags) = self.flags.write() {
            flags.retain(|(id, _), _| *id != conversation_id);
        }
    }
}
