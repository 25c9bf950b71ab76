//! 对外数据传输对象

use domain::{Conversation, Match, Message, Notification, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 点赞操作结果。
///
/// 互相点赞成功时 `match_created` 为 true，UI 据此展示匹配成功状态；
/// 普通点赞与匹配成功使用不同的提示文案。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub liked: bool,
    pub match_created: bool,
    pub message: String,
}

impl LikeOutcome {
    pub fn liked() -> Self {
        Self {
            liked: true,
            match_created: false,
            message: "Profile liked successfully".to_owned(),
        }
    }

    pub fn matched(created: bool) -> Self {
        Self {
            liked: true,
            match_created: created,
            message: "It's a match! You can now message each other.".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchDto {
    pub id: Uuid,
    pub user_a: Uuid,
    pub user_b: Uuid,
    pub matched_by: Uuid,
    pub created_at: domain::Timestamp,
}

impl From<&Match> for MatchDto {
    fn from(value: &Match) -> Self {
        Self {
            id: value.id.into(),
            user_a: value.pair.user_a().into(),
            user_b: value.pair.user_b().into(),
            matched_by: value.matched_by.into(),
            created_at: value.created_at,
        }
    }
}

/// 会话视图，未读计数和对方输入中状态都以请求者视角给出。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDto {
    pub id: Uuid,
    /// 对方参与者
    pub peer_id: Uuid,
    pub created_at: domain::Timestamp,
    pub unread_count: u32,
    pub peer_typing: bool,
}

impl ConversationDto {
    pub fn for_user(
        conversation: &Conversation,
        viewer: UserId,
        peer: UserId,
        peer_typing: bool,
    ) -> Self {
        Self {
            id: conversation.id.into(),
            peer_id: peer.into(),
            created_at: conversation.created_at,
            unread_count: conversation.unread_for(viewer).unwrap_or(0),
            peer_typing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub seq: i64,
    pub created_at: domain::Timestamp,
    pub read: bool,
    pub read_at: Option<domain::Timestamp>,
}

impl From<&Message> for MessageDto {
    fn from(value: &Message) -> Self {
        Self {
            id: value.id.into(),
            conversation_id: value.conversation_id.into(),
            sender_id: value.sender_id.into(),
            receiver_id: value.receiver_id.into(),
            content: value.content.as_str().to_owned(),
            seq: value.seq,
            created_at: value.created_at,
            read: value.read,
            read_at: value.read_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationDto {
    pub id: Uuid,
    pub kind: domain::NotificationKind,
    pub title: String,
    pub content: String,
    pub related_user_id: Option<Uuid>,
    pub read: bool,
    pub created_at: domain::Timestamp,
}

impl From<&Notification> for NotificationDto {
    fn from(value: &Notification) -> Self {
        Self {
            id: value.id.into(),
            kind: value.kind,
            title: value.title.clone(),
            content: value.content.clone(),
            related_user_id: value.related_user_id.map(Into::into),
            read: value.read,
            created_at: value.created_at,
        }
    }
}
