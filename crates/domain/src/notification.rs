//! 通知实体定义

use serde::{Deserialize, Serialize};

use crate::value_objects::{NotificationId, Timestamp, UserId};

/// 通知类型常量
pub mod notification_kinds {
    pub const LIKE: &str = "like";
    pub const MATCH: &str = "match";
    pub const MESSAGE: &str = "message";
    pub const PROFILE_VIEW: &str = "profile_view";
}

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Like,
    Match,
    Message,
    ProfileView,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => notification_kinds::LIKE,
            NotificationKind::Match => notification_kinds::MATCH,
            NotificationKind::Message => notification_kinds::MESSAGE,
            NotificationKind::ProfileView => notification_kinds::PROFILE_VIEW,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for NotificationKind {
    fn from(s: &str) -> Self {
        match s {
            notification_kinds::LIKE => NotificationKind::Like,
            notification_kinds::MATCH => NotificationKind::Match,
            notification_kinds::PROFILE_VIEW => NotificationKind::ProfileView,
            _ => NotificationKind::Message,
        }
    }
}

/// 通知实体
///
/// 尽力投递的旁路信号，不参与点赞/匹配/消息的一致性不变量；
/// 丢失只影响体验，不会破坏状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub content: String,
    pub related_user_id: Option<UserId>,
    pub read: bool,
    pub created_at: Timestamp,
}

impl Notification {
    pub fn new(
        user_id: UserId,
        kind: NotificationKind,
        title: impl Into<String>,
        content: impl Into<String>,
        related_user_id: Option<UserId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: NotificationId::random(),
            user_id,
            kind,
            title: title.into(),
            content: content.into(),
            related_user_id,
            read: false,
            created_at,
        }
    }

    /// 标记为已读
    pub fn mark_as_read(&mut self) {
        self.read = true;
    }
}
