use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// 统一的时间戳类型。
pub type Timestamp = DateTime<Utc>;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

uuid_id!(
    /// 用户唯一标识。由外部身份服务签发，这里只作为不可变外键使用。
    UserId
);
uuid_id!(
    /// 点赞边唯一标识。
    LikeId
);
uuid_id!(
    /// 匹配唯一标识。
    MatchId
);
uuid_id!(
    /// 会话唯一标识。
    ConversationId
);
uuid_id!(
    /// 消息唯一标识。
    MessageId
);
uuid_id!(
    /// 通知唯一标识。
    NotificationId
);

/// 规范化的无序用户对。
///
/// 两个用户按固定顺序排列（小者在前），保证同一对用户无论谁先点赞
/// 都得到同一个键，匹配和会话的唯一约束都建立在这个键上。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    user_a: UserId,
    user_b: UserId,
}

impl PairKey {
    /// 构造规范化用户对，`a == b` 视为非法目标。
    pub fn new(a: UserId, b: UserId) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::InvalidTarget);
        }
        if a < b {
            Ok(Self { user_a: a, user_b: b })
        } else {
            Ok(Self { user_a: b, user_b: a })
        }
    }

    /// 排序后较小的用户。
    pub fn user_a(&self) -> UserId {
        self.user_a
    }

    /// 排序后较大的用户。
    pub fn user_b(&self) -> UserId {
        self.user_b
    }

    /// 判断用户是否属于这一对。
    pub fn contains(&self, user: UserId) -> bool {
        self.user_a == user || self.user_b == user
    }

    /// 返回对方用户，调用方需先确认 `user` 属于这一对。
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if user == self.user_a {
            Some(self.user_b)
        } else if user == self.user_b {
            Some(self.user_a)
        } else {
            None
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_a, self.user_b)
    }
}

/// 消息正文内容。
///
/// 构造时去除 HTML 标签并裁剪首尾空白；空内容和超长内容直接拒绝。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent(String);

/// 消息正文的最大字符数。
pub const MAX_MESSAGE_CHARS: usize = 5000;

impl MessageContent {
    pub fn parse(value: impl Into<String>) -> Result<Self, DomainError> {
        let stripped = strip_html(&value.into());
        let trimmed = stripped.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyContent);
        }
        let length = trimmed.chars().count();
        if length > MAX_MESSAGE_CHARS {
            return Err(DomainError::ContentTooLong {
                length,
                max: MAX_MESSAGE_CHARS,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// 从已存储的值恢复，不再做校验。
    pub fn from_stored(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 去除所有 HTML 标签，未闭合的标签丢弃到行尾。
fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_canonical() {
        let a = UserId::random();
        let b = UserId::random();

        let forward = PairKey::new(a, b).unwrap();
        let reverse = PairKey::new(b, a).unwrap();

        assert_eq!(forward, reverse);
        assert!(forward.user_a() < forward.user_b());
        assert!(forward.contains(a));
        assert_eq!(forward.other(a), Some(b));
        assert_eq!(forward.other(UserId::random()), None);
    }

    #[test]
    fn pair_key_rejects_self_pair() {
        let user = UserId::random();
        assert_eq!(PairKey::new(user, user), Err(DomainError::InvalidTarget));
    }

    #[test]
    fn content_strips_html_and_trims() {
        let content = MessageContent::parse("  <b>hello</b> world  ").unwrap();
        assert_eq!(content.as_str(), "hello world");
    }

    #[test]
    fn content_rejects_empty_after_sanitization() {
        assert_eq!(
            MessageContent::parse("<img src=x>"),
            Err(DomainError::EmptyContent)
        );
        assert_eq!(MessageContent::parse("   "), Err(DomainError::EmptyContent));
    }

    #[test]
    fn content_rejects_oversized() {
        let oversized = "a".repeat(MAX_MESSAGE_CHARS + 1);
        match MessageContent::parse(oversized) {
            Err(DomainError::ContentTooLong { length, max }) => {
                assert_eq!(length, MAX_MESSAGE_CHARS + 1);
                assert_eq!(max, MAX_MESSAGE_CHARS);
            }
            other => panic!("expected ContentTooLong, got {:?}", other),
        }
    }

    #[test]
    fn content_at_limit_is_accepted() {
        let at_limit = "a".repeat(MAX_MESSAGE_CHARS);
        assert!(MessageContent::parse(at_limit).is_ok());
    }
}
