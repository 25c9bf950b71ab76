use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{LikeId, Timestamp, UserId};

/// 有向点赞边 `(from_user, to_user)`。
///
/// 同一有向对只允许一条边；创建后不可修改，只能被显式取消点赞删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Like {
    pub id: LikeId,
    pub from_user: UserId,
    pub to_user: UserId,
    pub created_at: Timestamp,
}

impl Like {
    pub fn new(
        id: LikeId,
        from_user: UserId,
        to_user: UserId,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        if from_user == to_user {
            return Err(DomainError::InvalidTarget);
        }
        Ok(Self {
            id,
            from_user,
            to_user,
            created_at,
        })
    }
}
