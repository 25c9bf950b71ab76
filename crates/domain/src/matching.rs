use serde::{Deserialize, Serialize};

use crate::value_objects::{MatchId, PairKey, Timestamp, UserId};

/// 两个用户互相点赞后形成的无向匹配关系。
///
/// 以规范化用户对为唯一键，每对用户至多存在一个匹配；
/// 创建后不可修改，解除匹配属于核心之外的独立操作。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub pair: PairKey,
    /// 后点赞的一方，即触发匹配创建的用户。
    pub matched_by: UserId,
    pub created_at: Timestamp,
}

impl Match {
    pub fn new(id: MatchId, pair: PairKey, matched_by: UserId, created_at: Timestamp) -> Self {
        Self {
            id,
            pair,
            matched_by,
            created_at,
        }
    }
}
