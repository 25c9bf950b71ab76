//! 存储接口定义
//!
//! 条件写入（create-if-absent）是匹配与会话唯一性的实现手段：
//! 并发调用者中只有一个真正插入，落败方拿到已存在的行而不是错误。
//! 存储本身是唯一性约束的唯一仲裁者，进程内缓存不得用于正确性判断。

use async_trait::async_trait;
use domain::{
    Conversation, ConversationId, Like, Match, Message, Notification, NotificationId, PairKey,
    RepositoryError, Timestamp, UserId,
};

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// 插入有向点赞边；同方向的边已存在时返回 `Conflict`，无副作用。
    async fn insert(&self, like: Like) -> Result<Like, RepositoryError>;

    /// 删除有向边，返回是否真的删除了。
    async fn delete(&self, from: UserId, to: UserId) -> Result<bool, RepositoryError>;

    /// 镜像边检查：`from -> to` 的边是否存在。
    async fn exists(&self, from: UserId, to: UserId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// 以规范化用户对为键的条件插入。
    ///
    /// 返回 `(存储中的行, 本次是否创建)`；并发竞争的落败方拿到
    /// 胜出方写入的行和 `false`。
    async fn create_if_absent(&self, candidate: Match) -> Result<(Match, bool), RepositoryError>;

    async fn find_by_pair(&self, pair: PairKey) -> Result<Option<Match>, RepositoryError>;

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Match>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// 以规范化用户对为键的幂等创建，语义同 [`MatchRepository::create_if_absent`]。
    async fn get_or_create(
        &self,
        candidate: Conversation,
    ) -> Result<(Conversation, bool), RepositoryError>;

    async fn find_by_id(&self, id: ConversationId)
        -> Result<Option<Conversation>, RepositoryError>;

    async fn find_by_pair(&self, pair: PairKey) -> Result<Option<Conversation>, RepositoryError>;

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Conversation>, RepositoryError>;

    /// 未读计数 +1。至少一次语义，重试可能多计；`clear_unread` 会重新归零。
    async fn increment_unread(
        &self,
        id: ConversationId,
        for_user: UserId,
    ) -> Result<(), RepositoryError>;

    /// 未读计数清零。
    async fn clear_unread(&self, id: ConversationId, for_user: UserId)
        -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 追加消息并分配单调递增序列号，返回存储后的消息。
    async fn append(&self, message: Message) -> Result<Message, RepositoryError>;

    /// 按 `seq` 升序分页；`after_seq` 是游标，
    /// 并发插入下结果保持正确（不会漏读已翻过的页）。
    async fn list_page(
        &self,
        conversation_id: ConversationId,
        after_seq: Option<i64>,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError>;

    /// 把会话内发给 `reader` 的全部未读消息标记为已读，返回标记条数。
    /// 幂等：没有新消息时返回 0，已设置的 read_at 不变。
    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
        at: Timestamp,
    ) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError>;

    async fn list_for_user(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError>;

    /// 标记单条通知已读，返回是否发生了状态变化。
    async fn mark_read(&self, id: NotificationId, user: UserId) -> Result<bool, RepositoryError>;

    /// `since` 之后是否已有 viewer 对 viewed 的资料查看通知（用于按日去重）。
    async fn profile_view_exists_since(
        &self,
        viewed: UserId,
        viewer: UserId,
        since: Timestamp,
    ) -> Result<bool, RepositoryError>;
}
