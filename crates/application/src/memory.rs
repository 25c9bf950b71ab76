//! 存储接口的内存实现
//!
//! 供单元测试和单实例部署使用。条件写入都在同一把写锁内完成判定和插入，
//! 与 SQL 唯一约束一样保证并发下"至多创建一次"。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{
    Conversation, ConversationId, Like, Match, Message, Notification, NotificationId, PairKey,
    RepositoryError, Timestamp, UserId,
};
use tokio::sync::{Mutex, RwLock};

use crate::clock::{Clock, SystemClock};
use crate::rate_limiter::{CounterStore, CounterStoreError, WindowState};
use crate::repository::{
    ConversationRepository, LikeRepository, MatchRepository, MessageRepository,
    NotificationRepository,
};

/// 内存点赞账本
#[derive(Default)]
pub struct MemoryLikeRepository {
    edges: RwLock<HashMap<(UserId, UserId), Like>>,
}

impl MemoryLikeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LikeRepository for MemoryLikeRepository {
    async fn insert(&self, like: Like) -> Result<Like, RepositoryError> {
        let mut edges = self.edges.write().await;
        let key = (like.from_user, like.to_user);
        if edges.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        edges.insert(key, like.clone());
        Ok(like)
    }

    async fn delete(&self, from: UserId, to: UserId) -> Result<bool, RepositoryError> {
        let mut edges = self.edges.write().await;
        Ok(edges.remove(&(from, to)).is_some())
    }

    async fn exists(&self, from: UserId, to: UserId) -> Result<bool, RepositoryError> {
        let edges = self.edges.read().await;
        Ok(edges.contains_key(&(from, to)))
    }
}

/// 内存匹配存储
#[derive(Default)]
pub struct MemoryMatchRepository {
    rows: RwLock<HashMap<PairKey, Match>>,
}

impl MemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchRepository for MemoryMatchRepository {
    async fn create_if_absent(&self, candidate: Match) -> Result<(Match, bool), RepositoryError> {
        let mut rows = self.rows.write().await;
        // 判定和插入在同一把写锁内，竞争只有一个胜出者
        if let Some(existing) = rows.get(&candidate.pair) {
            return Ok((existing.clone(), false));
        }
        rows.insert(candidate.pair, candidate.clone());
        Ok((candidate, true))
    }

    async fn find_by_pair(&self, pair: PairKey) -> Result<Option<Match>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.get(&pair).cloned())
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Match>, RepositoryError> {
        let rows = self.rows.read().await;
        let mut items: Vec<Match> = rows
            .values()
            .filter(|row| row.pair.contains(user))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }
}

/// 内存会话存储
#[derive(Default)]
pub struct MemoryConversationRepository {
    by_pair: RwLock<HashMap<PairKey, Conversation>>,
}

impl MemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for MemoryConversationRepository {
    async fn get_or_create(
        &self,
        candidate: Conversation,
    ) -> Result<(Conversation, bool), RepositoryError> {
        let mut rows = self.by_pair.write().await;
        if let Some(existing) = rows.get(&candidate.pair) {
            return Ok((existing.clone(), false));
        }
        rows.insert(candidate.pair, candidate.clone());
        Ok((candidate, true))
    }

    async fn find_by_id(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let rows = self.by_pair.read().await;
        Ok(rows.values().find(|row| row.id == id).cloned())
    }

    async fn find_by_pair(&self, pair: PairKey) -> Result<Option<Conversation>, RepositoryError> {
        let rows = self.by_pair.read().await;
        Ok(rows.get(&pair).cloned())
    }

    async fn list_for_user(&self, user: UserId) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = self.by_pair.read().await;
        let mut items: Vec<Conversation> = rows
            .values()
            .filter(|row| row.is_participant(user))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn increment_unread(
        &self,
        id: ConversationId,
        for_user: UserId,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.by_pair.write().await;
        let row = rows
            .values_mut()
            .find(|row| row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if for_user == row.pair.user_a() {
            row.unread_a += 1;
        } else if for_user == row.pair.user_b() {
            row.unread_b += 1;
        }
        Ok(())
    }

    async fn clear_unread(
        &self,
        id: ConversationId,
        for_user: UserId,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.by_pair.write().await;
        let row = rows
            .values_mut()
            .find(|row| row.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if for_user == row.pair.user_a() {
            row.unread_a = 0;
        } else if for_user == row.pair.user_b() {
            row.unread_b = 0;
        }
        Ok(())
    }
}

#[derive(Default)]
struct MessageStoreInner {
    items: Vec<Message>,
    next_seq: i64,
}

/// 内存消息存储，序列号在写锁内分配，保证单调递增。
#[derive(Default)]
pub struct MemoryMessageRepository {
    inner: RwLock<MessageStoreInner>,
}

impl MemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for MemoryMessageRepository {
    async fn append(&self, mut message: Message) -> Result<Message, RepositoryError> {
        let mut inner = self.inner.write().await;
        inner.next_seq += 1;
        message.seq = inner.next_seq;
        inner.items.push(message.clone());
        Ok(message)
    }

    async fn list_page(
        &self,
        conversation_id: ConversationId,
        after_seq: Option<i64>,
        limit: u32,
    ) -> Result<Vec<Message>, RepositoryError> {
        let inner = self.inner.read().await;
        let cursor = after_seq.unwrap_or(0);
        let mut items: Vec<Message> = inner
            .items
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.seq > cursor)
            .cloned()
            .collect();
        // 只按 seq 排序：created_at 取样和提交可能乱序，用它排序会让
        // seq 游标跨过尚未翻页的低 seq 消息
        items.sort_by_key(|m| m.seq);
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn mark_read(
        &self,
        conversation_id: ConversationId,
        reader: UserId,
        at: Timestamp,
    ) -> Result<u64, RepositoryError> {
        let mut inner = self.inner.write().await;
        let mut marked = 0u64;
        for message in inner
            .items
            .iter_mut()
            .filter(|m| m.conversation_id == conversation_id && m.receiver_id == reader)
        {
            if message.mark_read(at) {
                marked += 1;
            }
        }
        Ok(marked)
    }
}

/// 内存通知存储
#[derive(Default)]
pub struct MemoryNotificationRepository {
    items: RwLock<Vec<Notification>>,
}

impl MemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(&self, notification: Notification) -> Result<Notification, RepositoryError> {
        let mut items = self.items.write().await;
        items.push(notification.clone());
        Ok(notification)
    }

    async fn list_for_user(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let items = self.items.read().await;
        let mut found: Vec<Notification> = items
            .iter()
            .filter(|n| n.user_id == user)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit as usize);
        Ok(found)
    }

    async fn mark_read(&self, id: NotificationId, user: UserId) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        for notification in items.iter_mut() {
            if notification.id == id && notification.user_id == user {
                if notification.read {
                    return Ok(false);
                }
                notification.mark_as_read();
                return Ok(true);
            }
        }
        Err(RepositoryError::NotFound)
    }

    async fn profile_view_exists_since(
        &self,
        viewed: UserId,
        viewer: UserId,
        since: Timestamp,
    ) -> Result<bool, RepositoryError> {
        let items = self.items.read().await;
        Ok(items.iter().any(|n| {
            n.user_id == viewed
                && n.kind == domain::NotificationKind::ProfileView
                && n.related_user_id == Some(viewer)
                && n.created_at >= since
        }))
    }
}

/// 内存滑动窗口计数器
pub struct MemoryCounterStore {
    clock: Arc<dyn Clock>,
    windows: Mutex<HashMap<String, (u64, Timestamp)>>,
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注入时钟，测试里用手动时钟推进窗口而不真实等待。
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str, window: Duration) -> Result<WindowState, CounterStoreError> {
        let window = chrono::Duration::from_std(window)
            .map_err(|err| CounterStoreError::new(err.to_string()))?;
        let now = self.clock.now();
        let mut windows = self.windows.lock().await;

        // 顺带清理已过期的窗口，防止无界增长
        windows.retain(|_, (_, reset_at)| *reset_at > now);

        let entry = windows
            .entry(key.to_owned())
            .or_insert_with(|| (0, now + window));
        entry.0 += 1;

        Ok(WindowState {
            count: entry.0,
            reset_at: entry.1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::{MessageContent, MessageId};

    fn message(conversation_id: ConversationId, created_at: Timestamp) -> Message {
        Message::new(
            MessageId::random(),
            conversation_id,
            UserId::random(),
            UserId::random(),
            MessageContent::parse("hi".to_owned()).unwrap(),
            created_at,
        )
    }

    /// 两条并发消息的 created_at 取样顺序和提交顺序相反时，
    /// 分页不能因为排序偏向 created_at 而让 seq 游标跳过低 seq 的那条。
    #[tokio::test]
    async fn page_cursor_survives_inverted_timestamps() {
        let repo = MemoryMessageRepository::new();
        let conversation_id = ConversationId::random();
        let now = Utc::now();

        // 先取样时间的那条后提交：seq 1 带较晚的时间戳
        let first = repo
            .append(message(conversation_id, now + chrono::Duration::seconds(1)))
            .await
            .unwrap();
        let second = repo.append(message(conversation_id, now)).await.unwrap();
        assert_eq!((first.seq, second.seq), (1, 2));

        let page_one = repo.list_page(conversation_id, None, 1).await.unwrap();
        assert_eq!(page_one.len(), 1);
        assert_eq!(page_one[0].id, first.id);

        let page_two = repo
            .list_page(conversation_id, Some(page_one[0].seq), 10)
            .await
            .unwrap();
        assert_eq!(page_two.len(), 1);
        assert_eq!(page_two[0].id, second.id);
    }

    /// 翻完两页应当覆盖全部消息且严格按 seq 递增。
    #[tokio::test]
    async fn pages_cover_all_messages_in_seq_order() {
        let repo = MemoryMessageRepository::new();
        let conversation_id = ConversationId::random();
        let now = Utc::now();

        // 时间戳刻意乱序
        for offset in [3i64, 1, 4, 0, 2] {
            repo.append(message(conversation_id, now + chrono::Duration::seconds(offset)))
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = repo.list_page(conversation_id, cursor, 2).await.unwrap();
            if page.is_empty() {
                break;
            }
            cursor = Some(page[page.len() - 1].seq);
            seen.extend(page.into_iter().map(|m| m.seq));
        }
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }
}
