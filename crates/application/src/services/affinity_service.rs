//! 点赞/匹配账本服务
//!
//! 记录有向点赞边，检测互相点赞并创建匹配。竞态安全完全依赖
//! 存储层的条件写入：匹配和会话都以规范化用户对为唯一键做
//! create-if-absent，并发的对向点赞只会产生一个匹配、一个会话，
//! 不需要任何进程内锁（多实例部署下进程内锁也不正确）。

use std::sync::Arc;

use domain::{
    Conversation, ConversationId, DomainError, Like, LikeId, Match, MatchId, PairKey,
    RepositoryError, UserId,
};
use uuid::Uuid;

use crate::clock::Clock;
use crate::dto::{LikeOutcome, MatchDto};
use crate::error::ApplicationError;
use crate::repository::{ConversationRepository, LikeRepository, MatchRepository};
use crate::services::notification_service::NotificationService;

#[derive(Debug, Clone)]
pub struct LikeRequest {
    pub from_user: Uuid,
    pub to_user: Uuid,
}

pub struct AffinityServiceDependencies {
    pub likes: Arc<dyn LikeRepository>,
    pub matches: Arc<dyn MatchRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
    pub notifier: Arc<NotificationService>,
    pub clock: Arc<dyn Clock>,
}

pub struct AffinityService {
    likes: Arc<dyn LikeRepository>,
    matches: Arc<dyn MatchRepository>,
    conversations: Arc<dyn ConversationRepository>,
    notifier: Arc<NotificationService>,
    clock: Arc<dyn Clock>,
}

impl AffinityService {
    pub fn new(deps: AffinityServiceDependencies) -> Self {
        Self {
            likes: deps.likes,
            matches: deps.matches,
            conversations: deps.conversations,
            notifier: deps.notifier,
            clock: deps.clock,
        }
    }

    /// 点赞：插入有向边，检查镜像边，互相点赞则创建匹配和会话。
    ///
    /// 重复点赞报 `AlreadyLiked`，无任何副作用；自赞报 `InvalidTarget`。
    pub async fn like(&self, request: LikeRequest) -> Result<LikeOutcome, ApplicationError> {
        let from = UserId::from(request.from_user);
        let to = UserId::from(request.to_user);
        let pair = PairKey::new(from, to)?;

        let like = Like::new(LikeId::random(), from, to, self.clock.now())?;
        match self.likes.insert(like).await {
            Ok(_) => {}
            Err(RepositoryError::Conflict) => {
                return Err(DomainError::AlreadyLiked.into());
            }
            Err(err) => return Err(err.into()),
        }

        // 镜像边检查：对方是否已点赞
        if !self.likes.exists(to, from).await? {
            tracing::info!(%from, %to, "like recorded");
            self.notifier.notify_like(to, from).await;
            return Ok(LikeOutcome::liked());
        }

        // 互相点赞：条件插入匹配，竞争落败视为"匹配已存在"
        let candidate = Match::new(MatchId::random(), pair, from, self.clock.now());
        let (_, created) = self.matches.create_if_absent(candidate).await?;

        // 无论本次是否胜出，会话都必须幂等存在
        let conversation = Conversation::new(ConversationId::random(), pair, self.clock.now());
        self.conversations.get_or_create(conversation).await?;

        if created {
            tracing::info!(%pair, matched_by = %from, "mutual affinity, match created");
            self.notifier.notify_match(pair).await;
        }

        Ok(LikeOutcome::matched(created))
    }

    /// 取消点赞：删除有向边。已有的匹配不回退。
    pub async fn unlike(&self, request: LikeRequest) -> Result<bool, ApplicationError> {
        let from = UserId::from(request.from_user);
        let to = UserId::from(request.to_user);
        if from == to {
            return Err(DomainError::InvalidTarget.into());
        }

        let removed = self.likes.delete(from, to).await?;
        if removed {
            tracing::info!(%from, %to, "like removed");
        }
        Ok(removed)
    }

    pub async fn list_matches(&self, user: Uuid) -> Result<Vec<MatchDto>, ApplicationError> {
        let items = self.matches.list_for_user(UserId::from(user)).await?;
        Ok(items.iter().map(MatchDto::from).collect())
    }
}
