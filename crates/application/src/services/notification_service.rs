//! 通知发射器
//!
//! 尽力投递的旁路通道：写入失败只记录告警，绝不向触发方传播，
//! 也绝不回滚触发它的点赞/匹配/消息操作。

use std::sync::Arc;

use domain::{Notification, NotificationId, NotificationKind, PairKey, UserId};

use crate::clock::Clock;
use crate::dto::NotificationDto;
use crate::error::ApplicationError;
use crate::repository::NotificationRepository;

pub struct NotificationServiceDependencies {
    pub notifications: Arc<dyn NotificationRepository>,
    pub clock: Arc<dyn Clock>,
}

pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(deps: NotificationServiceDependencies) -> Self {
        Self {
            notifications: deps.notifications,
            clock: deps.clock,
        }
    }

    /// 写入一条通知，失败只告警。
    async fn emit(&self, notification: Notification) {
        if let Err(err) = self.notifications.insert(notification).await {
            tracing::warn!(error = %err, "notification delivery failed");
        }
    }

    /// 收到新点赞时通知目标用户。
    pub async fn notify_like(&self, to_user: UserId, from_user: UserId) {
        self.emit(Notification::new(
            to_user,
            NotificationKind::Like,
            "Someone liked you!",
            "You have a new like on your profile.",
            Some(from_user),
            self.clock.now(),
        ))
        .await;
    }

    /// 匹配成功时通知双方。
    pub async fn notify_match(&self, pair: PairKey) {
        let now = self.clock.now();
        for (user, peer) in [
            (pair.user_a(), pair.user_b()),
            (pair.user_b(), pair.user_a()),
        ] {
            self.emit(Notification::new(
                user,
                NotificationKind::Match,
                "New Match!",
                "You have a new match. Start chatting now!",
                Some(peer),
                now,
            ))
            .await;
        }
    }

    /// 收到新消息时通知接收者。
    pub async fn notify_message(&self, receiver: UserId, sender: UserId) {
        self.emit(Notification::new(
            receiver,
            NotificationKind::Message,
            "New Message",
            "You have a new message.",
            Some(sender),
            self.clock.now(),
        ))
        .await;
    }

    /// 记录一次资料查看。
    ///
    /// 同一查看者对同一被查看者每个自然日至多通知一次；
    /// 查看自己的资料不记录。返回是否发出了通知。
    pub async fn record_profile_view(&self, viewer: UserId, viewed: UserId) -> bool {
        if viewer == viewed {
            return false;
        }

        let now = self.clock.now();
        let day_start = match now.date_naive().and_hms_opt(0, 0, 0) {
            Some(start) => start.and_utc(),
            None => return false,
        };

        match self
            .notifications
            .profile_view_exists_since(viewed, viewer, day_start)
            .await
        {
            Ok(true) => return false,
            Ok(false) => {}
            Err(err) => {
                // 去重检查失败时宁可少发，也不让查看请求失败
                tracing::warn!(error = %err, "profile view dedup check failed");
                return false;
            }
        }

        self.emit(Notification::new(
            viewed,
            NotificationKind::ProfileView,
            "Profile View",
            "Someone viewed your profile",
            Some(viewer),
            now,
        ))
        .await;
        true
    }

    pub async fn list(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<NotificationDto>, ApplicationError> {
        let items = self.notifications.list_for_user(user, limit).await?;
        Ok(items.iter().map(NotificationDto::from).collect())
    }

    pub async fn mark_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> Result<bool, ApplicationError> {
        Ok(self.notifications.mark_read(id, user).await?)
    }
}
