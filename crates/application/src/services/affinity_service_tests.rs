//! 点赞/匹配服务单元测试
//!
//! 覆盖互相点赞的匹配创建、并发对向点赞的唯一性、重复点赞等场景。

use std::sync::Arc;

use domain::{DomainError, PairKey, UserId};
use uuid::Uuid;

use crate::clock::SystemClock;
use crate::error::ApplicationError;
use crate::memory::{
    MemoryConversationRepository, MemoryLikeRepository, MemoryMatchRepository,
    MemoryNotificationRepository,
};
use crate::repository::{ConversationRepository, MatchRepository, NotificationRepository};
use crate::services::affinity_service::{AffinityService, AffinityServiceDependencies, LikeRequest};
use crate::services::notification_service::{
    NotificationService, NotificationServiceDependencies,
};

/// 测试辅助结构：服务加上对底层存储的直接句柄
struct TestHarness {
    service: Arc<AffinityService>,
    matches: Arc<MemoryMatchRepository>,
    conversations: Arc<MemoryConversationRepository>,
    notifications: Arc<MemoryNotificationRepository>,
}

fn harness() -> TestHarness {
    let likes = Arc::new(MemoryLikeRepository::new());
    let matches = Arc::new(MemoryMatchRepository::new());
    let conversations = Arc::new(MemoryConversationRepository::new());
    let notifications = Arc::new(MemoryNotificationRepository::new());
    let clock = Arc::new(SystemClock);

    let notifier = Arc::new(NotificationService::new(NotificationServiceDependencies {
        notifications: notifications.clone(),
        clock: clock.clone(),
    }));

    let service = Arc::new(AffinityService::new(AffinityServiceDependencies {
        likes,
        matches: matches.clone(),
        conversations: conversations.clone(),
        notifier,
        clock,
    }));

    TestHarness {
        service,
        matches,
        conversations,
        notifications,
    }
}

fn like_request(from: Uuid, to: Uuid) -> LikeRequest {
    LikeRequest {
        from_user: from,
        to_user: to,
    }
}

#[tokio::test]
async fn mutual_likes_create_exactly_one_match_and_conversation() {
    let harness = harness();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    let pair = PairKey::new(UserId::from(u1), UserId::from(u2)).unwrap();

    // 第一个方向：只是点赞
    let first = harness.service.like(like_request(u1, u2)).await.unwrap();
    assert!(first.liked);
    assert!(!first.match_created);
    assert!(harness.matches.find_by_pair(pair).await.unwrap().is_none());

    // 第二个方向：触发匹配
    let second = harness.service.like(like_request(u2, u1)).await.unwrap();
    assert!(second.liked);
    assert!(second.match_created);

    let stored = harness.matches.find_by_pair(pair).await.unwrap().unwrap();
    assert_eq!(stored.matched_by, UserId::from(u2));

    // 恰好一个会话
    let conversation = harness
        .conversations
        .find_by_pair(pair)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.pair, pair);
}

#[tokio::test]
async fn duplicate_like_is_rejected_without_side_effects() {
    let harness = harness();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    harness.service.like(like_request(u1, u2)).await.unwrap();
    let result = harness.service.like(like_request(u1, u2)).await;

    match result {
        Err(ApplicationError::Domain(DomainError::AlreadyLiked)) => {}
        other => panic!("expected AlreadyLiked, got {:?}", other.map(|_| ())),
    }

    // 仍然没有匹配（对方还没点赞）
    let pair = PairKey::new(UserId::from(u1), UserId::from(u2)).unwrap();
    assert!(harness.matches.find_by_pair(pair).await.unwrap().is_none());

    // 只有第一次点赞产生的一条通知
    let notifications = harness
        .notifications
        .list_for_user(UserId::from(u2), 10)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
}

#[tokio::test]
async fn self_like_is_invalid() {
    let harness = harness();
    let user = Uuid::new_v4();

    let result = harness.service.like(like_request(user, user)).await;
    match result {
        Err(ApplicationError::Domain(DomainError::InvalidTarget)) => {}
        other => panic!("expected InvalidTarget, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn concurrent_opposite_likes_create_exactly_one_match() {
    // 属性：任意交错下恰好一个匹配，零和二都不允许
    for _ in 0..20 {
        let harness = harness();
        let u1 = Uuid::new_v4();
        let u2 = Uuid::new_v4();

        let tasks = [like_request(u1, u2), like_request(u2, u1)].map(|request| {
            let service = harness.service.clone();
            tokio::spawn(async move { service.like(request).await })
        });
        let outcomes: Vec<_> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap().unwrap())
            .collect();

        let pair = PairKey::new(UserId::from(u1), UserId::from(u2)).unwrap();
        assert!(harness.matches.find_by_pair(pair).await.unwrap().is_some());

        // 恰好一方观察到"本次创建"
        let created_count = outcomes
            .iter()
            .filter(|outcome| outcome.match_created)
            .count();
        assert_eq!(
            created_count, 1,
            "exactly one of two concurrent likes creates the match"
        );

        // 会话同样恰好一个
        let conversation = harness.conversations.find_by_pair(pair).await.unwrap();
        assert!(conversation.is_some());
    }
}

#[tokio::test]
async fn unlike_removes_edge_but_keeps_match() {
    let harness = harness();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    harness.service.like(like_request(u1, u2)).await.unwrap();
    harness.service.like(like_request(u2, u1)).await.unwrap();

    assert!(harness.service.unlike(like_request(u1, u2)).await.unwrap());
    // 已解除的边再删一次是空操作
    assert!(!harness.service.unlike(like_request(u1, u2)).await.unwrap());

    // 匹配不回退
    let pair = PairKey::new(UserId::from(u1), UserId::from(u2)).unwrap();
    assert!(harness.matches.find_by_pair(pair).await.unwrap().is_some());
}

#[tokio::test]
async fn match_notifications_go_to_both_participants() {
    let harness = harness();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    harness.service.like(like_request(u1, u2)).await.unwrap();
    harness.service.like(like_request(u2, u1)).await.unwrap();

    // u2：一条 like + 一条 match；u1：一条 match
    let for_u2 = harness
        .notifications
        .list_for_user(UserId::from(u2), 10)
        .await
        .unwrap();
    assert_eq!(for_u2.len(), 2);

    let for_u1 = harness
        .notifications
        .list_for_user(UserId::from(u1), 10)
        .await
        .unwrap();
    assert_eq!(for_u1.len(), 1);
    assert_eq!(for_u1[0].kind, domain::NotificationKind::Match);
}

#[tokio::test]
async fn list_matches_returns_matches_for_user() {
    let harness = harness();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    let u3 = Uuid::new_v4();

    harness.service.like(like_request(u1, u2)).await.unwrap();
    harness.service.like(like_request(u2, u1)).await.unwrap();
    harness.service.like(like_request(u1, u3)).await.unwrap();

    assert_eq!(harness.service.list_matches(u1).await.unwrap().len(), 1);
    assert_eq!(harness.service.list_matches(u2).await.unwrap().len(), 1);
    assert!(harness.service.list_matches(u3).await.unwrap().is_empty());
}
