//! HTTP 接口端到端流程测试（内存存储）

use std::sync::Arc;

use application::{
    AdmissionController, AffinityService, AffinityServiceDependencies, LocalMessageBroadcaster,
    MemoryConversationRepository, MemoryCounterStore, MemoryLikeRepository, MemoryMatchRepository,
    MemoryMessageRepository, MemoryNotificationRepository, MessageService,
    MessageServiceDependencies, NotificationService, NotificationServiceDependencies, SystemClock,
    TypingTracker,
};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use web_api::{router, AppState};

fn build_app() -> Router {
    let likes = Arc::new(MemoryLikeRepository::new());
    let matches = Arc::new(MemoryMatchRepository::new());
    let conversations = Arc::new(MemoryConversationRepository::new());
    let messages = Arc::new(MemoryMessageRepository::new());
    let notifications = Arc::new(MemoryNotificationRepository::new());
    let broadcaster = Arc::new(LocalMessageBroadcaster::new(64));
    let clock = Arc::new(SystemClock);

    let notification_service = Arc::new(NotificationService::new(NotificationServiceDependencies {
        notifications,
        clock: clock.clone(),
    }));
    let affinity_service = Arc::new(AffinityService::new(AffinityServiceDependencies {
        likes,
        matches,
        conversations: conversations.clone(),
        notifier: notification_service.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        conversations,
        messages,
        broadcaster: broadcaster.clone(),
        notifier: notification_service.clone(),
        typing: Arc::new(TypingTracker::new()),
        clock: clock.clone(),
    }));
    let admission = Arc::new(AdmissionController::new(
        Arc::new(MemoryCounterStore::new()),
        clock,
    ));

    router(AppState::new(
        affinity_service,
        message_service,
        notification_service,
        admission,
        broadcaster,
    ))
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = build_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn mutual_like_then_message_flow() {
    let app = build_app();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    // 单向点赞
    let (status, body) = post_json(
        &app,
        "/api/v1/likes",
        json!({"from_user": u1, "to_user": u2}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["liked"], json!(true));
    assert_eq!(body["matchCreated"], json!(false));

    // 互相点赞触发匹配
    let (status, body) = post_json(
        &app,
        "/api/v1/likes",
        json!({"from_user": u2, "to_user": u1}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["matchCreated"], json!(true));

    // 双方都能看到匹配与会话
    let (status, matches) = get_json(&app, &format!("/api/v1/users/{u1}/matches")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(matches.as_array().unwrap().len(), 1);

    let (status, conversations) =
        get_json(&app, &format!("/api/v1/users/{u2}/conversations")).await;
    assert_eq!(status, StatusCode::OK);
    let conversations = conversations.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    let conversation_id = conversations[0]["id"].as_str().unwrap().to_owned();

    // 发送消息、读取历史、标记已读
    let (status, message) = post_json(
        &app,
        &format!("/api/v1/conversations/{conversation_id}/messages"),
        json!({"sender_id": u1, "content": "很高兴认识你"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["content"], json!("很高兴认识你"));

    let (status, history) = get_json(
        &app,
        &format!("/api/v1/conversations/{conversation_id}/messages?user_id={u2}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);

    let (status, marked) = post_json(
        &app,
        &format!("/api/v1/conversations/{conversation_id}/mark-read"),
        json!({"user_id": u2}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["messagesMarkedRead"], json!(1));
}

#[tokio::test]
async fn duplicate_like_returns_bad_request() {
    let app = build_app();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    let payload = json!({"from_user": u1, "to_user": u2});
    let (status, _) = post_json(&app, "/api/v1/likes", payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = post_json(&app, "/api/v1/likes", payload).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("ALREADY_LIKED"));
}

#[tokio::test]
async fn self_like_returns_bad_request() {
    let app = build_app();
    let user = Uuid::new_v4();

    let (status, body) = post_json(
        &app,
        "/api/v1/likes",
        json!({"from_user": user, "to_user": user}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("INVALID_TARGET"));
}

#[tokio::test]
async fn outsider_cannot_post_into_conversation() {
    let app = build_app();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    let outsider = Uuid::new_v4();

    post_json(
        &app,
        "/api/v1/likes",
        json!({"from_user": u1, "to_user": u2}),
    )
    .await;
    post_json(
        &app,
        "/api/v1/likes",
        json!({"from_user": u2, "to_user": u1}),
    )
    .await;

    let (_, conversations) = get_json(&app, &format!("/api/v1/users/{u1}/conversations")).await;
    let conversation_id = conversations[0]["id"].as_str().unwrap().to_owned();

    let (status, body) = post_json(
        &app,
        &format!("/api/v1/conversations/{conversation_id}/messages"),
        json!({"sender_id": outsider, "content": "让我进来"}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], json!("NOT_PARTICIPANT"));
}

#[tokio::test]
async fn message_flood_is_rate_limited() {
    let app = build_app();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();

    post_json(
        &app,
        "/api/v1/likes",
        json!({"from_user": u1, "to_user": u2}),
    )
    .await;
    post_json(
        &app,
        "/api/v1/likes",
        json!({"from_user": u2, "to_user": u1}),
    )
    .await;
    let (_, conversations) = get_json(&app, &format!("/api/v1/users/{u1}/conversations")).await;
    let conversation_id = conversations[0]["id"].as_str().unwrap().to_owned();

    let uri = format!("/api/v1/conversations/{conversation_id}/messages");
    for i in 0..30 {
        let (status, _) =
            post_json(&app, &uri, json!({"sender_id": u1, "content": format!("m{i}")})).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // 第 31 条超出每分钟配额
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&uri)
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"sender_id": u1, "content": "one too many"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    assert!(response.headers().contains_key("x-ratelimit-reset"));

    // 其他用户不受影响
    let (status, _) = post_json(
        &app,
        &uri,
        json!({"sender_id": u2, "content": "我还能发"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn profile_view_notifies_once_per_day() {
    let app = build_app();
    let viewer = Uuid::new_v4();
    let viewed = Uuid::new_v4();

    let payload = json!({"viewer_id": viewer, "viewed_id": viewed});
    let (status, body) = post_json(&app, "/api/v1/profile-views", payload.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["notified"], json!(true));

    // 同一天重复查看不再产生通知
    let (status, body) = post_json(&app, "/api/v1/profile-views", payload).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["notified"], json!(false));

    let (status, notifications) =
        get_json(&app, &format!("/api/v1/users/{viewed}/notifications")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notifications.as_array().unwrap().len(), 1);
    assert_eq!(notifications[0]["kind"], json!("profile_view"));
}
