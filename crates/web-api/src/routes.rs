use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{HeaderName, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use application::services::affinity_service::LikeRequest;
use application::services::message_service::SendMessageRequest;
use application::{
    ActionClass, AdmissionDecision, ConversationDto, LikeOutcome, MatchDto, MessageDto,
    MessageStream, NotificationDto, StreamScope,
};
use domain::{ConversationId, NotificationId, UserId};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
struct LikePayload {
    from_user: Uuid,
    to_user: Uuid,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    sender_id: Uuid,
    content: String,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    user_id: Uuid,
    after_seq: Option<i64>,
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct MarkReadPayload {
    user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MarkReadResponse {
    messages_marked_read: u64,
}

#[derive(Debug, Deserialize)]
struct TypingPayload {
    user_id: Uuid,
    is_typing: bool,
}

#[derive(Debug, Deserialize)]
struct ProfileViewPayload {
    viewer_id: Uuid,
    viewed_id: Uuid,
}

#[derive(Debug, Serialize)]
struct ProfileViewResponse {
    notified: bool,
}

#[derive(Debug, Deserialize)]
struct NotificationListQuery {
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
struct NotificationReadResponse {
    updated: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/likes", post(like).delete(unlike))
        .route("/users/{user_id}/matches", get(list_matches))
        .route("/users/{user_id}/conversations", get(list_conversations))
        .route(
            "/conversations/{conversation_id}/messages",
            post(send_message).get(get_history),
        )
        .route("/conversations/{conversation_id}/mark-read", post(mark_read))
        .route("/conversations/{conversation_id}/typing", post(set_typing))
        .route("/profile-views", post(record_profile_view))
        .route("/users/{user_id}/notifications", get(list_notifications))
        .route(
            "/notifications/{notification_id}/read",
            post(mark_notification_read),
        )
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

/// 准入检查。超额返回 429，放行时把窗口状态头带回给调用方。
async fn gate(
    state: &AppState,
    class: ActionClass,
    identifier: Uuid,
) -> Result<AdmissionDecision, ApiError> {
    let decision = state
        .admission
        .admit(class, &identifier.to_string())
        .await?;
    if !decision.allowed {
        return Err(ApiError::too_many_requests(&decision, Utc::now()));
    }
    Ok(decision)
}

fn rate_limit_headers(decision: &AdmissionDecision) -> [(HeaderName, String); 2] {
    [
        (
            HeaderName::from_static("x-ratelimit-remaining"),
            decision.remaining.to_string(),
        ),
        (
            HeaderName::from_static("x-ratelimit-reset"),
            decision.reset_at.timestamp().to_string(),
        ),
    ]
}

async fn like(
    State(state): State<AppState>,
    Json(payload): Json<LikePayload>,
) -> Result<(StatusCode, [(HeaderName, String); 2], Json<LikeOutcome>), ApiError> {
    let decision = gate(&state, ActionClass::Like, payload.from_user).await?;

    let outcome = state
        .affinity_service
        .like(LikeRequest {
            from_user: payload.from_user,
            to_user: payload.to_user,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        rate_limit_headers(&decision),
        Json(outcome),
    ))
}

async fn unlike(
    State(state): State<AppState>,
    Json(payload): Json<LikePayload>,
) -> Result<StatusCode, ApiError> {
    state
        .affinity_service
        .unlike(LikeRequest {
            from_user: payload.from_user,
            to_user: payload.to_user,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_matches(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<MatchDto>>, ApiError> {
    let items = state.affinity_service.list_matches(user_id).await?;
    Ok(Json(items))
}

async fn list_conversations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<ConversationDto>>, ApiError> {
    let items = state.message_service.conversations_for(user_id).await?;
    Ok(Json(items))
}

async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, [(HeaderName, String); 2], Json<MessageDto>), ApiError> {
    let decision = gate(&state, ActionClass::SendMessage, payload.sender_id).await?;

    let dto = state
        .message_service
        .send(SendMessageRequest {
            conversation_id,
            sender_id: payload.sender_id,
            content: payload.content,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        rate_limit_headers(&decision),
        Json(dto),
    ))
}

async fn get_history(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageDto>>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(100);
    let items = state
        .message_service
        .history(conversation_id, query.user_id, query.after_seq, limit)
        .await?;
    Ok(Json(items))
}

async fn mark_read(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<MarkReadPayload>,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let marked = state
        .message_service
        .mark_read(conversation_id, payload.user_id)
        .await?;
    Ok(Json(MarkReadResponse {
        messages_marked_read: marked,
    }))
}

async fn set_typing(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<TypingPayload>,
) -> Result<StatusCode, ApiError> {
    state
        .message_service
        .set_typing(conversation_id, payload.user_id, payload.is_typing)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn record_profile_view(
    State(state): State<AppState>,
    Json(payload): Json<ProfileViewPayload>,
) -> Result<(StatusCode, [(HeaderName, String); 2], Json<ProfileViewResponse>), ApiError> {
    let decision = gate(&state, ActionClass::ProfileView, payload.viewer_id).await?;

    let notified = state
        .notification_service
        .record_profile_view(
            UserId::from(payload.viewer_id),
            UserId::from(payload.viewed_id),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        rate_limit_headers(&decision),
        Json(ProfileViewResponse { notified }),
    ))
}

async fn list_notifications(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<Vec<NotificationDto>>, ApiError> {
    let limit = query.limit.unwrap_or(50).min(100);
    let items = state
        .notification_service
        .list(UserId::from(user_id), limit)
        .await?;
    Ok(Json(items))
}

async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Json(payload): Json<MarkReadPayload>,
) -> Result<Json<NotificationReadResponse>, ApiError> {
    let updated = state
        .notification_service
        .mark_read(
            NotificationId::from(notification_id),
            UserId::from(payload.user_id),
        )
        .await?;
    Ok(Json(NotificationReadResponse { updated }))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    conversation_id: Option<Uuid>,
    user_id: Option<Uuid>,
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let scope = match (query.conversation_id, query.user_id) {
        // 会话订阅和发送/历史读取一样要求参与者身份
        (Some(conversation_id), Some(user_id)) => {
            state
                .message_service
                .ensure_participant(conversation_id, user_id)
                .await?;
            StreamScope::Conversation(ConversationId::from(conversation_id))
        }
        (Some(_), None) => {
            return Err(ApiError::bad_request(
                "MISSING_SCOPE",
                "conversation_id requires user_id",
            ))
        }
        (None, Some(user_id)) => StreamScope::Inbox(UserId::from(user_id)),
        (None, None) => {
            return Err(ApiError::bad_request(
                "MISSING_SCOPE",
                "provide conversation_id or user_id",
            ))
        }
    };
    Ok(ws.on_upgrade(move |socket| websocket_handler(socket, state, scope)))
}

async fn websocket_handler(socket: WebSocket, state: AppState, scope: StreamScope) {
    let mut stream = MessageStream::new(state.broadcaster.subscribe(), scope);
    let (mut sender, mut incoming) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(event) = stream.recv().await {
            let payload = match serde_json::to_string(&MessageDto::from(&event.message)) {
                Ok(json) => json,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to serialize websocket payload");
                    continue;
                }
            };
            if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = incoming.next().await {
            if matches!(message, WsMessage::Close(_)) {
                break;
            }
        }
    });

    let _ = tokio::join!(send_task, recv_task);
}
