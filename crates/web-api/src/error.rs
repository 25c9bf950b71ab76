use application::{AdmissionDecision, AdmissionError, ApplicationError};
use axum::{
    http::{HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
    headers: Vec<(HeaderName, String)>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
            headers: Vec::new(),
        }
    }

    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    /// 限流拒绝：429，带 `Retry-After` 与窗口状态头。
    pub fn too_many_requests(decision: &AdmissionDecision, now: domain::Timestamp) -> Self {
        let retry_after = decision.retry_after_secs(now);
        let mut error = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "too many requests, slow down",
        );
        error.headers = vec![
            (
                HeaderName::from_static("retry-after"),
                retry_after.to_string(),
            ),
            (
                HeaderName::from_static("x-ratelimit-limit"),
                decision.limit.to_string(),
            ),
            (
                HeaderName::from_static("x-ratelimit-remaining"),
                decision.remaining.to_string(),
            ),
            (
                HeaderName::from_static("x-ratelimit-reset"),
                decision.reset_at.timestamp().to_string(),
            ),
        ];
        error
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;
        use domain::DomainError;

        match error {
            AppErr::Domain(DomainError::InvalidTarget) => ApiError::bad_request(
                "INVALID_TARGET",
                "cannot target yourself with this action",
            ),
            AppErr::Domain(DomainError::AlreadyLiked) => {
                ApiError::bad_request("ALREADY_LIKED", "you already liked this user")
            }
            AppErr::Domain(DomainError::NotParticipant) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_PARTICIPANT",
                "user is not a participant of this conversation",
            ),
            AppErr::Domain(DomainError::EmptyContent) => {
                ApiError::bad_request("EMPTY_CONTENT", "message content is empty")
            }
            AppErr::Domain(DomainError::ContentTooLong { length, max }) => ApiError::bad_request(
                "CONTENT_TOO_LONG",
                format!("message content has {length} characters, maximum is {max}"),
            ),
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => {
                ApiError::bad_request("INVALID_ARGUMENT", format!("{field}: {reason}"))
            }
            AppErr::Repository(repo_err) => match repo_err {
                domain::RepositoryError::NotFound => ApiError::new(
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    "requested resource not found",
                ),
                domain::RepositoryError::Conflict => {
                    ApiError::new(StatusCode::CONFLICT, "CONFLICT", "resource already exists")
                }
                domain::RepositoryError::Storage { message } => ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    format!("database error: {message}"),
                ),
            },
            AppErr::Broadcast(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "BROADCAST_ERROR",
                format!("broadcast error: {err}"),
            ),
            AppErr::Admission(err) => err.into(),
        }
    }
}

impl From<AdmissionError> for ApiError {
    fn from(error: AdmissionError) -> Self {
        match error {
            AdmissionError::StoreUnavailable(message) => ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "RATE_LIMIT_UNAVAILABLE",
                format!("admission check unavailable: {message}"),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        for (name, value) in self.headers {
            if let Ok(value) = value.parse() {
                response.headers_mut().insert(name, value);
            }
        }
        response
    }
}
