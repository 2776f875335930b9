use actix_web::{HttpResponse, http::StatusCode};

use crate::common::meta::http::ErrorResponse;

/// Domain-tagged result carrying a stable `code` (spec.md §7's table) and a
/// human message. Handlers propagate this with `?`; actix renders it via
/// `ResponseError`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidName(String),
    #[error("{0}")]
    InvalidIndex(String),
    #[error("{0}")]
    InvalidRange(String),
    #[error("{0}")]
    InvalidPodName(String),
    #[error("{0}")]
    InvalidSchema(String),
    #[error("{0}")]
    InvalidPattern(String),
    #[error("missing authentication token")]
    MissingToken,
    #[error("invalid authentication token")]
    InvalidToken,
    #[error("{0}")]
    Forbidden(String),
    #[error("not found")]
    NotFound,
    #[error("pod not found: {0}")]
    PodNotFound(String),
    #[error("stream not found: {0}")]
    StreamNotFound(String),
    #[error("record not found: {0}")]
    RecordNotFound(String),
    #[error("record deleted: {0}")]
    RecordDeleted(String),
    #[error("{0}")]
    NameConflict(String),
    #[error("{0}")]
    NameExists(String),
    #[error("rate limit exceeded")]
    RateLimitExceeded {
        limit: u64,
        remaining: u64,
        reset_at: i64,
    },
    #[error("database error: {0}")]
    DatabaseError(String),
    #[error("write error: {0}")]
    WriteError(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidName(_) => "INVALID_NAME",
            ApiError::InvalidIndex(_) => "INVALID_INDEX",
            ApiError::InvalidRange(_) => "INVALID_RANGE",
            ApiError::InvalidPodName(_) => "INVALID_POD_NAME",
            ApiError::InvalidSchema(_) => "INVALID_SCHEMA",
            ApiError::InvalidPattern(_) => "INVALID_PATTERN",
            ApiError::MissingToken => "MISSING_TOKEN",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound => "NOT_FOUND",
            ApiError::PodNotFound(_) => "POD_NOT_FOUND",
            ApiError::StreamNotFound(_) => "STREAM_NOT_FOUND",
            ApiError::RecordNotFound(_) => "RECORD_NOT_FOUND",
            ApiError::RecordDeleted(_) => "RECORD_DELETED",
            ApiError::NameConflict(_) => "NAME_CONFLICT",
            ApiError::NameExists(_) => "NAME_EXISTS",
            ApiError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::WriteError(_) => "WRITE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl actix_web::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidName(_)
            | ApiError::InvalidIndex(_)
            | ApiError::InvalidRange(_)
            | ApiError::InvalidPodName(_)
            | ApiError::InvalidSchema(_)
            | ApiError::InvalidPattern(_) => StatusCode::BAD_REQUEST,
            ApiError::MissingToken | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound
            | ApiError::PodNotFound(_)
            | ApiError::StreamNotFound(_)
            | ApiError::RecordNotFound(_)
            | ApiError::RecordDeleted(_) => StatusCode::NOT_FOUND,
            ApiError::NameConflict(_) | ApiError::NameExists(_) => StatusCode::CONFLICT,
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::DatabaseError(_) | ApiError::WriteError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::RateLimitExceeded {
            limit,
            remaining,
            reset_at,
        } = self
        {
            tracing::warn!(target: "webpods::rate_limit", %limit, %remaining, %reset_at, "rate limit exceeded");
            return HttpResponse::build(self.status_code())
                .insert_header(("X-RateLimit-Limit", limit.to_string()))
                .insert_header(("X-RateLimit-Remaining", remaining.to_string()))
                .insert_header(("X-RateLimit-Reset", reset_at.to_string()))
                .json(ErrorResponse::new(self.code(), self.to_string()));
        }
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(target: "webpods::error", error = %self, "internal error");
        }
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.code(), self.to_string()))
    }
}

impl From<infra::errors::Error> for ApiError {
    fn from(e: infra::errors::Error) -> Self {
        ApiError::DatabaseError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
