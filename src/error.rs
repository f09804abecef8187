use crate::domain::TokenError;
use crate::engine::{AnalyticsError, CurveError, PositionError, QuestError, QuoteError};
use crate::orchestration::ExecutionError;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateToken(_)
            | StoreError::DuplicateSymbol(_)
            | StoreError::DuplicateTrade(_)
            | StoreError::DuplicateQuest(_)
            | StoreError::DuplicateSubmission { .. } => AppError::Conflict(err.to_string()),
            StoreError::TokenNotFound(_) | StoreError::QuestNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            StoreError::Seed(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::TokenNotFound(_) => AppError::NotFound(err.to_string()),
            QuoteError::Curve(CurveError::Overflow) => AppError::BadRequest(err.to_string()),
            QuoteError::Curve(CurveError::DivisionByZero) => AppError::Internal(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<PositionError> for AppError {
    fn from(err: PositionError) -> Self {
        match err {
            PositionError::DivisionByZero => AppError::Internal(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<AnalyticsError> for AppError {
    fn from(err: AnalyticsError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<QuestError> for AppError {
    fn from(err: QuestError) -> Self {
        match err {
            QuestError::AlreadySubmitted => AppError::Conflict(err.to_string()),
            _ => AppError::BadRequest(err.to_string()),
        }
    }
}

impl From<CurveError> for AppError {
    fn from(err: CurveError) -> Self {
        AppError::from(QuoteError::Curve(err))
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<ExecutionError> for AppError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Quote(e) => e.into(),
            ExecutionError::Position(e) => e.into(),
            ExecutionError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %error_message, "request failed");
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
