use axum::{extract::rejection::JsonRejection, http::StatusCode};
use thiserror::Error;
use tracing::error;

/// Failures surfaced by the report lifecycle engine and the identity gate.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("a similar report was already submitted nearby in the last 5 minutes")]
    DuplicateReport,

    #[error("report already confirmed")]
    AlreadyConfirmed,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    Unauthorized(String),

    #[error("too many reports, try again in a moment")]
    RateLimited,

    #[error("store failure: {0}")]
    Store(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::AlreadyConfirmed => StatusCode::BAD_REQUEST,
            AppError::DuplicateReport | AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients; store details stay in the logs.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Store(_) | AppError::Internal(_) => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Unreadable or mistyped request bodies are the caller's input error.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<AppError> for (StatusCode, String) {
    fn from(e: AppError) -> Self {
        match &e {
            AppError::Store(inner) => error!(error = %inner, "store failure"),
            AppError::Internal(msg) => error!(error = %msg, "internal failure"),
            _ => {}
        }
        (e.status(), e.client_message())
    }
}
