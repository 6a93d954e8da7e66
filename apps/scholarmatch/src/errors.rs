use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure of a single operation-contract invocation.
///
/// The three variants let callers tell apart bad input, an unreachable or
/// misbehaving service, and a service that answered but refused the request.
/// `Display` is the human-readable message surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// Input rejected before any external call was attempted.
    #[error("{0}")]
    Validation(String),

    /// The call could not complete. `status` is `None` when no HTTP
    /// response was received at all.
    #[error("{message}")]
    Transport { status: Option<u16>, message: String },

    /// The call completed but the service signalled a logical failure.
    #[error("{0}")]
    Domain(String),
}

impl OperationError {
    pub fn validation(message: impl Into<String>) -> Self {
        OperationError::Validation(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        OperationError::Domain(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        OperationError::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, OperationError::Validation(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, OperationError::Transport { .. })
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, OperationError::Domain(_))
    }
}

/// Tagged outcome of one operation invocation.
pub type OperationResult<T> = Result<T, OperationError>;

/// Application-level error type for the HTTP backend.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<OperationError> for AppError {
    fn from(err: OperationError) -> Self {
        match err {
            OperationError::Validation(msg) => AppError::Validation(msg),
            OperationError::Domain(msg) => AppError::UnprocessableEntity(msg),
            OperationError::Transport { message, .. } => AppError::Upstream(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
