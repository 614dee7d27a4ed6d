use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hss_store::StoreError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request body could not be read.
    #[error("{message}")]
    Body { status: StatusCode, message: String },

    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Store(e) => match e {
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
                StoreError::InvalidPath { .. } | StoreError::InvalidRecord { .. } => {
                    StatusCode::BAD_REQUEST
                }
                StoreError::Io { .. } | StoreError::CorruptMetadata { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Body { status, .. } => *status,
            Self::UnsupportedOperation(_) | Self::InvalidHeader(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<MultipartRejection> for ServerError {
    fn from(e: MultipartRejection) -> Self {
        Self::Body {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<MultipartError> for ServerError {
    fn from(e: MultipartError) -> Self {
        Self::Body {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<BytesRejection> for ServerError {
    fn from(e: BytesRejection) -> Self {
        Self::Body {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("store task failed: {e}"))
    }
}
