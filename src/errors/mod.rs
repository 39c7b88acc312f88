//! Error handling module for the site config backend.
//!
//! One closed error type covers the versioned store, the config facade and the
//! HTTP layer, with mapping to HTTP status codes and response envelopes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const MISSING_CREDENTIAL: &str = "MISSING_CREDENTIAL";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const CONFLICT: &str = "CONFLICT";
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
    pub const INVALID_CONTENT: &str = "INVALID_CONTENT";
    pub const READ_FAILED: &str = "READ_FAILED";
    pub const WRITE_FAILED: &str = "WRITE_FAILED";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// No access token configured; raised before any network call
    MissingCredential,
    /// Path or ref does not exist in the store
    NotFound { message: String },
    /// Credential rejected or lacking scope
    Unauthorized { status: u16, message: String },
    /// Optimistic concurrency precondition failed on write (409, 412 or 422)
    Conflict { status: u16, message: String },
    /// Any other non-2xx response, or a transport failure (`status` is `None`)
    Upstream { status: Option<u16>, body: String },
    /// Stored bytes could not be decoded into a config snapshot
    InvalidContent(String),
    /// Both the mirror and the store failed to produce the snapshot
    ReadFailed(Box<AppError>),
    /// The store rejected a config write for a reason other than a conflict
    WriteFailed(Box<AppError>),
    /// Request or configuration validation error
    Validation(String),
}

impl AppError {
    /// Wrap a store error raised on the read path.
    pub fn read_failed(err: AppError) -> Self {
        AppError::ReadFailed(Box::new(err))
    }

    /// Wrap a store error raised on the write path. Conflicts pass through
    /// untouched so callers can restart their read-modify-write cycle.
    pub fn write_failed(err: AppError) -> Self {
        match err {
            AppError::Conflict { .. } | AppError::WriteFailed(_) => err,
            other => AppError::WriteFailed(Box::new(other)),
        }
    }

    /// The HTTP status reported by the store, if the error came from a response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::NotFound { .. } => Some(404),
            AppError::Unauthorized { status, .. } | AppError::Conflict { status, .. } => {
                Some(*status)
            }
            AppError::Upstream { status, .. } => *status,
            AppError::ReadFailed(inner) | AppError::WriteFailed(inner) => inner.upstream_status(),
            AppError::MissingCredential
            | AppError::InvalidContent(_)
            | AppError::Validation(_) => None,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingCredential => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            AppError::InvalidContent(_) => StatusCode::BAD_GATEWAY,
            AppError::ReadFailed(inner) | AppError::WriteFailed(inner) => inner.status_code(),
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingCredential => codes::MISSING_CREDENTIAL,
            AppError::NotFound { .. } => codes::NOT_FOUND,
            AppError::Unauthorized { .. } => codes::UNAUTHORIZED,
            AppError::Conflict { .. } => codes::CONFLICT,
            AppError::Upstream { .. } => codes::UPSTREAM_ERROR,
            AppError::InvalidContent(_) => codes::INVALID_CONTENT,
            AppError::ReadFailed(_) => codes::READ_FAILED,
            AppError::WriteFailed(_) => codes::WRITE_FAILED,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::MissingCredential => {
                "No GitHub access token configured (GITHUB_TOKEN)".to_string()
            }
            AppError::NotFound { message } => message.clone(),
            AppError::Unauthorized { message, .. } => message.clone(),
            AppError::Conflict { message, .. } => message.clone(),
            AppError::Upstream {
                status: Some(status),
                body,
            } => format!("Upstream returned {}: {}", status, body),
            AppError::Upstream { status: None, body } => format!("Upstream unreachable: {}", body),
            AppError::InvalidContent(msg) => msg.clone(),
            AppError::ReadFailed(inner) => format!("Failed to read site config: {}", inner),
            AppError::WriteFailed(inner) => format!("Failed to write site config: {}", inner),
            AppError::Validation(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::ReadFailed(inner) | AppError::WriteFailed(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        tracing::error!("Transport error: {:?}", err);
        AppError::Upstream {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidContent(format!("JSON error: {}", err))
    }
}

impl From<base64::DecodeError> for AppError {
    fn from(err: base64::DecodeError) -> Self {
        AppError::InvalidContent(format!("Base64 error: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let details = error
            .upstream_status()
            .map(|status| serde_json::json!({ "upstreamStatus": status }));

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, Json(ErrorResponse::new(&self))).into_response()
    }
}
