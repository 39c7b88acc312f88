//! REST API module.
//!
//! Public read of the site config plus the admin routes used by the CMS panel.

mod images;
mod site_config;

pub use images::*;
pub use site_config::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::RevisionMarker;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    /// Blob sha of the site config after this call, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<RevisionMarker>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision: Option<RevisionMarker>) -> Self {
        Self {
            success: true,
            data,
            revision,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision: Option<RevisionMarker>) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision))
}
