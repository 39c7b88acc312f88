//! Media library API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{success, ApiResult};
use crate::models::{CommitResult, ImageMetadata, UpdateImageRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ImageUpdate {
    pub image: ImageMetadata,
    pub commit: CommitResult,
}

/// PUT /api/admin/images/:filename - Upsert metadata for an image.
pub async fn update_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Json(request): Json<UpdateImageRequest>,
) -> ApiResult<ImageUpdate> {
    let (image, commit) = state
        .service
        .update_image_metadata(&filename, request)
        .await?;

    let revision = Some(commit.content_revision.clone());
    success(ImageUpdate { image, commit }, revision)
}

/// DELETE /api/admin/images/:filename - Delete an image and its metadata.
pub async fn delete_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Option<CommitResult>> {
    let commit = state.service.delete_image(&filename).await?;

    let revision = commit.as_ref().map(|c| c.content_revision.clone());
    success(commit, revision)
}
