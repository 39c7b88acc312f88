//! Site config API endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::models::{CommitResult, HistoryEntry, RevertRequest, SiteConfig, UpdateConfigRequest};
use crate::service::ConfigSource;
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Admin view of the config, with where it was read from.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub config: SiteConfig,
    pub source: ConfigSource,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// GET /api/config - Current site config for the public pages.
pub async fn get_public_config(State(state): State<AppState>) -> ApiResult<SiteConfig> {
    let loaded = state.service.read_config().await?;
    success(loaded.config, loaded.revision)
}

/// GET /api/admin/config - Current site config for the editor.
pub async fn get_config(State(state): State<AppState>) -> ApiResult<ConfigView> {
    let loaded = state.service.read_config().await?;
    success(
        ConfigView {
            config: loaded.config,
            source: loaded.source,
        },
        loaded.revision,
    )
}

/// PUT /api/admin/config - Commit a new version of the site config.
pub async fn update_config(
    State(state): State<AppState>,
    Json(request): Json<UpdateConfigRequest>,
) -> ApiResult<CommitResult> {
    let result = state
        .service
        .update_config(
            request.config,
            request.message,
            request.expected_revision.as_ref(),
        )
        .await?;

    let revision = Some(result.content_revision.clone());
    success(result, revision)
}

/// GET /api/admin/config/history - Recent versions, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Vec<HistoryEntry>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let history = state.service.get_file_history(limit).await?;
    success(history, None)
}

/// POST /api/admin/config/revert - Restore an earlier version as a new commit.
pub async fn revert_config(
    State(state): State<AppState>,
    Json(request): Json<RevertRequest>,
) -> ApiResult<CommitResult> {
    let result = state.service.revert_to_version(&request.revision).await?;

    let revision = Some(result.content_revision.clone());
    success(result, revision)
}
