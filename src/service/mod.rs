//! Site config read/write facade.
//!
//! Reads go to the local mirror first in development, then to GitHub.
//! Writes go to GitHub first; the mirror is updated afterwards and its
//! failures are only logged. Nothing is cached between calls.

use chrono::Utc;
use serde::Serialize;

use crate::config::GitHubSettings;
use crate::errors::AppError;
use crate::migration::ensure_current_shape;
use crate::mirror::LocalMirror;
use crate::models::{
    remove_image, upsert_image, CommitResult, HistoryEntry, ImageMetadata, RevisionMarker,
    SiteConfig, UpdateImageRequest,
};
use crate::store::{GitHubClient, MAX_HISTORY_LIMIT};
use crate::summary::{summarize_change, GENERIC_MESSAGE};

/// Where a config read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Mirror,
    Store,
}

/// A migrated snapshot plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: SiteConfig,
    /// Blob sha to present on the next write; `None` when read from the mirror
    pub revision: Option<RevisionMarker>,
    pub source: ConfigSource,
}

/// What the store held before a write, for message synthesis.
enum Previous {
    Missing,
    Unreadable,
    Snapshot(SiteConfig),
}

/// Reads, writes, history and revert for the site config document.
pub struct ConfigService {
    store: GitHubClient,
    mirror: Option<LocalMirror>,
    config_path: String,
    images_dir: String,
}

impl ConfigService {
    pub fn new(store: GitHubClient, settings: &GitHubSettings, mirror: Option<LocalMirror>) -> Self {
        Self {
            store,
            mirror,
            config_path: settings.config_path.clone(),
            images_dir: settings.images_dir.trim_end_matches('/').to_string(),
        }
    }

    /// Current config, migrated to the current shape.
    pub async fn read_config(&self) -> Result<LoadedConfig, AppError> {
        if let Some(mirror) = &self.mirror {
            if let Some(config) = read_mirror(mirror).await {
                return Ok(LoadedConfig {
                    config: ensure_current_shape(config),
                    revision: None,
                    source: ConfigSource::Mirror,
                });
            }
        }

        let (config, revision) = self.read_from_store().await.map_err(AppError::read_failed)?;

        Ok(LoadedConfig {
            config: ensure_current_shape(config),
            revision: Some(revision),
            source: ConfigSource::Store,
        })
    }

    /// Commit `config` as the new version of the document.
    ///
    /// The current blob sha is always read fresh and presented as the write
    /// precondition. When `expected` is given and the file has already moved
    /// past it, fails with `Conflict` without writing. Conflicts are never
    /// retried here.
    pub async fn update_config(
        &self,
        config: SiteConfig,
        message: Option<String>,
        expected: Option<&RevisionMarker>,
    ) -> Result<CommitResult, AppError> {
        let bytes = config
            .to_json_bytes()
            .map_err(|e| AppError::write_failed(e.into()))?;

        let message = message.map(|m| m.trim().to_string()).filter(|m| !m.is_empty());
        self.commit_document(bytes, expected, |previous| {
            message.unwrap_or_else(|| match previous {
                Previous::Missing => summarize_change(None, &config),
                Previous::Unreadable => GENERIC_MESSAGE.to_string(),
                Previous::Snapshot(previous) => summarize_change(Some(previous), &config),
            })
        })
        .await
    }

    /// Write `bytes` over the config document, creating it if absent.
    async fn commit_document(
        &self,
        bytes: Vec<u8>,
        expected: Option<&RevisionMarker>,
        message: impl FnOnce(&Previous) -> String,
    ) -> Result<CommitResult, AppError> {
        let branch = self.store.branch();

        let (current, previous) = match self.store.get_content_at(&self.config_path, branch).await {
            Ok(file) => {
                let previous = match SiteConfig::from_json_bytes(&file.content) {
                    Ok(previous) => Previous::Snapshot(previous),
                    Err(e) => {
                        tracing::warn!("Stored site config is unreadable, skipping diff: {}", e);
                        Previous::Unreadable
                    }
                };
                (Some(file.sha), previous)
            }
            Err(AppError::NotFound { .. }) => {
                tracing::info!("{} does not exist yet, creating it", self.config_path);
                (None, Previous::Missing)
            }
            Err(e) => return Err(AppError::write_failed(e)),
        };

        if let Some(expected) = expected {
            if current.as_ref() != Some(expected) {
                return Err(AppError::Conflict {
                    status: 409,
                    message: format!(
                        "Site config changed since version {}; reload and reapply your changes",
                        expected.short()
                    ),
                });
            }
        }

        let message = message(&previous);

        let outcome = self
            .store
            .put_content(&self.config_path, &bytes, &message, current.as_ref(), branch)
            .await
            .map_err(AppError::write_failed)?;

        tracing::info!(
            path = %self.config_path,
            revision = outcome.commit.revision.short(),
            "Committed site config: {}",
            message
        );

        if let Some(mirror) = &self.mirror {
            mirror.write_best_effort(&bytes).await;
        }

        Ok(outcome.into())
    }

    /// Most recent commits to the config document, newest first.
    pub async fn get_file_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, AppError> {
        self.store
            .list_history(&self.config_path, limit.clamp(1, MAX_HISTORY_LIMIT))
            .await
    }

    /// Restore the document as it was at `revision` by committing that
    /// content on top of the current head. History is never rewritten.
    ///
    /// The stored bytes are committed exactly as they were; they are only
    /// parsed to make sure they are a site config.
    pub async fn revert_to_version(&self, revision: &RevisionMarker) -> Result<CommitResult, AppError> {
        if revision.as_str().trim().is_empty() {
            return Err(AppError::Validation(
                "Revision to revert to must not be blank".to_string(),
            ));
        }

        let file = self
            .store
            .get_content_at(&self.config_path, revision.as_str())
            .await
            .map_err(AppError::read_failed)?;
        SiteConfig::from_json_bytes(&file.content).map_err(|e| AppError::read_failed(e.into()))?;

        let message = format!("Revert site config to version {}", revision.short());
        self.commit_document(file.content, None, |_| message).await
    }

    /// Merge metadata for `filename` into the media index and commit it.
    pub async fn update_image_metadata(
        &self,
        filename: &str,
        request: UpdateImageRequest,
    ) -> Result<(ImageMetadata, CommitResult), AppError> {
        validate_filename(filename)?;

        let (config, revision) = self.read_from_store().await.map_err(AppError::write_failed)?;
        let mut config = ensure_current_shape(config);
        let images = config.images.get_or_insert_with(Vec::new);
        let existing = images.iter().find(|i| i.filename == filename).cloned();

        let entry = match existing {
            Some(existing) => ImageMetadata {
                filename: filename.to_string(),
                path: request.path.unwrap_or(existing.path),
                alt: request.alt.or(existing.alt),
                caption: request.caption.or(existing.caption),
                folder: request.folder.or(existing.folder),
                uploaded_at: request.uploaded_at.unwrap_or(existing.uploaded_at),
                size: request.size.unwrap_or(existing.size),
                extra: existing.extra,
            },
            None => ImageMetadata {
                filename: filename.to_string(),
                path: request.path.unwrap_or_else(|| self.public_path(filename)),
                alt: request.alt,
                caption: request.caption,
                folder: request.folder,
                uploaded_at: request.uploaded_at.unwrap_or_else(|| Utc::now().to_rfc3339()),
                size: request.size.unwrap_or(0),
                ..Default::default()
            },
        };
        upsert_image(images, entry.clone());

        let message = format!("Update image metadata for {}", filename);
        let result = self.update_config(config, Some(message), Some(&revision)).await?;
        Ok((entry, result))
    }

    /// Delete an uploaded image and drop its metadata entry, if any.
    ///
    /// Returns the config commit when metadata was removed.
    pub async fn delete_image(&self, filename: &str) -> Result<Option<CommitResult>, AppError> {
        validate_filename(filename)?;

        let image_path = format!("{}/{}", self.images_dir, filename);
        self.store
            .delete_path(&image_path, &format!("Delete image {}", filename))
            .await?;
        tracing::info!("Deleted image {}", image_path);

        let (mut config, revision) = self.read_from_store().await.map_err(AppError::write_failed)?;
        let removed = config
            .images
            .as_mut()
            .map(|images| remove_image(images, filename))
            .unwrap_or(false);
        if !removed {
            return Ok(None);
        }

        let message = format!("Remove image metadata for {}", filename);
        let result = self.update_config(config, Some(message), Some(&revision)).await?;
        Ok(Some(result))
    }

    async fn read_from_store(&self) -> Result<(SiteConfig, RevisionMarker), AppError> {
        let file = self
            .store
            .get_content_at(&self.config_path, self.store.branch())
            .await?;
        let config = SiteConfig::from_json_bytes(&file.content)?;
        Ok((config, file.sha))
    }

    /// Public URL of an image, e.g. `public/images` + `a.jpg` -> `/images/a.jpg`.
    fn public_path(&self, filename: &str) -> String {
        let dir = self
            .images_dir
            .strip_prefix("public")
            .unwrap_or(&self.images_dir)
            .trim_matches('/');
        if dir.is_empty() {
            format!("/{}", filename)
        } else {
            format!("/{}/{}", dir, filename)
        }
    }
}

async fn read_mirror(mirror: &LocalMirror) -> Option<SiteConfig> {
    let bytes = match mirror.read().await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Local mirror {} unavailable: {}", mirror.path().display(), e);
            return None;
        }
    };

    match SiteConfig::from_json_bytes(&bytes) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Local mirror {} is not valid JSON: {}", mirror.path().display(), e);
            None
        }
    }
}

fn validate_filename(filename: &str) -> Result<(), AppError> {
    if filename.trim().is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename == "."
        || filename == ".."
    {
        return Err(AppError::Validation(format!("Invalid image filename: {:?}", filename)));
    }
    Ok(())
}
