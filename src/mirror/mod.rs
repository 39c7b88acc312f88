//! Local development mirror of the site config.
//!
//! In development the admin panel reads and writes a local copy so edits show
//! up without waiting on GitHub. The mirror is never authoritative: its
//! failures are logged by callers and never fail a request.

use std::io;
use std::path::{Path, PathBuf};

/// A local file shadowing the remote site config.
#[derive(Debug, Clone)]
pub struct LocalMirror {
    path: PathBuf,
}

impl LocalMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the mirrored bytes.
    pub async fn read(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Replace the mirrored bytes. Writes a sibling temp file and renames it
    /// over the mirror so readers never see a partial document.
    pub async fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }

    /// Write and log instead of failing.
    pub async fn write_best_effort(&self, bytes: &[u8]) {
        match self.write(bytes).await {
            Ok(()) => tracing::debug!("Mirrored site config to {}", self.path.display()),
            Err(e) => tracing::warn!(
                "Failed to mirror site config to {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
