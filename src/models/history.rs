//! Revision markers, history entries and commit results.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque content hash the store returns for each version of a file.
///
/// Doubles as the optimistic concurrency token: a write presents the marker
/// it last observed and the store rejects it if the file has moved on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionMarker(String);

impl RevisionMarker {
    pub(crate) fn new(sha: impl Into<String>) -> Self {
        Self(sha.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in commit messages.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(7)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for RevisionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who made a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitAuthor {
    /// Account handle, when the commit is linked to a user
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub date: DateTime<Utc>,
}

/// One immutable record in the config file's commit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Commit sha; pass it to revert to restore this version
    pub revision: RevisionMarker,
    pub message: String,
    pub author: CommitAuthor,
    pub url: String,
}

/// A file read from the store.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub content: Vec<u8>,
    /// Blob sha of the file, presented back on the next write
    pub sha: RevisionMarker,
}

/// Result of a create-or-update in the store.
#[derive(Debug, Clone)]
pub struct PutOutcome {
    /// Blob sha of the new content
    pub content_sha: RevisionMarker,
    pub commit: HistoryEntry,
}

/// Result of a config write as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitResult {
    /// Commit sha of the new version
    pub revision: RevisionMarker,
    /// Blob sha of the stored document, the token for the next write
    pub content_revision: RevisionMarker,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<PutOutcome> for CommitResult {
    fn from(outcome: PutOutcome) -> Self {
        Self {
            revision: outcome.commit.revision,
            content_revision: outcome.content_sha,
            message: outcome.commit.message,
            url: Some(outcome.commit.url).filter(|u| !u.is_empty()),
        }
    }
}
