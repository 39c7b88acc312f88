//! GitHub contents/commits REST client.
//!
//! Every write is a compare-and-swap on the file's blob sha; the store is the
//! only place concurrent edits are arbitrated.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};

use crate::config::GitHubSettings;
use crate::errors::AppError;
use crate::models::{CommitAuthor, FileContent, HistoryEntry, PutOutcome, RevisionMarker};

/// Upper bound on history page size.
pub const MAX_HISTORY_LIMIT: usize = 100;

const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("site-config-backend/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

/// Just the blob sha; files over 1 MB come back with `encoding: "none"`.
#[derive(Debug, Deserialize)]
struct ContentsMetadata {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Debug, Serialize)]
struct DeleteContentsRequest<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    content: Option<WrittenContent>,
    commit: WrittenCommit,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WrittenCommit {
    sha: String,
    #[serde(default)]
    html_url: String,
    message: String,
    author: GitAuthor,
}

#[derive(Debug, Deserialize)]
struct GitAuthor {
    name: String,
    email: String,
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CommitListItem {
    sha: String,
    #[serde(default)]
    html_url: String,
    commit: CommitDetail,
    author: Option<AccountRef>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: GitAuthor,
    #[serde(default)]
    committer: Option<GitAuthor>,
    message: String,
}

impl CommitListItem {
    fn committed_at(&self) -> DateTime<Utc> {
        self.commit
            .committer
            .as_ref()
            .map(|c| c.date)
            .unwrap_or(self.commit.author.date)
    }
}

#[derive(Debug, Deserialize)]
struct AccountRef {
    login: String,
    #[serde(default)]
    avatar_url: Option<String>,
}

/// Client for one GitHub repository.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_url: Url,
    owner: String,
    repo: String,
    branch: String,
}

impl GitHubClient {
    /// Build a client. Fails with `MissingCredential` when no token is
    /// configured, before any request is made.
    pub fn new(settings: &GitHubSettings) -> Result<Self, AppError> {
        let token = settings
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::MissingCredential)?;

        if settings.owner.trim().is_empty() || settings.repo.trim().is_empty() {
            return Err(AppError::Validation(
                "GITHUB_OWNER and GITHUB_REPO must be set".to_string(),
            ));
        }

        let api_url = Url::parse(&settings.api_url).map_err(|e| {
            AppError::Validation(format!("Invalid GITHUB_API_URL {}: {}", settings.api_url, e))
        })?;
        if api_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "Invalid GITHUB_API_URL {}",
                settings.api_url
            )));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AppError::Validation("GITHUB_TOKEN is not a valid header value".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            http,
            api_url,
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            branch: settings.branch.clone(),
        })
    }

    /// The configured branch.
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Fetch and decode the file at `path` as of `git_ref` (branch name or commit sha).
    pub async fn get_content_at(&self, path: &str, git_ref: &str) -> Result<FileContent, AppError> {
        tracing::debug!(path, git_ref, "Fetching file from GitHub");

        let response = self
            .http
            .get(self.contents_url(path))
            .query(&[("ref", git_ref)])
            .send()
            .await?;
        let response = check_status(response, || format!("{} not found at {}", path, git_ref)).await?;

        let body: ContentsResponse = response.json().await.map_err(|e| {
            AppError::InvalidContent(format!("{} is not a file: {}", path, e))
        })?;

        if body.encoding.as_deref() == Some("none") {
            return Err(AppError::InvalidContent(format!(
                "{} is too large for the contents API",
                path
            )));
        }

        let encoded: String = body.content.chars().filter(|c| !c.is_whitespace()).collect();
        let content = STANDARD.decode(encoded)?;

        Ok(FileContent {
            content,
            sha: RevisionMarker::new(body.sha),
        })
    }

    /// Create or update `path` on `branch`.
    ///
    /// `expected` must be the blob sha last read for the file, or `None` when
    /// creating it. If the file has changed since, the store rejects the write
    /// and this returns `Conflict`; it is never retried here.
    pub async fn put_content(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected: Option<&RevisionMarker>,
        branch: &str,
    ) -> Result<PutOutcome, AppError> {
        tracing::debug!(
            path,
            branch,
            expected = expected.map(RevisionMarker::short),
            "Writing file to GitHub"
        );

        let request = PutContentsRequest {
            message,
            content: STANDARD.encode(content),
            sha: expected.map(RevisionMarker::as_str),
            branch,
        };

        let response = self
            .http
            .put(self.contents_url(path))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response, || format!("{} not found on {}", path, branch)).await?;

        let body: WriteResponse = response.json().await?;
        let content_sha = body
            .content
            .map(|c| RevisionMarker::new(c.sha))
            .ok_or_else(|| AppError::InvalidContent("Write response carried no content".to_string()))?;

        Ok(PutOutcome {
            content_sha,
            commit: history_entry_from_write(body.commit),
        })
    }

    /// Blob sha of `path` at `git_ref`, without decoding the content.
    async fn file_sha(&self, path: &str, git_ref: &str) -> Result<RevisionMarker, AppError> {
        let response = self
            .http
            .get(self.contents_url(path))
            .query(&[("ref", git_ref)])
            .send()
            .await?;
        let response = check_status(response, || format!("{} not found at {}", path, git_ref)).await?;

        let body: ContentsMetadata = response.json().await.map_err(|e| {
            AppError::InvalidContent(format!("{} is not a file: {}", path, e))
        })?;
        Ok(RevisionMarker::new(body.sha))
    }

    /// Remove `path` from the configured branch. Fails with `NotFound` if absent.
    pub async fn delete_path(&self, path: &str, message: &str) -> Result<(), AppError> {
        let sha = self.file_sha(path, &self.branch).await?;

        tracing::debug!(path, branch = %self.branch, "Deleting file from GitHub");

        let request = DeleteContentsRequest {
            message,
            sha: sha.as_str(),
            branch: &self.branch,
        };

        let response = self
            .http
            .delete(self.contents_url(path))
            .json(&request)
            .send()
            .await?;
        check_status(response, || format!("{} not found", path)).await?;

        Ok(())
    }

    /// Up to `limit` most recent commits touching `path`, newest first.
    /// `limit` is clamped to `1..=MAX_HISTORY_LIMIT`.
    pub async fn list_history(&self, path: &str, limit: usize) -> Result<Vec<HistoryEntry>, AppError> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let per_page = limit.to_string();

        let response = self
            .http
            .get(self.repo_url(&["commits"]))
            .query(&[
                ("path", path),
                ("sha", self.branch.as_str()),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await?;
        let response = check_status(response, || format!("No history for {}", path)).await?;

        let mut items: Vec<CommitListItem> = response.json().await?;

        // Committer date is when the commit landed; the author date survives rebases
        items.sort_by(|a, b| b.committed_at().cmp(&a.committed_at()));
        items.truncate(limit);

        Ok(items.into_iter().map(history_entry_from_list).collect())
    }

    fn contents_url(&self, path: &str) -> Url {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.repo_url(&segments)
    }

    fn repo_url(&self, tail: &[&str]) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str()])
                .extend(tail);
        }
        url
    }
}

/// Map a non-2xx response onto the error taxonomy.
async fn check_status(
    response: Response,
    not_found: impl FnOnce() -> String,
) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(status = status.as_u16(), body = %body, "GitHub request failed");

    Err(match status {
        StatusCode::NOT_FOUND => AppError::NotFound {
            message: not_found(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized {
            status: status.as_u16(),
            message: github_message(&body).unwrap_or_else(|| "GitHub rejected the credential".to_string()),
        },
        StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => AppError::Conflict {
            status: status.as_u16(),
            message: github_message(&body)
                .unwrap_or_else(|| "File changed since it was read".to_string()),
        },
        // GitHub answers 422 when a required sha is missing for an existing file
        StatusCode::UNPROCESSABLE_ENTITY if body.contains("sha") => AppError::Conflict {
            status: status.as_u16(),
            message: github_message(&body).unwrap_or_else(|| "File already exists".to_string()),
        },
        _ => AppError::Upstream {
            status: Some(status.as_u16()),
            body,
        },
    })
}

fn github_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

fn history_entry_from_write(commit: WrittenCommit) -> HistoryEntry {
    HistoryEntry {
        revision: RevisionMarker::new(commit.sha),
        message: commit.message,
        author: CommitAuthor {
            login: None,
            name: commit.author.name,
            email: commit.author.email,
            avatar_url: None,
            date: commit.author.date,
        },
        url: commit.html_url,
    }
}

fn history_entry_from_list(item: CommitListItem) -> HistoryEntry {
    let (login, avatar_url) = match item.author {
        Some(account) => (Some(account.login), account.avatar_url),
        None => (None, None),
    };

    HistoryEntry {
        revision: RevisionMarker::new(item.sha),
        message: item.commit.message,
        author: CommitAuthor {
            login,
            name: item.commit.author.name,
            email: item.commit.author.email,
            avatar_url,
            date: item.commit.author.date,
        },
        url: item.html_url,
    }
}
