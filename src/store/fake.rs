//! In-process stand-in for the GitHub contents and commits API.
//!
//! Keeps a linear commit log where every commit carries the full file tree,
//! so refs can be resolved by branch name or commit sha.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};

use super::GitHubClient;
use crate::config::GitHubSettings;

pub const TOKEN: &str = "test-token";
pub const OWNER: &str = "cellar";
pub const REPO: &str = "website";
pub const BRANCH: &str = "main";

/// Files above this size are served without inline content.
const MAX_INLINE_SIZE: usize = 1024 * 1024;

struct Commit {
    sha: String,
    message: String,
    path: String,
    /// Committer date
    date: DateTime<Utc>,
    authored: DateTime<Utc>,
    tree: BTreeMap<String, Vec<u8>>,
}

#[derive(Default)]
struct FakeState {
    commits: Vec<Commit>,
    fail_next: Option<(u16, String)>,
    last_per_page: Option<usize>,
}

impl FakeState {
    fn head(&self) -> BTreeMap<String, Vec<u8>> {
        self.commits.last().map(|c| c.tree.clone()).unwrap_or_default()
    }

    fn tree_at(&self, git_ref: &str) -> Option<BTreeMap<String, Vec<u8>>> {
        if git_ref == BRANCH {
            return Some(self.head());
        }
        self.commits
            .iter()
            .find(|c| c.sha == git_ref)
            .map(|c| c.tree.clone())
    }

    fn commit(
        &mut self,
        path: &str,
        content: Option<Vec<u8>>,
        message: &str,
        authored: Option<DateTime<Utc>>,
    ) -> &Commit {
        let mut tree = self.head();
        match content {
            Some(bytes) => {
                tree.insert(path.to_string(), bytes);
            }
            None => {
                tree.remove(path);
            }
        }

        let index = self.commits.len();
        let sha = hex_digest(&(index, message, path));
        let date = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
            + chrono::Duration::minutes(index as i64);

        self.commits.push(Commit {
            sha,
            message: message.to_string(),
            path: path.to_string(),
            date,
            authored: authored.unwrap_or(date),
            tree,
        });
        self.commits.last().unwrap()
    }
}

type Shared = Arc<Mutex<FakeState>>;

/// A running fake server.
pub struct FakeGitHub {
    pub base_url: String,
    state: Shared,
}

impl FakeGitHub {
    pub async fn start() -> Self {
        let state: Shared = Arc::default();

        let app = Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(get_contents).put(put_contents).delete(delete_contents),
            )
            .route("/repos/{owner}/{repo}/commits", get(list_commits))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Settings pointing at `api_url` with the fake's credentials.
    pub fn settings(api_url: &str) -> GitHubSettings {
        GitHubSettings {
            api_url: api_url.to_string(),
            owner: OWNER.to_string(),
            repo: REPO.to_string(),
            branch: BRANCH.to_string(),
            config_path: "data/site-config.json".to_string(),
            images_dir: "public/images".to_string(),
            token: Some(TOKEN.to_string()),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn client_settings(&self) -> GitHubSettings {
        Self::settings(&self.base_url)
    }

    pub fn client(&self) -> GitHubClient {
        GitHubClient::new(&self.client_settings()).expect("Failed to build client")
    }

    /// Commit a file directly, bypassing the HTTP surface.
    pub fn seed(&self, path: &str, content: &[u8], message: &str) {
        self.lock().commit(path, Some(content.to_vec()), message, None);
    }

    /// Like `seed`, but with an author date that differs from the commit
    /// date, as for a cherry-picked or rebased commit.
    pub fn seed_authored(&self, path: &str, content: &[u8], message: &str, authored: DateTime<Utc>) {
        self.lock()
            .commit(path, Some(content.to_vec()), message, Some(authored));
    }

    /// Make the next request fail with the given status and raw body.
    pub fn fail_next(&self, status: u16, body: &str) {
        self.lock().fail_next = Some((status, body.to_string()));
    }

    pub fn last_per_page(&self) -> Option<usize> {
        self.lock().last_per_page
    }

    /// Current content of `path` on the branch head.
    pub fn head_content(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().head().get(path).cloned()
    }

    /// Content of `path` as of commit `sha`.
    pub fn content_at(&self, sha: &str, path: &str) -> Option<Vec<u8>> {
        self.lock().tree_at(sha)?.get(path).cloned()
    }

    /// `(sha, message)` of every commit touching `path`, oldest first.
    pub fn commits_for(&self, path: &str) -> Vec<(String, String)> {
        self.lock()
            .commits
            .iter()
            .filter(|c| c.path == path)
            .map(|c| (c.sha.clone(), c.message.clone()))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub fn blob_sha(content: &[u8]) -> String {
    hex_digest(&("blob", content))
}

fn hex_digest<T: Hash>(value: &T) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    let a = hasher.finish();
    a.hash(&mut hasher);
    let b = hasher.finish();
    format!("{:016x}{:016x}{:08x}", a, b, (a >> 32) as u32)
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

/// Shared preamble: injected failures and bearer auth.
fn gate(state: &mut FakeState, headers: &HeaderMap) -> Option<Response> {
    if let Some((status, body)) = state.fail_next.take() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return Some((status, body).into_response());
    }

    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false);
    if !authorized {
        return Some(message(StatusCode::UNAUTHORIZED, "Bad credentials"));
    }
    None
}

fn signature(date: &DateTime<Utc>) -> Value {
    json!({
        "name": "Site Admin",
        "email": "admin@example.com",
        "date": date.to_rfc3339(),
    })
}

fn commit_json(commit: &Commit) -> Value {
    json!({
        "sha": commit.sha,
        "html_url": format!("https://github.com/{}/{}/commit/{}", OWNER, REPO, commit.sha),
        "message": commit.message,
        "author": signature(&commit.authored),
        "committer": signature(&commit.date),
    })
}

async fn get_contents(
    State(state): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(rejection) = gate(&mut state, &headers) {
        return rejection;
    }

    let git_ref = query.get("ref").map(String::as_str).unwrap_or(BRANCH);
    let Some(tree) = state.tree_at(git_ref) else {
        return message(StatusCode::NOT_FOUND, "No commit found for the ref");
    };
    let Some(content) = tree.get(&path) else {
        return message(StatusCode::NOT_FOUND, "Not Found");
    };

    if content.len() > MAX_INLINE_SIZE {
        return Json(json!({
            "type": "file",
            "encoding": "none",
            "path": path,
            "size": content.len(),
            "sha": blob_sha(content),
            "content": "",
        }))
        .into_response();
    }

    // GitHub wraps base64 content at 60 columns
    let encoded = STANDARD.encode(content);
    let wrapped = encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    Json(json!({
        "type": "file",
        "encoding": "base64",
        "path": path,
        "size": content.len(),
        "sha": blob_sha(content),
        "content": wrapped,
    }))
    .into_response()
}

async fn put_contents(
    State(state): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(rejection) = gate(&mut state, &headers) {
        return rejection;
    }

    let expected = body["sha"].as_str();
    let current = state.head().get(&path).map(|c| blob_sha(c));
    match (current.as_deref(), expected) {
        (Some(current), Some(expected)) if current == expected => {}
        (Some(_), Some(expected)) => {
            return message(
                StatusCode::CONFLICT,
                &format!("{} does not match {}", path, expected),
            )
        }
        (Some(_), None) => {
            return message(
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid request.\n\n\"sha\" wasn't supplied.",
            )
        }
        (None, Some(_)) => return message(StatusCode::CONFLICT, "File does not exist"),
        (None, None) => {}
    }

    let Some(content) = body["content"]
        .as_str()
        .and_then(|c| STANDARD.decode(c).ok())
    else {
        return message(StatusCode::UNPROCESSABLE_ENTITY, "content is not valid Base64");
    };
    let commit_message = body["message"].as_str().unwrap_or_default().to_string();

    let sha = blob_sha(&content);
    let created = current.is_none();
    let commit = state.commit(&path, Some(content), &commit_message, None);
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };

    (
        status,
        Json(json!({
            "content": { "path": path, "sha": sha },
            "commit": commit_json(commit),
        })),
    )
        .into_response()
}

async fn delete_contents(
    State(state): State<Shared>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(rejection) = gate(&mut state, &headers) {
        return rejection;
    }

    let Some(current) = state.head().get(&path).map(|c| blob_sha(c)) else {
        return message(StatusCode::NOT_FOUND, "Not Found");
    };
    if body["sha"].as_str() != Some(current.as_str()) {
        return message(StatusCode::CONFLICT, "sha does not match");
    }

    let commit_message = body["message"].as_str().unwrap_or_default().to_string();
    let commit = state.commit(&path, None, &commit_message, None);

    Json(json!({ "content": null, "commit": commit_json(commit) })).into_response()
}

async fn list_commits(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(rejection) = gate(&mut state, &headers) {
        return rejection;
    }

    let per_page = query
        .get("per_page")
        .and_then(|p| p.parse::<usize>().ok())
        .unwrap_or(30);
    state.last_per_page = Some(per_page);

    let path = query.get("path").cloned().unwrap_or_default();
    let items: Vec<Value> = state
        .commits
        .iter()
        .rev()
        .filter(|c| path.is_empty() || c.path == path)
        .take(per_page.min(100))
        .map(|c| {
            json!({
                "sha": c.sha,
                "html_url": format!("https://github.com/{}/{}/commit/{}", OWNER, REPO, c.sha),
                "commit": {
                    "message": c.message,
                    "author": signature(&c.authored),
                    "committer": signature(&c.date),
                },
                "author": { "login": "site-admin", "avatar_url": "https://avatars.example.com/u/1" },
            })
        })
        .collect();

    Json(items).into_response()
}
