//! Configuration module for the site config backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Runtime mode. Development prefers the local mirror for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Development,
    Production,
}

impl RuntimeMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(RuntimeMode::Development),
            "production" | "prod" => Some(RuntimeMode::Production),
            _ => None,
        }
    }

    pub fn uses_local_mirror(&self) -> bool {
        matches!(self, RuntimeMode::Development)
    }
}

/// Connection settings for the GitHub repository holding the site config.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    /// Base URL of the REST API
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    /// Branch read from and committed to
    pub branch: String,
    /// Path of the site config document inside the repository
    pub config_path: String,
    /// Repository directory holding uploaded images
    pub images_dir: String,
    /// Access token; absence is reported when the client is built
    pub token: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding the admin API (required in production)
    pub api_psk: Option<String>,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub mode: RuntimeMode,
    /// Local mirror of the site config, used in development mode
    pub mirror_path: PathBuf,
    pub github: GitHubSettings,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("SITE_API_PSK").ok().filter(|s| !s.is_empty());

        let bind_addr_raw =
            env::var("SITE_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_addr_raw.parse().map_err(|_| {
            AppError::Validation(format!("Invalid SITE_BIND_ADDR format: {}", bind_addr_raw))
        })?;

        let log_level = env::var("SITE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mode = match env::var("SITE_ENV") {
            Ok(raw) => RuntimeMode::parse(&raw)
                .ok_or_else(|| AppError::Validation(format!("Invalid SITE_ENV: {}", raw)))?,
            Err(_) => RuntimeMode::Production,
        };

        let mirror_path = env::var("SITE_MIRROR_PATH")
            .unwrap_or_else(|_| "./data/site-config.json".to_string())
            .into();

        let timeout_secs = match env::var("GITHUB_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                AppError::Validation(format!("Invalid GITHUB_TIMEOUT_SECS: {}", raw))
            })?,
            Err(_) => 15,
        };

        let github = GitHubSettings {
            api_url: env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            owner: env::var("GITHUB_OWNER").unwrap_or_default(),
            repo: env::var("GITHUB_REPO").unwrap_or_default(),
            branch: env::var("GITHUB_BRANCH").unwrap_or_else(|_| "main".to_string()),
            config_path: env::var("GITHUB_CONFIG_PATH")
                .unwrap_or_else(|_| "data/site-config.json".to_string()),
            images_dir: env::var("SITE_IMAGES_DIR").unwrap_or_else(|_| "public/images".to_string()),
            token: env::var("GITHUB_TOKEN").ok().filter(|s| !s.trim().is_empty()),
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            api_psk,
            bind_addr,
            log_level,
            mode,
            mirror_path,
            github,
        })
    }
}
