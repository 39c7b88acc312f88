//! Site Config Backend
//!
//! Content backend for the wine bar website. The site config lives as one JSON
//! document in a GitHub repository; every save is a commit.

mod api;
mod auth;
mod config;
mod errors;
mod migration;
mod mirror;
mod models;
mod service;
mod store;
mod summary;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use mirror::LocalMirror;
use service::ConfigService;
use store::GitHubClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ConfigService>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Site Config Backend");
    tracing::info!(
        "Repository: {}/{}@{}",
        config.github.owner,
        config.github.repo,
        config.github.branch
    );
    tracing::info!("Config path: {}", config.github.config_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (SITE_API_PSK). Admin authentication is disabled!");
    }

    // A missing token is fatal here, before any request is served
    let store = GitHubClient::new(&config.github)?;

    let mirror = if config.mode.uses_local_mirror() {
        tracing::info!("Development mode: mirroring config at {:?}", config.mirror_path);
        Some(LocalMirror::new(&config.mirror_path))
    } else {
        None
    };

    let service = Arc::new(ConfigService::new(store, &config.github, mirror));

    // Create application state
    let state = AppState {
        service,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // Admin routes
    let admin_routes = Router::new()
        .route("/config", get(api::get_config).put(api::update_config))
        .route("/config/history", get(api::get_history))
        .route("/config/revert", post(api::revert_config))
        .route(
            "/images/{filename}",
            put(api::update_image).delete(api::delete_image),
        )
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Public routes (no auth required)
    let api_routes = Router::new()
        .route("/config", get(api::get_public_config))
        .nest("/admin", admin_routes);

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
