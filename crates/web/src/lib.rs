//! CodeSync web server and REST API.
//!
//! Provides an Axum-based HTTP server with:
//! - Status and health endpoints
//! - OTP registration and session-based authentication
//! - Collaborative room API (shared code buffer, chat, code execution)
//! - Gamification API (badges and leaderboard)
//! - Snippet store API
//! - Project fork / pull-request API

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use codesync_core::config::AppConfig;
use codesync_core::{
    CodeRunner, IdentityStore, LeaderboardStore, OtpFlows, OtpMailer, ProjectStore, RoomStore,
    SessionRegistry, SnippetStore,
};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub identity: IdentityStore,
    pub rooms: RoomStore,
    pub snippets: SnippetStore,
    pub leaderboard: LeaderboardStore,
    pub projects: ProjectStore,
    /// In-flight OTP registration flows.
    pub otp_flows: OtpFlows,
    pub mailer: OtpMailer,
    /// Active sessions (token -> session context).
    pub sessions: SessionRegistry,
    pub runner: CodeRunner,
}

impl AppState {
    /// Build the full application state from configuration.
    ///
    /// All stores share the configured data directory.
    pub fn from_config(config: AppConfig) -> Self {
        let data_dir = &config.server.data_dir;
        Self {
            identity: IdentityStore::new(data_dir),
            rooms: RoomStore::new(data_dir),
            snippets: SnippetStore::new(data_dir),
            leaderboard: LeaderboardStore::new(data_dir),
            projects: ProjectStore::new(data_dir),
            otp_flows: OtpFlows::new(),
            mailer: OtpMailer::new(config.smtp.clone()),
            sessions: SessionRegistry::new(config.session.ttl_hours),
            runner: CodeRunner::new(&config.execution),
            config,
        }
    }
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server from the given configuration.
    pub fn new(config: AppConfig) -> Self {
        let state = Arc::new(AppState::from_config(config));
        Self { state }
    }

    /// Start the web server, listening on the given address.
    pub async fn start(self, listen_addr: &str) -> anyhow::Result<()> {
        let addr: SocketAddr = listen_addr.parse()?;

        // CORS: the browser frontend is served from a different origin
        // during development. In production, restrict to the actual origin.
        let cors = CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

        let app = Router::new()
            // API routes
            .merge(api::status::routes())
            .merge(api::auth::routes())
            .merge(api::profile::routes())
            .merge(api::rooms::routes())
            .merge(api::gamification::routes())
            .merge(api::snippets::routes())
            .merge(api::projects::routes())
            // Middleware
            .layer(DefaultBodyLimit::max(2 * 1024 * 1024)) // 2 MB max request body
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.state);

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
