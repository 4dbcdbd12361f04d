//! codesync server entry point.
//!
//! Loads configuration, initializes logging and the data directory, starts
//! the web server, and handles graceful shutdown.

mod signals;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use codesync_core::config::AppConfig;
use codesync_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// codesync classroom server.
#[derive(Parser, Debug)]
#[command(
    name = "codesync-server",
    version,
    about = "Collaborative coding classroom backend"
)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load and resolve configuration
    let config = match &args.config {
        Some(path) => {
            AppConfig::load_and_resolve(path).context("failed to load configuration file")?
        }
        None => AppConfig::default(),
    };

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    // Startup banner
    info!("========================================");
    info!("  codesync server v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    match &args.config {
        Some(path) => info!("Config file   : {}", path.display()),
        None => info!("Config file   : (defaults)"),
    }
    info!("Web listen    : {}", config.server.listen);
    info!("Data dir      : {}", config.server.data_dir.display());
    info!("Interpreter   : {}", config.execution.interpreter);
    info!("Exec timeout  : {}s", config.execution.timeout_secs);
    info!(
        "SMTP relay    : {}",
        config.smtp.relay.as_deref().unwrap_or("(none, OTP to log)")
    );
    info!("Log level     : {}", log_level);
    info!("========================================");

    // Ensure data directory exists
    std::fs::create_dir_all(&config.server.data_dir)
        .context("failed to create data directory")?;

    // Initialize web server
    let listen_addr = config.server.listen.clone();
    let web_server = WebServer::new(config);

    // Start web server in background
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web_server.start(&listen_addr).await {
            error!("Web server error: {}", e);
        }
    });

    // Wait for shutdown signal
    let signal = signals::wait_for_shutdown().await;

    info!("Received {}, stopping...", signal);

    // Sessions and OTP flows live in memory; the JSON stores are already
    // durable after every mutation, so there is nothing to flush.
    web_handle.abort();

    info!("codesync server stopped.");
    Ok(())
}
