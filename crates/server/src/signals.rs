//! Shutdown signal plumbing for the server binary.
//!
//! Waits on SIGTERM and Ctrl+C (SIGINT) and reports which one arrived so
//! the shutdown sequence can say why it is stopping.

/// Resolve once a termination signal arrives, returning its name.
pub async fn wait_for_shutdown() -> &'static str {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT (Ctrl+C)",
        _ = terminate => "SIGTERM",
    }
}
