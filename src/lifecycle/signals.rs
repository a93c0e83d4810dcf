//! OS signal handling.
//!
//! Only the operator interrupt (SIGINT / Ctrl+C) is handled. The first one
//! starts a graceful shutdown; a second one while draining forces exit.

/// Wait for the operator interrupt.
///
/// If the handler cannot be installed this never resolves, so the process
/// keeps running and can still be stopped through `/shutdown`.
pub async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Interrupt received");
}
