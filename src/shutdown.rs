//! Process signals that request a graceful stop.
//!
//! Ctrl+C from a terminal and SIGTERM from a service manager (systemd,
//! docker stop) both end up cancelling the monitor's token, so the check in
//! progress is finished before the process exits.

use std::future::Future;
use tracing::{info, warn};

/// Installs the signal handlers and returns a future that resolves on the
/// first shutdown signal.
///
/// Handlers are registered before this returns, so a signal delivered right
/// after the call is not lost.
pub fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            terminate.recv().await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => info!("Ctrl+C received"),
            () = terminate => info!("SIGTERM received"),
        }
    })
}
