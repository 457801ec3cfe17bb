use tokio::signal;
use tracing::error;

/// Wait for a shutdown signal and return its name for logging.
///
/// Resolves on Ctrl+C everywhere and additionally on SIGTERM on unix (what
/// container runtimes send before a kill).
///
/// # Panics
///
/// Panics if a signal handler cannot be installed - a broken process
/// environment the server should not limp along in.
pub async fn shutdown_signal() -> &'static str {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                panic!("Critical: cannot install SIGTERM signal handler");
            }
        };

        tokio::select! {
            r = signal::ctrl_c() => {
                if let Err(e) = r {
                    error!("Failed to install Ctrl+C handler: {e}");
                    panic!("Critical: cannot install Ctrl+C signal handler");
                }
                "Ctrl+C"
            }
            _ = sigterm.recv() => "SIGTERM",
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            panic!("Critical: cannot install Ctrl+C signal handler");
        }
        "Ctrl+C"
    }
}
