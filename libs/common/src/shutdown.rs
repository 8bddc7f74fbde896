//! Graceful shutdown utilities

use tracing::warn;

/// Wait for a shutdown signal and return its name
///
/// - On Unix: Ctrl+C (SIGINT) or SIGTERM
/// - Elsewhere: Ctrl+C only
///
/// ```ignore
/// tokio::select! {
///     result = dispatcher.run() => result?,
///     signal = common::shutdown::wait_for_shutdown() => {
///         info!("{} received, stopping", signal);
///     }
/// }
/// ```
pub async fn wait_for_shutdown() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(sig) => Some(sig),
            Err(e) => {
                warn!(
                    "Failed to install SIGTERM handler: {}. Only Ctrl+C will stop the service",
                    e
                );
                None
            },
        };

        tokio::select! {
            _ = ctrl_c() => "SIGINT",
            _ = async {
                match term_signal.as_mut() {
                    Some(sig) => {
                        sig.recv().await;
                    },
                    None => std::future::pending::<()>().await,
                }
            } => "SIGTERM",
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await;
        "Ctrl+C"
    }
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
