//! OS signal handling.
//!
//! # Responsibilities
//! - SIGTERM/SIGINT → trigger graceful shutdown
//! - SIGHUP → ask the daemon for an immediate resync
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGHUP never shuts down; it can be sent any number of times

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Spawn the signal task. Each SIGHUP sends one `()` on `resync`.
pub fn spawn(shutdown: Shutdown, resync: mpsc::UnboundedSender<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_shutdown(resync).await;
        shutdown.trigger();
    })
}

#[cfg(unix)]
async fn wait_for_shutdown(resync: mpsc::UnboundedSender<()>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut terminate, mut hangup) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::hangup()),
    ) {
        (Ok(terminate), Ok(hangup)) => (terminate, hangup),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to install signal handlers, only Ctrl+C is handled");
            ctrl_c().await;
            return;
        }
    };

    loop {
        tokio::select! {
            _ = ctrl_c() => {
                tracing::info!("Received SIGINT, initiating shutdown");
                return;
            }
            _ = terminate.recv() => {
                tracing::info!("Received SIGTERM, initiating shutdown");
                return;
            }
            _ = hangup.recv() => {
                tracing::info!("Received SIGHUP, resyncing");
                if resync.send(()).is_err() {
                    return;
                }
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown(_resync: mpsc::UnboundedSender<()>) {
    ctrl_c().await;
    tracing::info!("Received Ctrl+C, initiating shutdown");
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
