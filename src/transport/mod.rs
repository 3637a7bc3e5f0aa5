//! Transport layer.
//!
//! - HTTP: SSE event stream per session plus a message POST endpoint
//! - Stdio: newline-delimited JSON-RPC on stdin/stdout

pub mod http;
pub mod session;
pub mod stdio;

pub use http::HttpTransport;
pub use session::{SessionGuard, SessionId, SessionManager};
pub use stdio::StdioTransport;

use crate::error::ServerResult;
use std::future::Future;
use tokio::signal;
use tracing::{info, warn};

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// Serve until shutdown.
    fn run(&self) -> impl Future<Output = ServerResult<()>> + Send;

    /// Get the name of this transport for logging.
    fn name(&self) -> &'static str;
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub(crate) async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
