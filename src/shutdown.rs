//! Signal handling.
//!
//! The first SIGINT (Ctrl+C) or SIGTERM cancels the run token so the
//! reconciler stops at its next suspension point with the outcome logs
//! intact. A second signal exits immediately.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::ExitCode;

/// Spawn the signal listener and return the token it cancels.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let count = Arc::new(AtomicU32::new(0));

    let handler_token = token.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut sigterm = {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("Could not register SIGTERM handler: {}", e);
                    None
                }
            }
        };

        loop {
            #[cfg(unix)]
            {
                let term = async {
                    match sigterm.as_mut() {
                        Some(s) => {
                            s.recv().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                };
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            warn!("Could not listen for Ctrl+C: {}", e);
                            return;
                        }
                    }
                    _ = term => {}
                }
            }

            #[cfg(not(unix))]
            {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Could not listen for Ctrl+C: {}", e);
                    return;
                }
            }

            if count.fetch_add(1, Ordering::SeqCst) == 0 {
                info!("Received shutdown signal, stopping after the current request");
                info!("Press Ctrl+C again to exit immediately");
                handler_token.cancel();
            } else {
                warn!("Force exit requested");
                std::process::exit(ExitCode::Cancelled.into());
            }
        }
    });

    token
}
