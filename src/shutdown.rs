//! Ctrl+C / SIGTERM handling.
//!
//! The first signal cancels the returned token: the downloader stops
//! scheduling new assets, abandons in-flight ones and removes their scratch
//! files, and the remaining categories are skipped. A second signal exits
//! immediately; any scratch files it strands are swept by the next run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

#[derive(Debug, PartialEq, Eq)]
enum SignalAction {
    Cancel,
    Exit,
}

/// Decide what a received signal does, cancelling `token` on the first one.
fn on_signal(seen: &AtomicBool, token: &CancellationToken) -> SignalAction {
    if seen.swap(true, Ordering::SeqCst) {
        return SignalAction::Exit;
    }
    token.cancel();
    SignalAction::Cancel
}

pub(crate) fn install_signal_handler() -> anyhow::Result<CancellationToken> {
    let token = CancellationToken::new();

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    let handler_token = token.clone();
    let seen = Arc::new(AtomicBool::new(false));
    tokio::spawn(async move {
        loop {
            #[cfg(unix)]
            let received = tokio::select! {
                r = tokio::signal::ctrl_c() => r.is_ok(),
                r = sigterm.recv() => r.is_some(),
            };
            #[cfg(not(unix))]
            let received = tokio::signal::ctrl_c().await.is_ok();

            if !received {
                tracing::warn!("Signal listener closed, shutdown on signal disabled");
                return;
            }

            match on_signal(&seen, &handler_token) {
                SignalAction::Exit => {
                    tracing::warn!("Second signal received, exiting now");
                    std::process::exit(130);
                }
                SignalAction::Cancel => {
                    tracing::info!("Shutdown requested, abandoning in-flight downloads...");
                    tracing::info!("Press Ctrl+C again to exit immediately");
                }
            }
        }
    });

    Ok(token)
}
