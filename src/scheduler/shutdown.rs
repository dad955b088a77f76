//! SIGINT / SIGTERM → cancellation token
//!
//! The first signal cancels the token and lets the current stage finish.
//! A second signal exits the process at once.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Exit status used when a second signal cuts shutdown short.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Cancel `token` on the first interrupt or termination signal and exit the
/// process on the second.
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<()> {
    spawn_with_escalation(token, |signal| {
        error!(signal, "🛑 Second shutdown signal, exiting without waiting for the current stage");
        std::process::exit(FORCED_EXIT_CODE);
    })
}

fn spawn_with_escalation<F>(token: CancellationToken, on_repeat: F) -> JoinHandle<()>
where
    F: FnOnce(&'static str) + Send + 'static,
{
    // Installed before spawning so no signal is lost to the default handler.
    let mut signals = ShutdownSignals::install();
    tokio::spawn(async move {
        tokio::select! {
            signal = signals.next() => {
                info!(signal, "🛑 Shutdown requested, letting the current stage finish (signal again to force)...");
                token.cancel();
            }
            _ = token.cancelled() => return,
        }
        let signal = signals.next().await;
        on_repeat(signal);
    })
}

#[cfg(unix)]
struct ShutdownSignals {
    interrupt: Option<tokio::signal::unix::Signal>,
    terminate: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl ShutdownSignals {
    fn install() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let interrupt = signal(SignalKind::interrupt())
            .map_err(|e| warn!(error = %e, "Failed to install SIGINT handler"))
            .ok();
        let terminate = signal(SignalKind::terminate())
            .map_err(|e| warn!(error = %e, "Failed to install SIGTERM handler"))
            .ok();
        Self { interrupt, terminate }
    }

    async fn next(&mut self) -> &'static str {
        tokio::select! {
            () = recv_or_pending(&mut self.interrupt) => "SIGINT",
            () = recv_or_pending(&mut self.terminate) => "SIGTERM",
        }
    }
}

/// Resolves on the next delivery; never resolves for a missing or closed stream.
#[cfg(unix)]
async fn recv_or_pending(signal: &mut Option<tokio::signal::unix::Signal>) {
    if let Some(s) = signal {
        if s.recv().await.is_some() {
            return;
        }
    }
    std::future::pending::<()>().await;
}

#[cfg(not(unix))]
struct ShutdownSignals;

#[cfg(not(unix))]
impl ShutdownSignals {
    fn install() -> Self {
        Self
    }

    async fn next(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        "SIGINT"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_listener_exits_when_token_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = spawn_with_escalation(token.clone(), |_| {});
        token.cancel();
        handle.await.unwrap();
    }

    #[cfg(unix)]
    fn send_sigterm_to_self() {
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_second_signal_escalates() {
        let token = CancellationToken::new();
        let (tx, rx) = tokio::sync::oneshot::channel();
        let _handle = spawn_with_escalation(token.clone(), move |signal| {
            let _ = tx.send(signal);
        });

        send_sigterm_to_self();
        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .unwrap();

        send_sigterm_to_self();
        let signal = tokio::time::timeout(Duration::from_secs(5), rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(signal, "SIGTERM");
    }
}
