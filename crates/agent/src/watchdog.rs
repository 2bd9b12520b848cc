//! Operational deadline guard for the first acquisition.
//!
//! The process promises a certificate within the configured operational
//! timeout. The watchdog races a one-shot success signal from the rotation
//! loop against that deadline; if the deadline elapses first the process
//! must terminate. After the first success the watchdog stands down for
//! good: steady-state resilience is the rotation loop's own retry
//! behavior.

use std::future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, error};

use crate::error::Error;

/// One-shot completion signal fired after the first successful acquisition.
pub struct ReadySignal {
    tx: Option<oneshot::Sender<()>>,
}

impl ReadySignal {
    /// Signal that a certificate has been acquired.
    ///
    /// Consumes the underlying sender on first use; notifying again, or
    /// after the watchdog has already resolved, is a safe no-op.
    pub fn notify(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Deadline guard consuming the [`ReadySignal`].
pub struct Watchdog {
    rx: oneshot::Receiver<()>,
    deadline: Duration,
}

/// Create the signal/guard pair for one process start.
pub fn channel(deadline: Duration) -> (ReadySignal, Watchdog) {
    let (tx, rx) = oneshot::channel();
    (ReadySignal { tx: Some(tx) }, Watchdog { rx, deadline })
}

impl Watchdog {
    /// Wait out the first acquisition.
    ///
    /// Resolves only when the deadline is violated; once the success
    /// signal arrives this future stays pending forever, so it can be
    /// raced against the rotation loop without ever ending it.
    pub async fn guard(self) -> Error {
        match timeout(self.deadline, self.rx).await {
            Ok(_) => {
                debug!("First certificate acquired within the operational deadline");
                future::pending().await
            }
            Err(_) => {
                error!(
                    deadline = ?self.deadline,
                    "No certificate acquired within the operational deadline"
                );
                Error::DeadlineExceeded(self.deadline)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_violation_resolves() {
        let (_ready, watchdog) = channel(Duration::from_secs(60));

        let err = watchdog.guard().await;
        assert!(matches!(err, Error::DeadlineExceeded(d) if d == Duration::from_secs(60)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_signal_stands_the_watchdog_down() {
        let (mut ready, watchdog) = channel(Duration::from_secs(60));
        ready.notify();

        // Long past the deadline the guard must still be pending.
        tokio::select! {
            _ = watchdog.guard() => panic!("watchdog resolved after success signal"),
            _ = sleep(Duration::from_secs(3600)) => {}
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_after_timeout_is_noop() {
        let (mut ready, watchdog) = channel(Duration::from_secs(5));

        let err = watchdog.guard().await;
        assert!(matches!(err, Error::DeadlineExceeded(_)));

        // The receiver is long gone; this must not panic.
        ready.notify();
        ready.notify();
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_signal_stands_the_watchdog_down() {
        let (ready, watchdog) = channel(Duration::from_secs(60));
        drop(ready);

        // A dropped sender is not a deadline violation; the loop's own
        // error handling decides the process fate in that case.
        tokio::select! {
            _ = watchdog.guard() => panic!("watchdog resolved on dropped sender"),
            _ = sleep(Duration::from_secs(3600)) => {}
        }
    }
}
