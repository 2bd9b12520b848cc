//! External reload hook execution.
//!
//! After a certificate has been written, an optional external command is
//! invoked with the certificate, private key and CA bundle paths so the
//! workload can pick up the new material. The command runs under the
//! configured deadline and is killed when it overruns. Failures here are
//! logged and swallowed: a broken hook must never prevent the next
//! scheduled rotation.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Invoke `command <certificate> <private-key> <ca-bundle>` and wait for it
/// under `deadline`. The hook must be safe to interrupt: cancellation is a
/// forced kill, not a cooperative signal.
pub async fn run_hook(
    command: &str,
    certificate: &Path,
    private_key: &Path,
    ca_bundle: &Path,
    deadline: Duration,
) {
    info!(command = %command, timeout = ?deadline, "Calling external command");

    let child = Command::new(command)
        .arg(certificate)
        .arg(private_key)
        .arg(ca_bundle)
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            error!(command = %command, error = %e, "Failed to start external command");
            return;
        }
    };

    // Dropping the timeout on the normal-exit path disarms the deadline.
    match timeout(deadline, child.wait()).await {
        Ok(Ok(status)) if status.success() => {}
        Ok(Ok(status)) => {
            error!(command = %command, status = %status, "Error calling external command");
        }
        Ok(Err(e)) => {
            error!(command = %command, error = %e, "Error waiting on external command");
        }
        Err(_) => {
            warn!(command = %command, "External command took too long, operation timed out");
            if let Err(e) = child.kill().await {
                error!(command = %command, error = %e, "Failed to kill external command");
            }
        }
    }
}
