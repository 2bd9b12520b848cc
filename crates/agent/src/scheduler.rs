//! Certificate rotation loop.
//!
//! Drives the acquisition cycle: submit the signing request, persist the
//! response, invoke the reload hook, then sleep until the next rotation.
//! Failed attempts retry after a fixed short delay, unbounded in count;
//! wall-clock bounding of the first acquisition is the watchdog's job.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use certpilot_config::Config;

use crate::client::{Signer, SigningRequest};
use crate::error::Error;
use crate::reload;
use crate::storage::CertificateStore;
use crate::watchdog::ReadySignal;

/// Delay between failed acquisition attempts.
///
/// Fixed rather than exponential: a loaded or briefly unreachable CA is
/// handled by simply trying again at a steady cadence.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

/// The rotation loop, generic over the signing exchange.
pub struct RotationScheduler<S> {
    config: Config,
    signer: S,
    store: CertificateStore,
    request: SigningRequest,
}

impl<S: Signer> RotationScheduler<S> {
    /// Build the loop around an encoded CSR.
    ///
    /// The signing request is constructed once here; every rotation sends
    /// the same encoded CSR body, with the bundle always requested.
    pub fn new(config: Config, signer: S, store: CertificateStore, encoded_csr: String) -> Self {
        let request = SigningRequest {
            certificate_request: encoded_csr,
            profile: config.endpoint_profile.clone(),
            bundle: true,
        };
        Self {
            config,
            signer,
            store,
            request,
        }
    }

    /// Run the rotation loop.
    ///
    /// Returns after the first success in one-shot mode; otherwise loops
    /// until the process is torn down. Per-attempt failures never escape:
    /// they are logged and retried after [`RETRY_DELAY`].
    pub async fn run(self, mut ready: ReadySignal) -> Result<(), Error> {
        loop {
            info!(
                domains = %self.config.domains.join(","),
                endpoint = %self.config.endpoint_url,
                expiry = ?self.config.expiry,
                profile = %self.config.endpoint_profile,
                "Attempting to acquire certificate from ca"
            );

            let response = match self.signer.sign(&self.request).await {
                Ok(response) => response,
                Err(e) => {
                    error!(error = %e, "Failed to retrieve certificate signing");
                    sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            if let Err(e) = self.store.handle_response(&response) {
                error!(error = %e, "Failed to process certificate response");
                sleep(RETRY_DELAY).await;
                continue;
            }

            info!(
                certificate = %self.config.certificate_file().display(),
                private_key = %self.config.private_key_file().display(),
                "Successfully wrote the tls certificates"
            );

            // The hook outcome is fully resolved, success or not, before
            // the loop proceeds; its failures are logged inside.
            if let Some(ref command) = self.config.exec_command {
                reload::run_hook(
                    command,
                    &self.config.certificate_file(),
                    &self.config.private_key_file(),
                    &self.config.ca_file(),
                    self.config.timeout,
                )
                .await;
            }

            ready.notify();

            if self.config.onetime {
                info!("Onetime mode enabled, exiting the service");
                return Ok(());
            }

            info!(
                duration = ?self.config.expiry,
                "Going to sleep until next certificate rotation"
            );
            sleep(self.config.expiry).await;
        }
    }
}
