//! Service controller.
//!
//! Wires the configuration, signing client, request builder and rotation
//! loop together, and races the first acquisition against the operational
//! watchdog.

use tracing::info;

use certpilot_config::Config;

use crate::client::SigningClient;
use crate::csr::CertificateRequest;
use crate::error::Error;
use crate::scheduler::RotationScheduler;
use crate::storage::CertificateStore;
use crate::watchdog;

/// The acquisition service.
pub struct Controller {
    config: Config,
    client: SigningClient,
}

impl Controller {
    /// Validate the configuration and construct the signing client.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;
        let client = SigningClient::from_config(&config)?;
        Ok(Self { config, client })
    }

    /// Run the service until completion.
    ///
    /// Ensures the certificate directory, builds the CSR once, then drives
    /// the rotation loop. Returns `Ok(())` only in one-shot mode after the
    /// first success; a watchdog deadline violation or any start-up
    /// failure returns the error for the process to exit on.
    pub async fn run(self) -> Result<(), Error> {
        let store = CertificateStore::new(&self.config);
        store.ensure_dir()?;

        let request = CertificateRequest::load_or_generate(&self.config)?;

        info!(
            domains = %self.config.domains.join(","),
            endpoint = %self.config.endpoint_url,
            "Starting certificate acquisition service"
        );

        let (ready, watchdog) = watchdog::channel(self.config.timeout);
        let scheduler =
            RotationScheduler::new(self.config, self.client, store, request.into_csr_pem());

        tokio::select! {
            result = scheduler.run(ready) => result,
            violation = watchdog.guard() => Err(violation),
        }
    }
}
