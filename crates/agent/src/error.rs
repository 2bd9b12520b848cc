//! Error types for the certificate acquisition flow.

use std::time::Duration;

use thiserror::Error;

use certpilot_config::ConfigError;

/// Acquisition errors
///
/// Configuration, key and CSR failures are fatal at start-up. Transport,
/// signing and write failures are transient: the rotation loop logs them
/// and retries the attempt. [`Error::DeadlineExceeded`] is raised by the
/// watchdog when the first certificate was not acquired in time and is
/// fatal to the process.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to generate private key: {0}")]
    Key(String),

    #[error("failed to build certificate request: {0}")]
    Csr(#[from] rcgen::Error),

    #[error("request to signing endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unsuccessful operation, errors: {0}")]
    Signing(String),

    #[error("no certificate found in the response")]
    EmptyCertificate,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no certificate acquired within {0:?}")]
    DeadlineExceeded(Duration),
}
