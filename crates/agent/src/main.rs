//! Certpilot - main entry point
//!
//! A certificate acquisition sidecar for CFSSL-compatible signing
//! endpoints.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use certpilot::Controller;
use certpilot_config::{expand_domains, Config};

/// Certpilot - acquires and rotates TLS certificates from a CFSSL endpoint
#[derive(Parser, Debug)]
#[command(name = "certpilot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Authentication token for the signing endpoint
    #[arg(long = "token", env = "TOKEN")]
    token: Option<String>,

    /// Signing endpoint url
    #[arg(
        long = "url",
        env = "URL",
        default_value = "https://ca.kube-tls.svc.cluster.local"
    )]
    url: String,

    /// Signing profile to request
    #[arg(long = "profile", env = "PROFILE", default_value = "")]
    profile: String,

    /// Path to a file containing an additional trust root for the endpoint
    #[arg(long = "tls-ca", env = "TLS_CA")]
    tls_ca: Option<PathBuf>,

    /// Domain the certificate must cover; repeatable, may contain ${VAR}
    /// placeholders resolved from the environment
    #[arg(long = "domain", env = "DOMAIN", value_delimiter = ',')]
    domains: Vec<String>,

    /// RSA key size in bits
    #[arg(long = "size", env = "SIZE", default_value_t = 2048)]
    size: usize,

    /// Interval between certificate rotations
    #[arg(
        long = "expiry",
        env = "EXPIRY",
        default_value = "2160h",
        value_parser = humantime::parse_duration
    )]
    expiry: Duration,

    /// Directory the certificates are written to
    #[arg(long = "certs", env = "CERTS", default_value = "/certs")]
    certs: PathBuf,

    /// Command executed once a new certificate has been acquired
    #[arg(long = "command", env = "COMMAND")]
    command: Option<String>,

    /// Organization placed in the certificate request
    #[arg(long = "organization", env = "ORGANIZATION", default_value = "ACP Homeoffice")]
    organization: String,

    /// Country placed in the certificate request
    #[arg(long = "country", env = "COUNTRY", default_value = "GB")]
    country: String,

    /// Locality placed in the certificate request
    #[arg(long = "locality", env = "LOCALITY", default_value = "London")]
    locality: String,

    /// Province placed in the certificate request
    #[arg(long = "province", env = "PROVINCE", default_value = "London")]
    province: String,

    /// Acquire a single certificate and exit
    #[arg(long = "onetime", env = "ONETIME")]
    onetime: bool,

    /// Filename of the ca bundle file
    #[arg(long = "tls-ca-name", env = "TLS_CA_NAME", default_value = "tls-ca.pem")]
    tls_ca_name: String,

    /// Filename of the certificate file
    #[arg(long = "tls-cert-name", env = "TLS_CERT_NAME", default_value = "tls.pem")]
    tls_cert_name: String,

    /// Filename of the private key file
    #[arg(long = "tls-key-name", env = "TLS_KEY_NAME", default_value = "tls-key.pem")]
    tls_key_name: String,

    /// Operational timeout: exit when no certificate was acquired in time
    #[arg(
        long = "timeout",
        env = "TIMEOUT",
        default_value = "1m",
        value_parser = humantime::parse_duration
    )]
    timeout: Duration,

    /// Enable verbose logging (debug level)
    #[arg(long = "verbose", env = "VERBOSE")]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let domains =
            expand_domains(&self.domains).context("failed to expand domain placeholders")?;

        Ok(Config {
            endpoint_url: self.url,
            endpoint_token: self.token,
            endpoint_profile: self.profile,
            organization: self.organization,
            country: self.country,
            locality: self.locality,
            province: self.province,
            key_size: self.size,
            domains,
            certs_dir: self.certs,
            ca_filename: self.tls_ca_name,
            cert_filename: self.tls_cert_name,
            key_filename: self.tls_key_name,
            expiry: self.expiry,
            timeout: self.timeout,
            exec_command: self.command,
            onetime: self.onetime,
            verbose: self.verbose,
            tls_ca_path: self.tls_ca,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Structured JSON logs; debug level behind the verbose flag.
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .init();

    let config = cli.into_config()?;

    let controller = Controller::new(config).context("failed to initialize controller")?;
    controller.run().await.context("failed to run controller")?;

    Ok(())
}
