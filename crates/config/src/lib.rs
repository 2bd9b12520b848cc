//! Configuration for the certpilot acquisition sidecar.
//!
//! The configuration is assembled once at start-up (from command-line flags
//! and environment variables) and is immutable for the process lifetime.
//! This crate owns the finished [`Config`] struct, its validation, and the
//! helpers deriving the output file paths from the certificate directory.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Configuration errors
///
/// All variants are fatal: an invalid configuration aborts the process
/// before the first acquisition attempt.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no domains have been specified")]
    NoDomains,

    #[error("no signing endpoint has been specified")]
    MissingEndpoint,

    #[error("certificate directory {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("certificate directory {0:?} is not writable")]
    DirectoryNotWritable(PathBuf),

    #[error("unresolvable placeholder in domain {domain:?}: {reason}")]
    Placeholder { domain: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Service configuration, supplied once and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the CFSSL signing endpoint
    pub endpoint_url: String,
    /// Bearer token; selects the authenticated signing path when present
    pub endpoint_token: Option<String>,
    /// Signing profile requested from the endpoint
    pub endpoint_profile: String,
    /// Organization placed in the request subject
    pub organization: String,
    /// Country placed in the request subject
    pub country: String,
    /// Locality placed in the request subject
    pub locality: String,
    /// Province placed in the request subject
    pub province: String,
    /// RSA key size in bits
    pub key_size: usize,
    /// Domains the certificate must cover; first entry is the common name
    pub domains: Vec<String>,
    /// Directory the certificate material is written to
    pub certs_dir: PathBuf,
    /// Filename for the CA bundle
    pub ca_filename: String,
    /// Filename for the certificate
    pub cert_filename: String,
    /// Filename for the private key
    pub key_filename: String,
    /// Interval between certificate rotations
    pub expiry: Duration,
    /// Operational timeout for the first acquisition and the reload hook
    pub timeout: Duration,
    /// Command executed after a certificate has been written
    pub exec_command: Option<String>,
    /// Acquire a single certificate and exit
    pub onetime: bool,
    /// Debug-level logging
    pub verbose: bool,
    /// Additional trust root for the HTTP client
    pub tls_ca_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint_url: "https://ca.kube-tls.svc.cluster.local".to_string(),
            endpoint_token: None,
            endpoint_profile: String::new(),
            organization: "ACP Homeoffice".to_string(),
            country: "GB".to_string(),
            locality: "London".to_string(),
            province: "London".to_string(),
            key_size: 2048,
            domains: Vec::new(),
            certs_dir: PathBuf::from("/certs"),
            ca_filename: "tls-ca.pem".to_string(),
            cert_filename: "tls.pem".to_string(),
            key_filename: "tls-key.pem".to_string(),
            expiry: Duration::from_secs(90 * 24 * 3600),
            timeout: Duration::from_secs(60),
            exec_command: None,
            onetime: false,
            verbose: false,
            tls_ca_path: None,
        }
    }
}

impl Config {
    /// Validate the configuration before the controller starts.
    ///
    /// Checks that at least one domain was requested, that an endpoint is
    /// set, and that the certificate directory, when it already exists, is
    /// a writable directory. The directory itself is created later by the
    /// controller; creation failures surface there.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domains.is_empty() {
            return Err(ConfigError::NoDomains);
        }
        if self.endpoint_url.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }

        if self.certs_dir.exists() {
            let meta = fs::metadata(&self.certs_dir)?;
            if !meta.is_dir() {
                return Err(ConfigError::NotADirectory(self.certs_dir.clone()));
            }
            if meta.permissions().readonly() {
                return Err(ConfigError::DirectoryNotWritable(self.certs_dir.clone()));
            }
        }

        debug!(
            domains = self.domains.len(),
            certs_dir = ?self.certs_dir,
            "Configuration validated"
        );
        Ok(())
    }

    /// Path the certificate (or bundle, when returned) is written to
    pub fn certificate_file(&self) -> PathBuf {
        self.certs_dir.join(&self.cert_filename)
    }

    /// Path the private key is written to
    pub fn private_key_file(&self) -> PathBuf {
        self.certs_dir.join(&self.key_filename)
    }

    /// Path of the CA bundle handed to the reload hook
    pub fn ca_file(&self) -> PathBuf {
        self.certs_dir.join(&self.ca_filename)
    }
}

/// Expand `${VAR}`-style environment placeholders in the requested domains.
///
/// Allows domains such as `name.${KUBE_NAMESPACE}.svc.cluster.local` to be
/// resolved from the pod environment. An unset variable is an error rather
/// than an empty substitution, so a misconfigured pod fails at start-up
/// instead of requesting a certificate for a malformed name.
pub fn expand_domains(domains: &[String]) -> Result<Vec<String>, ConfigError> {
    domains
        .iter()
        .map(|domain| {
            shellexpand::env(domain)
                .map(|expanded| expanded.into_owned())
                .map_err(|e| ConfigError::Placeholder {
                    domain: domain.clone(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config(dir: &std::path::Path) -> Config {
        Config {
            domains: vec!["example.com".to_string()],
            certs_dir: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(valid_config(dir.path()).validate().is_ok());
    }

    #[test]
    fn test_validate_requires_domains() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            domains: Vec::new(),
            ..valid_config(dir.path())
        };
        assert!(matches!(config.validate(), Err(ConfigError::NoDomains)));
    }

    #[test]
    fn test_validate_requires_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            endpoint_url: String::new(),
            ..valid_config(dir.path())
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingEndpoint)));
    }

    #[test]
    fn test_validate_rejects_file_as_certs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();

        let config = Config {
            certs_dir: file,
            ..valid_config(dir.path())
        };
        assert!(matches!(config.validate(), Err(ConfigError::NotADirectory(_))));
    }

    #[test]
    fn test_validate_accepts_missing_certs_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            certs_dir: dir.path().join("to-be-created"),
            ..valid_config(dir.path())
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_paths() {
        let config = Config {
            certs_dir: PathBuf::from("/certs"),
            ..Default::default()
        };
        assert_eq!(config.certificate_file(), PathBuf::from("/certs/tls.pem"));
        assert_eq!(config.private_key_file(), PathBuf::from("/certs/tls-key.pem"));
        assert_eq!(config.ca_file(), PathBuf::from("/certs/tls-ca.pem"));
    }

    #[test]
    fn test_expand_domains_resolves_placeholders() {
        std::env::set_var("CERTPILOT_TEST_NS", "staging");
        let domains = vec!["svc.${CERTPILOT_TEST_NS}.cluster.local".to_string()];

        let expanded = expand_domains(&domains).unwrap();
        assert_eq!(expanded, vec!["svc.staging.cluster.local".to_string()]);
    }

    #[test]
    fn test_expand_domains_passes_plain_names_through() {
        let domains = vec!["example.com".to_string(), "www.example.com".to_string()];
        assert_eq!(expand_domains(&domains).unwrap(), domains);
    }

    #[test]
    fn test_expand_domains_rejects_unset_variable() {
        let domains = vec!["svc.${CERTPILOT_TEST_UNSET_VAR}.local".to_string()];
        assert!(matches!(
            expand_domains(&domains),
            Err(ConfigError::Placeholder { .. })
        ));
    }
}
