//! Certificate persistence.
//!
//! Validates the signing response and writes the certificate material to
//! disk: the full bundle when the endpoint returned one, the bare leaf
//! otherwise. The target file is created or truncated with owner-only
//! permissions; the private key is written separately, once, by the
//! request builder.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, info};

use certpilot_config::Config;

use crate::client::SigningResponse;
use crate::error::Error;

/// Writes certificate material into the configured output directory.
#[derive(Debug)]
pub struct CertificateStore {
    certs_dir: PathBuf,
    certificate_file: PathBuf,
}

impl CertificateStore {
    pub fn new(config: &Config) -> Self {
        Self {
            certs_dir: config.certs_dir.clone(),
            certificate_file: config.certificate_file(),
        }
    }

    /// Ensure the certificate directory exists, group-accessible only.
    pub fn ensure_dir(&self) -> Result<(), Error> {
        fs::create_dir_all(&self.certs_dir)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.certs_dir, fs::Permissions::from_mode(0o770))?;
        }
        debug!(path = %self.certs_dir.display(), "Certificate directory ready");
        Ok(())
    }

    /// Validate a signing response and persist the certificate material.
    ///
    /// Rejects unsuccessful responses, surfacing the first reported error
    /// message, and responses claiming success without a certificate.
    /// Nothing is written unless the response passes both checks.
    pub fn handle_response(&self, response: &SigningResponse) -> Result<(), Error> {
        if !response.success {
            let message = response
                .errors
                .first()
                .map(|e| e.message.clone())
                .unwrap_or_else(|| "no error detail reported".to_string());
            return Err(Error::Signing(message));
        }

        if response.result.certificate.is_empty() {
            return Err(Error::EmptyCertificate);
        }

        let content = if response.result.bundle.bundle.is_empty() {
            &response.result.certificate
        } else {
            &response.result.bundle.bundle
        };

        info!(path = %self.certificate_file.display(), "Writing the certificate to disk");
        self.write_certificate(content)
    }

    /// Create-or-truncate the certificate file with mode 0600. The handle
    /// is scoped to this function and closes on every exit path.
    fn write_certificate(&self, content: &str) -> Result<(), Error> {
        let mut options = OpenOptions::new();
        options.create(true).truncate(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.certificate_file)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{CertificateBundle, ResponseError, SigningResult};

    fn store(dir: &std::path::Path) -> CertificateStore {
        let config = Config {
            domains: vec!["example.com".to_string()],
            certs_dir: dir.to_path_buf(),
            ..Default::default()
        };
        CertificateStore::new(&config)
    }

    fn success_response(certificate: &str, bundle: &str) -> SigningResponse {
        SigningResponse {
            success: true,
            result: SigningResult {
                certificate: certificate.to_string(),
                bundle: CertificateBundle {
                    bundle: bundle.to_string(),
                },
            },
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_ensure_dir_creates_with_group_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("certs");
        let config = Config {
            certs_dir: nested.clone(),
            ..Default::default()
        };

        CertificateStore::new(&config).ensure_dir().unwrap();
        assert!(nested.is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&nested).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o770);
        }
    }

    #[test]
    fn test_failure_response_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let response = SigningResponse {
            success: false,
            errors: vec![
                ResponseError {
                    code: 100,
                    message: "first failure".to_string(),
                },
                ResponseError {
                    code: 200,
                    message: "second failure".to_string(),
                },
            ],
            ..Default::default()
        };

        let err = store.handle_response(&response).unwrap_err();
        assert!(err.to_string().contains("first failure"));
        assert!(!store.certificate_file.exists());
    }

    #[test]
    fn test_failure_without_detail_still_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let err = store.handle_response(&SigningResponse::default()).unwrap_err();
        assert!(matches!(err, Error::Signing(_)));
        assert!(!store.certificate_file.exists());
    }

    #[test]
    fn test_success_without_certificate_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let err = store.handle_response(&success_response("", "")).unwrap_err();
        assert!(matches!(err, Error::EmptyCertificate));
        assert!(!store.certificate_file.exists());
    }

    #[test]
    fn test_bundle_preferred_over_leaf() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .handle_response(&success_response("LEAF", "LEAF+CHAIN"))
            .unwrap();
        let written = fs::read_to_string(&store.certificate_file).unwrap();
        assert_eq!(written, "LEAF+CHAIN");
    }

    #[test]
    fn test_leaf_written_when_no_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.handle_response(&success_response("LEAF", "")).unwrap();
        let written = fs::read_to_string(&store.certificate_file).unwrap();
        assert_eq!(written, "LEAF");
    }

    #[cfg(unix)]
    #[test]
    fn test_certificate_file_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store.handle_response(&success_response("LEAF", "")).unwrap();
        let mode = fs::metadata(&store.certificate_file)
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_rotation_truncates_previous_certificate() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .handle_response(&success_response("A LONG FIRST CERTIFICATE", ""))
            .unwrap();
        store.handle_response(&success_response("SHORT", "")).unwrap();

        let written = fs::read_to_string(&store.certificate_file).unwrap();
        assert_eq!(written, "SHORT");
    }
}
