//! Private key management and certificate signing request construction.
//!
//! The key pair and the encoded CSR are built exactly once per process,
//! before the rotation loop starts. A private key already present on disk
//! is reused so restarts keep serving the same key; only the signature is
//! re-requested on each rotation.

use std::fs;
use std::path::Path;

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use rsa::pkcs8::EncodePrivateKey;
use rsa::RsaPrivateKey;
use tracing::{debug, info};

use certpilot_config::Config;

use crate::error::Error;

/// A certificate signing request bound to the process key pair.
///
/// The encoded request body is stable for the process lifetime.
pub struct CertificateRequest {
    key_pem: String,
    csr_pem: String,
}

impl CertificateRequest {
    /// Build the signing request, reusing the on-disk private key when one
    /// exists and generating a fresh one otherwise.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to the process: there is no fallback
    /// request shape.
    pub fn load_or_generate(config: &Config) -> Result<Self, Error> {
        let key_path = config.private_key_file();

        let key_pem = if key_path.exists() {
            info!(path = %key_path.display(), "Reusing existing private key");
            fs::read_to_string(&key_path)?
        } else {
            info!(
                bits = config.key_size,
                path = %key_path.display(),
                "Generating private key"
            );
            let key_pem = generate_rsa_key_pem(config.key_size)?;
            write_private_key(&key_path, &key_pem)?;
            key_pem
        };

        let key_pair = KeyPair::from_pem(&key_pem)?;
        let csr_pem = encode_csr(config, &key_pair)?;

        debug!(
            domains = %config.domains.join(","),
            "Encoded certificate signing request"
        );

        Ok(Self { key_pem, csr_pem })
    }

    /// PEM-encoded private key
    pub fn key_pem(&self) -> &str {
        &self.key_pem
    }

    /// PEM-encoded signing request body
    pub fn csr_pem(&self) -> &str {
        &self.csr_pem
    }

    /// Consume the request, yielding the encoded CSR for the wire payload
    pub fn into_csr_pem(self) -> String {
        self.csr_pem
    }
}

/// Generate an RSA key of the configured size, PKCS#8 PEM encoded.
fn generate_rsa_key_pem(bits: usize) -> Result<String, Error> {
    let mut rng = rand::thread_rng();
    let key = RsaPrivateKey::new(&mut rng, bits).map_err(|e| Error::Key(e.to_string()))?;
    let der = key.to_pkcs8_der().map_err(|e| Error::Key(e.to_string()))?;
    let block = pem::Pem::new("PRIVATE KEY", der.as_bytes().to_vec());
    Ok(pem::encode(&block))
}

/// Persist the private key with owner-only permissions.
fn write_private_key(path: &Path, key_pem: &str) -> Result<(), Error> {
    fs::write(path, key_pem)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

/// Build and PEM-encode the CSR: the first domain is the common name, the
/// full domain list the subject alternative names.
fn encode_csr(config: &Config, key_pair: &KeyPair) -> Result<String, Error> {
    let mut params = CertificateParams::new(config.domains.clone())?;

    let mut dn = DistinguishedName::new();
    if let Some(common_name) = config.domains.first() {
        dn.push(DnType::CommonName, common_name.as_str());
    }
    dn.push(DnType::OrganizationName, config.organization.as_str());
    dn.push(DnType::CountryName, config.country.as_str());
    dn.push(DnType::LocalityName, config.locality.as_str());
    dn.push(DnType::StateOrProvinceName, config.province.as_str());
    params.distinguished_name = dn;

    let csr = params.serialize_request(key_pair)?;
    Ok(csr.pem()?)
}
