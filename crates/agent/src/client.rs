//! CFSSL signing endpoint client.
//!
//! Performs the HTTP exchange with the CA: a single JSON POST to the
//! anonymous `sign` path, or to `authsign` with a token-wrapped envelope
//! when a bearer token is configured. Transport failures and undecodable
//! bodies are hard failures of the attempt; retry is the rotation loop's
//! responsibility, not this layer's.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use certpilot_config::Config;

use crate::error::Error;

/// Payload for the anonymous signing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SigningRequest {
    /// PEM-encoded certificate signing request
    pub certificate_request: String,
    /// Signing profile to apply
    pub profile: String,
    /// Request the full trust bundle rather than the leaf alone
    pub bundle: bool,
}

/// Token-wrapped payload for the authenticated signing endpoint.
#[derive(Debug, Serialize)]
struct AuthSigningRequest<'a> {
    token: &'a str,
    request: &'a SigningRequest,
}

/// Decoded signing response.
///
/// Absent fields decode to their empty values, mirroring the endpoint's
/// behavior of omitting `result` on failure and `errors` on success.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigningResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: SigningResult,
    #[serde(default)]
    pub errors: Vec<ResponseError>,
}

/// Certificate material carried by a successful response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SigningResult {
    /// PEM text of the leaf certificate
    #[serde(default)]
    pub certificate: String,
    /// Optional full trust chain
    #[serde(default)]
    pub bundle: CertificateBundle,
}

/// The leaf certificate concatenated with its intermediates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateBundle {
    #[serde(default)]
    pub bundle: String,
}

/// One error entry reported by the endpoint; the first is surfaced.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
}

/// The signing exchange, seam for the rotation loop.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Submit the encoded CSR for signing and decode the response.
    async fn sign(&self, request: &SigningRequest) -> Result<SigningResponse, Error>;
}

/// HTTP client for a CFSSL signing endpoint.
pub struct SigningClient {
    client: Client,
    endpoint_url: String,
    token: Option<String>,
}

impl SigningClient {
    /// Build the client, loading an additional trust root when configured.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        let mut builder = Client::builder();
        if let Some(ref path) = config.tls_ca_path {
            debug!(path = %path.display(), "Adding trust root for the signing endpoint");
            let pem = std::fs::read(path)?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint_url: config.endpoint_url.trim_end_matches('/').to_string(),
            token: config.endpoint_token.clone(),
        })
    }
}

#[async_trait]
impl Signer for SigningClient {
    async fn sign(&self, request: &SigningRequest) -> Result<SigningResponse, Error> {
        let response = match self.token {
            None => {
                let url = format!("{}/api/v1/cfssl/sign", self.endpoint_url);
                debug!(url = %url, "Submitting signing request");
                self.client.post(&url).json(request).send().await?
            }
            Some(ref token) => {
                let url = format!("{}/api/v1/cfssl/authsign", self.endpoint_url);
                debug!(url = %url, "Submitting authenticated signing request");
                let envelope = AuthSigningRequest { token, request };
                self.client.post(&url).json(&envelope).send().await?
            }
        };

        Ok(response.json::<SigningResponse>().await?)
    }
}
