//! The enrollment exchange through which the backend issues a client certificate and token

use core::time::Duration;

use base64::Engine as _;
use cert_authz_identity::Identity;
use typed_builder::TypedBuilder;
use zeroize::Zeroize as _;

use crate::{Error, Result};

/// Lifetime requested for the issued certificate when none is given
pub const DEFAULT_ENROLLMENT_EXPIRY: Duration = Duration::from_secs(90 * 24 * 3600);

/// Failure of the enrollment exchange itself
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The backend answered with an unexpected status
    #[error("Enrollment endpoint answered with status {status}")]
    Status { status: u16 },
    /// The transport gave up on the exchange
    #[error("The enrollment exchange was cancelled by the transport")]
    Cancelled,
    /// The backend answer is not what was expected
    #[error("Malformed enrollment response: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Parameters of an enrollment, as recognized by the backend exchange
#[derive(Debug, Clone, TypedBuilder)]
pub struct EnrollmentParams {
    /// Raw public key the issued certificate must certify
    #[builder(setter(into))]
    pub public_key: Vec<u8>,
    /// Client id the issued certificate is expected to carry
    #[builder(default, setter(strip_option(fallback = client_id_opt), into))]
    pub client_id: Option<String>,
    /// Name as displayed in the application
    #[builder(default, setter(into))]
    pub display_name: String,
    #[builder(default, setter(strip_option(fallback = team_opt), into))]
    pub team: Option<String>,
    /// DER encoded certificate signing request, when the backend expects one
    #[builder(default, setter(strip_option(fallback = csr_opt), into))]
    pub csr: Option<Vec<u8>>,
    /// Requested certificate lifetime
    #[builder(default = DEFAULT_ENROLLMENT_EXPIRY)]
    pub expiry: Duration,
}

impl EnrollmentParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.public_key.is_empty() {
            return Err(Error::InvalidArgument("public key cannot be empty"));
        }
        if self.client_id.as_ref().is_some_and(|id| id.trim().is_empty()) {
            return Err(Error::InvalidArgument("expected client id cannot be empty"));
        }
        if self.csr.as_ref().is_some_and(Vec::is_empty) {
            return Err(Error::InvalidArgument("csr cannot be empty"));
        }
        if self.expiry.is_zero() {
            return Err(Error::InvalidArgument("expiry cannot be zero"));
        }
        Ok(())
    }
}

/// Body of the enrollment call
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    /// Freshness token handed out by the backend
    pub nonce: String,
    /// Base64url (unpadded) public key
    pub public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Base64url (unpadded) DER CSR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csr: Option<String>,
    /// Requested certificate lifetime in seconds
    pub expiry: u64,
}

impl EnrollmentRequest {
    pub fn new(nonce: impl Into<String>, params: &EnrollmentParams) -> Self {
        let b64 = |bytes: &[u8]| base64::prelude::BASE64_URL_SAFE_NO_PAD.encode(bytes);
        Self {
            nonce: nonce.into(),
            public_key: b64(&params.public_key),
            client_id: params.client_id.clone(),
            display_name: params.display_name.clone(),
            team: params.team.clone(),
            csr: params.csr.as_deref().map(b64),
            expiry: params.expiry.as_secs(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Answer of the enrollment call
#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentResponse {
    /// Issued certificate, base64 DER or PEM
    pub certificate: String,
    /// Token to present in the authorization header
    pub access_token: String,
    /// Identity as the backend knows it
    #[serde(default)]
    pub identity: Option<Identity>,
}

impl EnrollmentResponse {
    pub fn from_json(json: &[u8]) -> Result<Self, TransportError> {
        Ok(serde_json::from_slice(json)?)
    }
}

impl std::fmt::Debug for EnrollmentResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentResponse")
            .field("certificate", &self.certificate)
            .field("access_token", &"[REDACTED]")
            .field("identity", &self.identity)
            .finish()
    }
}

impl Drop for EnrollmentResponse {
    fn drop(&mut self) {
        self.access_token.zeroize();
    }
}

/// Network side of the enrollment, provided by the embedding application
#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
pub trait EnrollmentTransport: std::fmt::Debug + Send + Sync {
    /// Fetches a fresh nonce to bind the enrollment to
    async fn fetch_nonce(&self) -> Result<String, TransportError>;
    /// Performs the enrollment
    async fn enroll(&self, request: &EnrollmentRequest) -> Result<EnrollmentResponse, TransportError>;
}
