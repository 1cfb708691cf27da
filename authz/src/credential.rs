use cert_authz_identity::Identity;
use zeroize::Zeroize as _;

use crate::obfuscate::Obfuscated;

/// The cached authorization: header value handed to the HTTP layer, and who it identifies
///
/// Either absent from the manager or fully populated.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub header_value: String,
    /// Unix timestamp (seconds)
    pub obtained_at: u64,
    pub identity: Identity,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("header_value", &Obfuscated::from(&self.header_value))
            .field("obtained_at", &self.obtained_at)
            .field("identity", &Obfuscated::from(&self.identity))
            .finish()
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.header_value.zeroize();
    }
}
