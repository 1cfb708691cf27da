use cert_authz_identity::CertificateError;

use crate::transport::TransportError;

/// A module-specific [Result][core::result::Result] type with a default error variant.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors produced while deciding on, obtaining or caching an authorization credential
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller input is unusable
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The server issued certificate could not be decoded
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    /// Response metadata could not be read
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The enrollment exchange failed
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The enrollment succeeded but its outcome cannot be trusted
    #[error("The issued credential failed validation: {0}")]
    ValidationFailure(&'static str),
    /// Another enrollment exchange is already in flight for this manager
    #[error("An authorization exchange is already in progress")]
    Busy,
    /// The exchange was aborted, or its result discarded by a concurrent clear
    #[error("The authorization exchange was cancelled")]
    Cancelled,
    /// A persisted credential operation failed
    #[error(transparent)]
    Keystore(#[from] KeystoreError),
}

/// A credential cache operation failed
#[derive(Debug, thiserror::Error)]
#[error("{context}")]
pub struct KeystoreError {
    /// What was happening in the caller
    pub context: &'static str,
    /// What happened with the keystore
    #[source]
    pub source: cert_authz_keystore::CryptoKeystoreError,
}

impl KeystoreError {
    pub(crate) fn wrap(context: &'static str) -> impl FnOnce(cert_authz_keystore::CryptoKeystoreError) -> Self {
        move |source| Self { source, context }
    }
}

/// Produce the error message from the innermost wrapped error.
///
/// Contextual wrappers are helpful at locating a failure but hide the root cause in a default
/// `.to_string()` call.
pub trait InnermostErrorMessage {
    /// Produce the error message from the innermost wrapped error.
    fn innermost_error_message(&self) -> String;
}

impl<E: std::error::Error> InnermostErrorMessage for E {
    fn innermost_error_message(&self) -> String {
        let mut err: &dyn std::error::Error = self;
        while let Some(source) = err.source() {
            err = source;
        }
        err.to_string()
    }
}
