//! Certificate-based authorization for a backend client.
//!
//! An [AuthorizationManager] watches responses for authorization challenges through a
//! [ChallengeDetector], obtains a credential through an enrollment exchange whose issued
//! certificate is validated against the enrolled key, and caches the resulting header value,
//! optionally persisted encrypted through an [EncryptedStore][cert_authz_keystore::EncryptedStore].

mod challenge;
mod config;
mod credential;
mod error;
mod manager;
mod obfuscate;
mod transport;

pub mod prelude {
    pub use super::challenge::{
        ChallengeDetector, Headers, NoChallenge, ResponseMetadata, StatusChallengeDetector, UNAUTHORIZED,
        WWW_AUTHENTICATE,
    };
    pub use super::config::{AuthorizationConfig, DEFAULT_STORAGE_KEY};
    pub use super::credential::Credential;
    pub use super::error::{Error, InnermostErrorMessage, KeystoreError, Result};
    pub use super::manager::{AuthorizationManager, AuthorizationState};
    pub use super::transport::{
        DEFAULT_ENROLLMENT_EXPIRY, EnrollmentParams, EnrollmentRequest, EnrollmentResponse, EnrollmentTransport,
        TransportError,
    };
    pub use cert_authz_identity::{Certificate, Identity, UidSelection};
    pub use cert_authz_keystore::{CipherAlgorithm, CipherConfig, CredentialCipher, CredentialStore, EncryptedStore, MemoryStore};
}

pub use prelude::*;
