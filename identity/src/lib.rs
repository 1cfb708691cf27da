//! Decision logic on top of X.509 client certificates: decoding the certificate issued during
//! enrollment, checking it is time-valid (with clock skew tolerance) for the expected key, and
//! extracting the client identity its subject carries.

mod certificate;
mod client_id;
mod error;
mod identity;
mod validity;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub mod prelude {
    pub use super::certificate::Certificate;
    pub use super::client_id::{UidSelection, client_id_from_subject, extract_client_id};
    pub use super::error::{CertificateError, CertificateResult, DecodeError};
    pub use super::identity::Identity;
    pub use super::validity::{CLOCK_SKEW_TOLERANCE, is_valid_against, is_within_validity};
}

pub use prelude::*;
