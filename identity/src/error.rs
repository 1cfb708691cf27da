/// Wrapper over a [Result] with a [CertificateError] error
pub type CertificateResult<T> = Result<T, CertificateError>;

/// All errors which decoding or inspecting a certificate might raise
#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    /// Caller supplied an absent or empty value
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The encoded certificate could not be turned into a certificate structure
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// The encoded text or bytes are not a parseable certificate
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Text is not valid base64
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    /// Text looked like PEM but could not be parsed
    #[error(transparent)]
    Pem(#[from] pem::PemError),
    /// PEM block holds something else than a certificate
    #[error("Expected a CERTIFICATE PEM block, found '{0}'")]
    UnexpectedPemTag(String),
    /// Bytes are not a DER encoded X.509 certificate
    #[error(transparent)]
    Der(#[from] x509_cert::der::Error),
}

impl From<base64::DecodeError> for CertificateError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Decode(e.into())
    }
}

impl From<pem::PemError> for CertificateError {
    fn from(e: pem::PemError) -> Self {
        Self::Decode(e.into())
    }
}

impl From<x509_cert::der::Error> for CertificateError {
    fn from(e: x509_cert::der::Error) -> Self {
        Self::Decode(e.into())
    }
}
