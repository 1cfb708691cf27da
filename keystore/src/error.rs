/// Error type to represent various errors that can happen in the credential keystore
#[derive(Debug, thiserror::Error)]
pub enum CryptoKeystoreError {
    #[error("aead::Error")]
    AesGcmError,
    #[error("Ciphertext of {0} bytes is not a whole number of cipher blocks")]
    InvalidCiphertextLength(usize),
    #[error("Ciphertext padding is invalid")]
    InvalidPadding,
    #[error("Invalid key size, expected {expected}, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },
    #[error("Decrypted payload is not valid utf-8")]
    PlaintextNotUtf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Base64Error(#[from] base64::DecodeError),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Incorrect API usage: {0}")]
    IncorrectApiUsage(&'static str),
}

pub type CryptoKeystoreResult<T> = Result<T, CryptoKeystoreError>;
