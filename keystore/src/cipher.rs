use aes_gcm::{Aes256Gcm, KeyInit as _, aead::Aead as _};
use base64::Engine as _;

use crate::{CryptoKeystoreError, CryptoKeystoreResult, key::CipherKey, legacy};

/// Size of the random nonce prefixing every AES-256-GCM payload
pub const AES_GCM_256_NONCE_SIZE: usize = 12;

/// Algorithms a [CredentialCipher] can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherAlgorithm {
    /// AES-128 in ECB mode with PKCS#7 padding, keyed by [CipherKey::legacy].
    ///
    /// Neither authenticated nor semantically secure: only use it to read entries written in the
    /// legacy format.
    LegacyAes128Ecb,
    /// AES-256-GCM with a random nonce per payload, keyed by [CipherKey::sha256]
    #[default]
    Aes256Gcm,
}

impl CipherAlgorithm {
    /// Key length this algorithm requires, in bytes
    pub const fn key_len(self) -> usize {
        match self {
            Self::LegacyAes128Ecb => crate::key::LEGACY_KEY_LEN,
            Self::Aes256Gcm => 32,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LegacyAes128Ecb => "aes128-ecb",
            Self::Aes256Gcm => "aes256-gcm",
        }
    }
}

/// Algorithm selection for a [CredentialCipher]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct CipherConfig {
    pub algorithm: CipherAlgorithm,
}

impl CipherConfig {
    /// The format entries were stored in before authenticated encryption was introduced
    pub const fn legacy() -> Self {
        Self {
            algorithm: CipherAlgorithm::LegacyAes128Ecb,
        }
    }
}

impl From<CipherAlgorithm> for CipherConfig {
    fn from(algorithm: CipherAlgorithm) -> Self {
        Self { algorithm }
    }
}

#[derive(Clone)]
enum Engine {
    Legacy(aes::Aes128),
    Gcm(Box<Aes256Gcm>),
}

/// Password based symmetric cipher protecting cached credentials at rest
///
/// Text operations produce and consume a standard base64 envelope, so the output can be written to
/// a text-only storage.
#[derive(Clone)]
pub struct CredentialCipher {
    engine: Engine,
    config: CipherConfig,
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher")
            .field("config", &self.config)
            .field("engine", &"[REDACTED]")
            .finish()
    }
}

impl CredentialCipher {
    /// Derives the key from `password` as the configured algorithm expects
    pub fn new(password: &str, config: CipherConfig) -> Self {
        let key = CipherKey::derive(password, config.algorithm);
        let engine = match config.algorithm {
            CipherAlgorithm::LegacyAes128Ecb => {
                Engine::Legacy(aes::Aes128::new(aes::cipher::generic_array::GenericArray::from_slice(
                    key.as_ref(),
                )))
            }
            CipherAlgorithm::Aes256Gcm => Engine::Gcm(Box::new(Aes256Gcm::new(
                aes_gcm::Key::<Aes256Gcm>::from_slice(key.as_ref()),
            ))),
        };
        Self { engine, config }
    }

    /// Uses raw key material instead of a password
    pub fn with_key(key: &CipherKey, config: CipherConfig) -> CryptoKeystoreResult<Self> {
        let expected = config.algorithm.key_len();
        let invalid_size = || CryptoKeystoreError::InvalidKeySize {
            expected,
            actual: key.len(),
        };
        if key.len() != expected {
            return Err(invalid_size());
        }
        let engine = match config.algorithm {
            CipherAlgorithm::LegacyAes128Ecb => {
                Engine::Legacy(aes::Aes128::new_from_slice(key.as_ref()).map_err(|_| invalid_size())?)
            }
            CipherAlgorithm::Aes256Gcm => {
                Engine::Gcm(Box::new(Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| invalid_size())?))
            }
        };
        Ok(Self { engine, config })
    }

    pub fn config(&self) -> CipherConfig {
        self.config
    }

    /// Encrypts raw bytes
    ///
    /// Internal layout for [CipherAlgorithm::Aes256Gcm]: `[12 bytes of nonce..., ...encrypted data]`
    pub fn seal(&self, plaintext: &[u8]) -> CryptoKeystoreResult<Vec<u8>> {
        match &self.engine {
            Engine::Legacy(cipher) => Ok(legacy::encrypt(cipher, plaintext)),
            Engine::Gcm(cipher) => {
                let nonce_bytes: [u8; AES_GCM_256_NONCE_SIZE] = rand::random();
                let nonce = aes_gcm::Nonce::from_slice(&nonce_bytes);
                let mut encrypted = cipher
                    .encrypt(nonce, plaintext)
                    .map_err(|_| CryptoKeystoreError::AesGcmError)?;
                let mut message = Vec::with_capacity(nonce.len() + encrypted.len());
                message.extend_from_slice(nonce);
                message.append(&mut encrypted);
                Ok(message)
            }
        }
    }

    /// Decrypts what [Self::seal] produced
    pub fn open(&self, ciphertext: &[u8]) -> CryptoKeystoreResult<Vec<u8>> {
        match &self.engine {
            Engine::Legacy(cipher) => legacy::decrypt(cipher, ciphertext),
            Engine::Gcm(cipher) => {
                if ciphertext.len() < AES_GCM_256_NONCE_SIZE {
                    return Err(CryptoKeystoreError::AesGcmError);
                }
                let (nonce, msg) = ciphertext.split_at(AES_GCM_256_NONCE_SIZE);
                cipher
                    .decrypt(aes_gcm::Nonce::from_slice(nonce), msg)
                    .map_err(|_| CryptoKeystoreError::AesGcmError)
            }
        }
    }

    /// [Self::seal] wrapped in standard base64
    pub fn encrypt_to_base64(&self, plaintext: &[u8]) -> CryptoKeystoreResult<String> {
        Ok(base64::prelude::BASE64_STANDARD.encode(self.seal(plaintext)?))
    }

    /// Inverse of [Self::encrypt_to_base64]
    pub fn decrypt_from_base64(&self, envelope: &str) -> CryptoKeystoreResult<Vec<u8>> {
        let ciphertext = base64::prelude::BASE64_STANDARD.decode(envelope.trim())?;
        self.open(&ciphertext)
    }

    /// Encrypts UTF-8 text into a base64 envelope
    pub fn encrypt(&self, plaintext: &str) -> CryptoKeystoreResult<String> {
        self.encrypt_to_base64(plaintext.as_bytes())
    }

    /// Decrypts a base64 envelope back into UTF-8 text.
    ///
    /// An empty plaintext comes back as `Ok("")`: any failure is an `Err`.
    pub fn decrypt(&self, envelope: &str) -> CryptoKeystoreResult<String> {
        Ok(String::from_utf8(self.decrypt_from_base64(envelope)?)?)
    }
}
