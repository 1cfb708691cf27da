//! Password-keyed cipher protecting cached credentials, and the encrypted store persisting them.

mod cipher;
mod encrypted;
mod error;
mod key;
mod legacy;
mod store;

#[cfg(not(target_family = "wasm"))]
pub use self::store::FileStore;
pub use self::{
    cipher::{AES_GCM_256_NONCE_SIZE, CipherAlgorithm, CipherConfig, CredentialCipher},
    encrypted::EncryptedStore,
    error::{CryptoKeystoreError, CryptoKeystoreResult},
    key::{CipherKey, LEGACY_KEY_LEN, LEGACY_KEY_MASK},
    store::{CredentialStore, MemoryStore},
};
