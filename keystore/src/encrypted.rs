use std::sync::Arc;

use zeroize::Zeroizing;

use crate::{CryptoKeystoreResult, cipher::CredentialCipher, store::CredentialStore};

/// A [CredentialStore] whose entries are JSON documents encrypted with a [CredentialCipher]
///
/// Persisted entry layout: `base64(cipher(UTF-8 JSON))`.
#[derive(Clone)]
pub struct EncryptedStore {
    store: Arc<dyn CredentialStore>,
    cipher: CredentialCipher,
}

impl std::fmt::Debug for EncryptedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedStore")
            .field("store", &self.store)
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

impl EncryptedStore {
    pub fn new(store: Arc<dyn CredentialStore>, cipher: CredentialCipher) -> Self {
        Self { store, cipher }
    }

    pub fn cipher(&self) -> &CredentialCipher {
        &self.cipher
    }

    /// Underlying (ciphertext) storage
    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub async fn save_json<T: serde::Serialize + ?Sized>(&self, key: &str, value: &T) -> CryptoKeystoreResult<()> {
        let json = Zeroizing::new(serde_json::to_vec(value)?);
        let blob = self.cipher.encrypt_to_base64(&json)?;
        self.store.save(key, &blob).await
    }

    /// Returns `None` when nothing is saved under `key`, an error when the entry cannot be
    /// decrypted or deserialized
    pub async fn load_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> CryptoKeystoreResult<Option<T>> {
        let Some(blob) = self.store.load(key).await? else {
            return Ok(None);
        };
        let json = Zeroizing::new(self.cipher.decrypt_from_base64(&blob)?);
        Ok(Some(serde_json::from_slice(&json)?))
    }

    pub async fn remove(&self, key: &str) -> CryptoKeystoreResult<()> {
        self.store.remove(key).await
    }

    /// Re-encrypts the entry under `key`, written with `previous`, with this store's cipher.
    ///
    /// This is the migration path off [crate::CipherConfig::legacy]. Returns whether the entry was
    /// rewritten: a missing entry, or one this store's cipher already decrypts, is left untouched.
    pub async fn rekey(&self, key: &str, previous: &CredentialCipher) -> CryptoKeystoreResult<bool> {
        let Some(blob) = self.store.load(key).await? else {
            return Ok(false);
        };
        if self.cipher.decrypt_from_base64(&blob).is_ok() {
            return Ok(false);
        }

        let plaintext = Zeroizing::new(previous.decrypt_from_base64(&blob)?);
        let blob = self.cipher.encrypt_to_base64(&plaintext)?;
        self.store.save(key, &blob).await?;

        log::info!(
            key = key,
            from = previous.config().algorithm.as_str(),
            to = self.cipher.config().algorithm.as_str();
            "Rekeyed persisted entry"
        );
        Ok(true)
    }
}
