use std::collections::HashMap;

use async_lock::RwLock;

use crate::CryptoKeystoreResult;

/// Text-only storage backing the encrypted credential cache
///
/// Values are opaque blobs: callers encrypt before saving.
#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
pub trait CredentialStore: std::fmt::Debug + Send + Sync {
    /// Returns the blob saved under `key`, if any
    async fn load(&self, key: &str) -> CryptoKeystoreResult<Option<String>>;
    /// Saves `blob` under `key`, replacing any previous value
    async fn save(&self, key: &str, blob: &str) -> CryptoKeystoreResult<()>;
    /// Removes the blob saved under `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> CryptoKeystoreResult<()>;
}

/// Volatile store, lost when dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg_attr(target_family = "wasm", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait::async_trait)]
impl CredentialStore for MemoryStore {
    async fn load(&self, key: &str) -> CryptoKeystoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn save(&self, key: &str, blob: &str) -> CryptoKeystoreResult<()> {
        self.entries.write().await.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> CryptoKeystoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(not(target_family = "wasm"))]
pub use file::FileStore;

#[cfg(not(target_family = "wasm"))]
mod file {
    use std::path::{Path, PathBuf};

    use super::CredentialStore;
    use crate::{CryptoKeystoreError, CryptoKeystoreResult};

    const ENTRY_EXTENSION: &str = "entry";

    /// One file per key under a directory
    ///
    /// File names are the hex encoding of the key, so any key is usable. Writes go to a temporary
    /// file first and are renamed into place, so a crash never leaves a truncated entry behind.
    #[derive(Debug, Clone)]
    pub struct FileStore {
        root: PathBuf,
    }

    impl FileStore {
        /// Opens a store rooted at `root`, creating the directory if needed
        pub async fn open(root: impl AsRef<Path>) -> CryptoKeystoreResult<Self> {
            let root = root.as_ref().to_path_buf();
            async_fs::create_dir_all(&root).await?;
            Ok(Self { root })
        }

        pub fn root(&self) -> &Path {
            &self.root
        }

        fn entry_path(&self, key: &str) -> CryptoKeystoreResult<PathBuf> {
            if key.is_empty() {
                return Err(CryptoKeystoreError::IncorrectApiUsage("Storage keys cannot be empty"));
            }
            Ok(self.root.join(format!("{}.{ENTRY_EXTENSION}", hex::encode(key))))
        }
    }

    #[async_trait::async_trait]
    impl CredentialStore for FileStore {
        async fn load(&self, key: &str) -> CryptoKeystoreResult<Option<String>> {
            match async_fs::read_to_string(self.entry_path(key)?).await {
                Ok(blob) => Ok(Some(blob)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        async fn save(&self, key: &str, blob: &str) -> CryptoKeystoreResult<()> {
            let path = self.entry_path(key)?;
            // concurrent saves of one key each write their own file, the last rename wins
            let tmp = path.with_extension(format!("{:016x}.tmp", rand::random::<u64>()));
            async_fs::write(&tmp, blob).await?;
            async_fs::rename(&tmp, &path).await?;
            Ok(())
        }

        async fn remove(&self, key: &str) -> CryptoKeystoreResult<()> {
            match async_fs::remove_file(self.entry_path(key)?).await {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            }
        }
    }
}
