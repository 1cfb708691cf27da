use std::fmt;

use sha2::{Digest as _, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{CryptoKeystoreError, CryptoKeystoreResult, cipher::CipherAlgorithm};

/// Key length of the legacy derivation, whatever the password length
pub const LEGACY_KEY_LEN: usize = 16;

/// Mask the legacy derivation folds the password into.
///
/// This value ships inside every build, so it is not a secret: a key derived with it is only as
/// strong as the password itself and merely obfuscates what is stored. It must stay unchanged for
/// entries written by earlier versions to remain readable.
pub const LEGACY_KEY_MASK: [u8; LEGACY_KEY_LEN] = [
    0x3c, 0x9a, 0x51, 0xe7, 0x08, 0xb4, 0x6d, 0x22, 0xf1, 0x47, 0x9e, 0x0b, 0xc5, 0x73, 0x2a, 0xd8,
];

/// Symmetric key derived from a password. Never serialized, wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey(Vec<u8>);

impl CipherKey {
    /// Derives the key the given algorithm expects
    pub fn derive(password: &str, algorithm: CipherAlgorithm) -> Self {
        match algorithm {
            CipherAlgorithm::LegacyAes128Ecb => Self::legacy(password),
            CipherAlgorithm::Aes256Gcm => Self::sha256(password),
        }
    }

    /// Password UTF-8 bytes truncated, or right-padded with zeroes, to [LEGACY_KEY_LEN] bytes then
    /// XORed with [LEGACY_KEY_MASK].
    pub fn legacy(password: &str) -> Self {
        let mut key = vec![0u8; LEGACY_KEY_LEN];
        key.iter_mut()
            .zip(password.as_bytes())
            .for_each(|(slot, byte)| *slot = *byte);
        key.iter_mut()
            .zip(LEGACY_KEY_MASK)
            .for_each(|(slot, mask)| *slot ^= mask);
        Self(key)
    }

    /// SHA-256 of the password UTF-8 bytes
    pub fn sha256(password: &str) -> Self {
        Self(Sha256::digest(password.as_bytes()).to_vec())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CipherKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for CipherKey {
    type Error = CryptoKeystoreError;

    /// Raw key material, only 16 and 32 bytes keys are usable. A rejected key is reported against
    /// the closest usable size.
    fn try_from(buf: &[u8]) -> CryptoKeystoreResult<Self> {
        let usable = [
            CipherAlgorithm::LegacyAes128Ecb.key_len(),
            CipherAlgorithm::Aes256Gcm.key_len(),
        ];
        let actual = buf.len();
        if usable.contains(&actual) {
            return Ok(Self(buf.to_vec()));
        }
        let expected = if actual > usable[0] { usable[1] } else { usable[0] };
        Err(CryptoKeystoreError::InvalidKeySize { expected, actual })
    }
}

impl fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str("CipherKey(hash=")?;
        for x in Sha256::digest(self).as_slice().iter().take(10) {
            fmt::LowerHex::fmt(x, f)?
        }
        f.write_str("...)")
    }
}
