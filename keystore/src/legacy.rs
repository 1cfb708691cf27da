//! AES-128 in ECB mode with PKCS#7 padding
//!
//! Only kept so that entries written by earlier versions stay readable: every block is encrypted
//! independently, so equal plaintext blocks produce equal ciphertext blocks and nothing is
//! authenticated. New entries should use [crate::CipherAlgorithm::Aes256Gcm].

use aes::{
    Aes128,
    cipher::{BlockDecrypt as _, BlockEncrypt as _, generic_array::GenericArray},
};

use crate::{CryptoKeystoreError, CryptoKeystoreResult};

pub(crate) const BLOCK_SIZE: usize = 16;

pub(crate) fn encrypt(cipher: &Aes128, plaintext: &[u8]) -> Vec<u8> {
    // a full padding block is appended when the plaintext is block aligned, including when empty
    let pad = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
    let mut buf = Vec::with_capacity(plaintext.len() + pad);
    buf.extend_from_slice(plaintext);
    buf.resize(plaintext.len() + pad, pad as u8);

    buf.chunks_exact_mut(BLOCK_SIZE)
        .for_each(|block| cipher.encrypt_block(GenericArray::from_mut_slice(block)));
    buf
}

pub(crate) fn decrypt(cipher: &Aes128, ciphertext: &[u8]) -> CryptoKeystoreResult<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CryptoKeystoreError::InvalidCiphertextLength(ciphertext.len()));
    }

    let mut buf = ciphertext.to_vec();
    buf.chunks_exact_mut(BLOCK_SIZE)
        .for_each(|block| cipher.decrypt_block(GenericArray::from_mut_slice(block)));

    let pad = buf.last().copied().map(usize::from).unwrap_or_default();
    if pad == 0 || pad > BLOCK_SIZE || !buf[buf.len() - pad..].iter().all(|b| usize::from(*b) == pad) {
        return Err(CryptoKeystoreError::InvalidPadding);
    }
    buf.truncate(buf.len() - pad);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use aes::cipher::KeyInit as _;
    use rstest::rstest;

    use super::*;

    fn cipher() -> Aes128 {
        Aes128::new_from_slice(&hex::decode("000102030405060708090a0b0c0d0e0f").unwrap()).unwrap()
    }

    #[test]
    fn first_block_should_match_known_answer() {
        let plaintext = hex::decode("00112233445566778899aabbccddeeff").unwrap();
        let ciphertext = encrypt(&cipher(), &plaintext);
        assert_eq!(ciphertext.len(), 2 * BLOCK_SIZE);
        assert_eq!(hex::encode(&ciphertext[..BLOCK_SIZE]), "69c4e0d86a7b0430d8cdb78070b4c55a");
    }

    #[rstest]
    #[case(0, 16)]
    #[case(1, 16)]
    #[case(15, 16)]
    #[case(16, 32)]
    #[case(17, 32)]
    fn ciphertext_should_be_padded_to_the_next_block(#[case] len: usize, #[case] expected: usize) {
        let plaintext = vec![0x42; len];
        let ciphertext = encrypt(&cipher(), &plaintext);
        assert_eq!(ciphertext.len(), expected);
        assert_eq!(decrypt(&cipher(), &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn equal_blocks_should_encrypt_equally() {
        let ciphertext = encrypt(&cipher(), &[7; 2 * BLOCK_SIZE]);
        assert_eq!(ciphertext[..BLOCK_SIZE], ciphertext[BLOCK_SIZE..2 * BLOCK_SIZE]);
    }

    #[rstest]
    #[case(0)]
    #[case(15)]
    #[case(17)]
    fn partial_blocks_should_be_rejected(#[case] len: usize) {
        assert!(matches!(
            decrypt(&cipher(), &vec![0; len]),
            Err(CryptoKeystoreError::InvalidCiphertextLength(l)) if l == len
        ));
    }

    #[test]
    fn wrong_key_should_be_rejected_or_garbled() {
        let plaintext = b"a bearer token that spans multiple blocks";
        let ciphertext = encrypt(&cipher(), plaintext);
        let other = Aes128::new_from_slice(&[0xff; 16]).unwrap();
        // without authentication a wrong key only fails when the padding happens to be invalid
        match decrypt(&other, &ciphertext) {
            Err(CryptoKeystoreError::InvalidPadding) => {}
            Ok(garbled) => assert_ne!(garbled, plaintext),
            Err(e) => panic!("unexpected error {e}"),
        }
    }
}
