//! Symmetric encryption of blob bytes at rest (AES-256-CBC, PKCS#7 padding)
//!
//! The key is supplied once per session. The IV is fixed at all zeros; there
//! is no per-blob nonce management. Empty plaintext is never passed through
//! the cipher (`encrypt` yields `None`), while `decrypt` always runs the
//! cipher, so decrypting empty ciphertext fails.

use crate::error::CryptoError;
use aes::Aes256;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::fmt;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Key length in bytes
pub const KEY_LEN: usize = 32;

/// AES block length in bytes
pub const BLOCK_LEN: usize = 16;

const IV: [u8; BLOCK_LEN] = [0u8; BLOCK_LEN];

/// Session cipher holding the symmetric key
#[derive(Clone)]
pub struct Cipher {
    key: [u8; KEY_LEN],
}

impl Cipher {
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; KEY_LEN] = key
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength(key.len()))?;
        Ok(Self { key })
    }

    /// Encrypt `data`. Empty input is a no-op and yields `None`.
    pub fn encrypt(&self, data: &[u8]) -> Option<Vec<u8>> {
        if data.is_empty() {
            return None;
        }
        Some(Aes256CbcEnc::new(&self.key.into(), &IV.into()).encrypt_padded_vec_mut::<Pkcs7>(data))
    }

    /// Decrypt `data`. Applied unconditionally, including to empty input.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Aes256CbcDec::new(&self.key.into(), &IV.into())
            .decrypt_padded_vec_mut::<Pkcs7>(data)
            .map_err(|_| {
                CryptoError::Decrypt(format!(
                    "{} bytes of ciphertext do not unpad to a valid plaintext",
                    data.len()
                ))
            })
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher").finish_non_exhaustive()
    }
}

pub fn encrypt(key: &[u8], data: &[u8]) -> Result<Option<Vec<u8>>, CryptoError> {
    Ok(Cipher::new(key)?.encrypt(data))
}

pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    Cipher::new(key)?.decrypt(data)
}
