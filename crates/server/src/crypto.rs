//! Authenticated encryption of session payloads.
//!
//! The key is derived once at startup with PBKDF2-HMAC-SHA256 and used for
//! AES-256-GCM. Tokens have the form `hex(nonce):hex(ciphertext || tag)`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

/// Salt used for key derivation; changing it invalidates every session.
pub const DEFAULT_SALT: &[u8] = b"fixed-salt-for-encryption";

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Errors from sealing or opening a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The token is not `hex:hex`, the nonce has the wrong length, or the
    /// plaintext is not UTF-8.
    #[error("malformed token: {0}")]
    Format(&'static str),

    /// GCM tag verification failed.
    #[error("token failed authentication")]
    Authenticity,

    /// The cipher refused to seal the plaintext.
    #[error("encryption failed")]
    Encrypt,
}

/// Derive a 256-bit key from `secret` and `salt`.
#[must_use]
pub fn derive_key(secret: &[u8], salt: &[u8]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(secret, salt, PBKDF2_ITERATIONS, &mut key);
    key
}

/// AES-256-GCM cipher for session tokens.
#[derive(Clone)]
pub struct SessionCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCipher").finish_non_exhaustive()
    }
}

impl SessionCipher {
    /// Derive the key from `secret` with [`DEFAULT_SALT`].
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self::from_key(derive_key(secret.expose_secret().as_bytes(), DEFAULT_SALT))
    }

    /// Build a cipher from an already-derived key.
    #[must_use]
    pub fn from_key(key: [u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        }
    }

    /// Seal `plaintext` under a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Encrypt` if the cipher rejects the input.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        Ok(format!("{}:{}", hex::encode(nonce), hex::encode(sealed)))
    }

    /// Open a token produced by [`SessionCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::Format` for structurally invalid tokens and
    /// `CryptoError::Authenticity` when the tag does not verify.
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let (nonce_hex, sealed_hex) = token
            .split_once(':')
            .ok_or(CryptoError::Format("missing separator"))?;

        let nonce = hex::decode(nonce_hex).map_err(|_| CryptoError::Format("nonce is not hex"))?;
        if nonce.len() != NONCE_LEN {
            return Err(CryptoError::Format("nonce must be 12 bytes"));
        }
        let sealed =
            hex::decode(sealed_hex).map_err(|_| CryptoError::Format("ciphertext is not hex"))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
            .map_err(|_| CryptoError::Authenticity)?;

        String::from_utf8(plaintext).map_err(|_| CryptoError::Format("plaintext is not UTF-8"))
    }
}
