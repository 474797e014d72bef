//! Cryptographic primitives behind a single injected capability
//!
//! Everything the payload layer needs from the outside world (randomness,
//! key derivation and the AEAD cipher) goes through [`CryptoProvider`]. The
//! CLI builds one [`SystemCryptoProvider`] at startup and hands it down.
//!
//! The parameters here are a protocol shared with the in-browser
//! decryptor and must never change without a new payload format:
//! - PBKDF2-HMAC-SHA256, 2,000,000 iterations, 32-byte key
//! - AES-256-GCM with a 16-byte nonce and a 16-byte tag, no associated data

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use hmac::Hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, PagecryptError, Result};

/// Length of salt in bytes
pub const SALT_LEN: usize = 32;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 16;

/// Length of derived key in bytes
pub const KEY_LEN: usize = 32;

/// Length of the GCM authentication tag appended to every ciphertext
pub const TAG_LEN: usize = 16;

/// PBKDF2 iteration count. Not carried in the payload, so the decryptor
/// hardcodes the same value.
pub const PBKDF2_ITERATIONS: u32 = 2_000_000;

/// AES-256-GCM with the 16-byte nonce the browser decryptor expects.
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Source of randomness, key derivation and authenticated encryption
pub trait CryptoProvider: Send + Sync {
    /// Fill `buf` from a cryptographically secure random source.
    fn random_bytes(&self, buf: &mut [u8]) -> Result<()>;

    /// Derive the symmetric key for `password` under `salt`.
    ///
    /// The key is wrapped in `Zeroizing` so it is wiped when dropped.
    fn derive_key(&self, password: &[u8], salt: &[u8; SALT_LEN])
    -> Result<Zeroizing<[u8; KEY_LEN]>>;

    /// Seal `plaintext`, returning ciphertext with the tag appended.
    fn encrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    /// Open `ciphertext` (tag included).
    fn decrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;
}

/// Operating system randomness, PBKDF2-HMAC-SHA256 and AES-256-GCM
#[derive(Debug, Clone)]
pub struct SystemCryptoProvider {
    iterations: u32,
}

impl SystemCryptoProvider {
    pub fn new() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }

    /// A provider with a cheap derivation, so tests can run thousands of
    /// decryptions. Payloads it produces are unreadable by the browser.
    #[cfg(test)]
    pub(crate) fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }
}

impl Default for SystemCryptoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for SystemCryptoProvider {
    fn random_bytes(&self, buf: &mut [u8]) -> Result<()> {
        OsRng.try_fill_bytes(buf).map_err(|e| {
            PagecryptError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::RandomnessUnavailable,
                format!("failed to read from the system random source: {}", e),
                e,
            )
        })
    }

    fn derive_key(
        &self,
        password: &[u8],
        salt: &[u8; SALT_LEN],
    ) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt, self.iterations, &mut *key).map_err(
            |e| {
                PagecryptError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::KeyDerivationFailure,
                    format!("PBKDF2 key derivation failed: {}", e),
                )
            },
        )?;
        Ok(key)
    }

    fn encrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = cipher_for(key)?;
        cipher
            .encrypt(Nonce::<U16>::from_slice(nonce), plaintext)
            .map_err(|e| {
                PagecryptError::with_kind(
                    ErrorCategory::Internal,
                    ErrorKind::EncryptionFailure,
                    format!("encryption failed: {}", e),
                )
            })
    }

    fn decrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let cipher = cipher_for(key)?;
        cipher
            .decrypt(Nonce::<U16>::from_slice(nonce), ciphertext)
            .map_err(|_| {
                PagecryptError::with_kind(
                    ErrorCategory::User,
                    ErrorKind::DecryptionFailed,
                    "authentication failed",
                )
            })
    }
}

fn cipher_for(key: &[u8; KEY_LEN]) -> Result<Aes256Gcm16> {
    Aes256Gcm16::new_from_slice(key).map_err(|e| {
        PagecryptError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            format!("AES-256 rejected a 32-byte key: {}", e),
        )
    })
}
