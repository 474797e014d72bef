//! Encrypted payload encoding and decoding
//!
//! A payload is the standard base64 (padded, unwrapped) encoding of:
//! - salt: 32 bytes
//! - nonce: 16 bytes
//! - ciphertext: variable length (includes 16-byte GCM tag)
//!
//! There is no length field or version marker: both sides split at the
//! fixed salt and nonce lengths, and the key derivation cost is a shared
//! constant (see [`crate::provider`]).

use base64::{Engine, engine::general_purpose::STANDARD};
use tracing::{debug, warn};

use crate::error::{ErrorCategory, ErrorKind, PagecryptError, Result};
use crate::provider::{CryptoProvider, NONCE_LEN, SALT_LEN, TAG_LEN};

/// Smallest decoded payload: salt, nonce and the tag of an empty plaintext.
pub const MIN_PAYLOAD_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// The only message a failed decode ever carries.
const DECRYPTION_FAILED: &str = "decryption failed: wrong password or corrupted payload";

/// Encrypt `content` under `password` and return the payload string.
///
/// A fresh random salt is used unless `custom_salt` holds at least
/// [`SALT_LEN`] bytes, in which case its first [`SALT_LEN`] bytes are used.
/// A shorter custom salt is ignored.
///
/// Reusing a custom salt across documents encrypted with the same password
/// makes them share one derived key. This is what allows a reader to unlock
/// several pages with one derivation, and is also strictly weaker: a key
/// recovered for one document opens all of them.
pub fn encode(
    provider: &dyn CryptoProvider,
    content: &str,
    password: &str,
    custom_salt: Option<&[u8]>,
) -> Result<String> {
    let salt = resolve_salt(provider, custom_salt)?;

    let mut nonce = [0u8; NONCE_LEN];
    provider.random_bytes(&mut nonce)?;

    encode_deterministic(provider, content, password, &salt, &nonce)
}

/// Encrypt with a caller-provided salt and nonce.
///
/// This function is ONLY for generating deterministic output in tests.
/// NEVER use this in production - always use `encode()`, which generates a
/// fresh nonce for every call.
pub fn encode_deterministic(
    provider: &dyn CryptoProvider,
    content: &str,
    password: &str,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<String> {
    debug!(plaintext_len = content.len(), "deriving key for encryption");
    let key = provider.derive_key(password.as_bytes(), salt)?;
    let ciphertext = provider.encrypt(&key, nonce, content.as_bytes())?;

    let mut output = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    output.extend_from_slice(salt);
    output.extend_from_slice(nonce);
    output.extend_from_slice(&ciphertext);

    Ok(STANDARD.encode(output))
}

/// Decrypt a payload produced by [`encode`].
///
/// Any failure to recover the plaintext, whether a wrong password, a
/// truncated or altered payload, or malformed base64, yields the same
/// `DecryptionFailed` error with the same message.
pub fn decode(provider: &dyn CryptoProvider, payload: &str, password: &str) -> Result<String> {
    let data = STANDARD
        .decode(payload.trim())
        .map_err(|_| decryption_failed())?;

    if data.len() < MIN_PAYLOAD_LEN {
        return Err(decryption_failed());
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    let salt: &[u8; SALT_LEN] = salt.try_into().map_err(|_| decryption_failed())?;
    let nonce: &[u8; NONCE_LEN] = nonce.try_into().map_err(|_| decryption_failed())?;

    debug!(ciphertext_len = ciphertext.len(), "deriving key for decryption");
    let key = provider.derive_key(password.as_bytes(), salt)?;
    let plaintext = provider
        .decrypt(&key, nonce, ciphertext)
        .map_err(|_| decryption_failed())?;

    String::from_utf8(plaintext).map_err(|_| decryption_failed())
}

fn resolve_salt(
    provider: &dyn CryptoProvider,
    custom_salt: Option<&[u8]>,
) -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    match custom_salt {
        Some(custom) if custom.len() >= SALT_LEN => {
            if custom.len() > SALT_LEN {
                warn!(
                    custom_len = custom.len(),
                    "custom salt longer than {} bytes; only the leading bytes are used", SALT_LEN
                );
            }
            debug!("using caller-supplied salt; documents sharing it share a key");
            salt.copy_from_slice(&custom[..SALT_LEN]);
        }
        Some(custom) => {
            warn!(
                custom_len = custom.len(),
                "custom salt shorter than {} bytes; generating a random salt instead", SALT_LEN
            );
            provider.random_bytes(&mut salt)?;
        }
        None => provider.random_bytes(&mut salt)?,
    }
    Ok(salt)
}

fn decryption_failed() -> PagecryptError {
    PagecryptError::with_kind(
        ErrorCategory::User,
        ErrorKind::DecryptionFailed,
        DECRYPTION_FAILED,
    )
}
