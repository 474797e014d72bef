//! Random password and salt generation

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::error::{ErrorCategory, ErrorKind, PagecryptError, Result};
use crate::provider::SALT_LEN;

/// Default length of generated passwords.
pub const DEFAULT_PASSWORD_LEN: usize = 80;

/// Default password alphabet: ASCII digits and letters.
pub const DEFAULT_ALPHABET: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// A set of distinct characters to draw passwords from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    /// Builds an alphabet from the characters of `chars`.
    ///
    /// Fails if `chars` is empty, repeats a character (which would make it
    /// more likely than the others), or has more than 256 characters (a
    /// single random byte could not reach them all).
    pub fn new(chars: &str) -> Result<Self> {
        let chars: Vec<char> = chars.chars().collect();
        if chars.is_empty() {
            return Err(invalid_alphabet("password alphabet must not be empty"));
        }
        if chars.len() > 256 {
            return Err(invalid_alphabet(
                "password alphabet must not have more than 256 characters",
            ));
        }
        for (i, c) in chars.iter().enumerate() {
            if chars[..i].contains(c) {
                return Err(invalid_alphabet(format!(
                    "password alphabet repeats the character {:?}",
                    c
                )));
            }
        }
        Ok(Self { chars })
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Picks one character uniformly at random.
    ///
    /// `byte % len` alone favors the low indices whenever 256 is not a
    /// multiple of the alphabet size, so bytes in the uneven top range are
    /// discarded and redrawn.
    fn pick<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<char> {
        let n = self.chars.len();
        let limit = 256 - (256 % n);
        loop {
            let mut byte = [0u8; 1];
            rng.try_fill_bytes(&mut byte).map_err(|e| {
                PagecryptError::with_kind_and_source(
                    ErrorCategory::Internal,
                    ErrorKind::RandomnessUnavailable,
                    format!("failed to read from the random source: {}", e),
                    e,
                )
            })?;
            let value = byte[0] as usize;
            if value < limit {
                return Ok(self.chars[value % n]);
            }
        }
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            chars: DEFAULT_ALPHABET.chars().collect(),
        }
    }
}

/// Generate a random password of `length` characters from `alphabet`.
pub fn generate_password(length: usize, alphabet: &Alphabet) -> Result<String> {
    generate_password_with(&mut OsRng, length, alphabet)
}

/// Like [`generate_password`], drawing from the given random source.
pub fn generate_password_with<R: RngCore + CryptoRng>(
    rng: &mut R,
    length: usize,
    alphabet: &Alphabet,
) -> Result<String> {
    if length == 0 {
        return Err(PagecryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::InvalidLength,
            "password length must be positive",
        ));
    }
    (0..length).map(|_| alphabet.pick(rng)).collect()
}

/// Generate a random salt from the operating system random source.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.try_fill_bytes(&mut salt).map_err(|e| {
        PagecryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::RandomnessUnavailable,
            format!("failed to read from the system random source: {}", e),
            e,
        )
    })?;
    Ok(salt)
}

/// Parse a hex-encoded custom salt, as printed by `generate-salt`.
pub fn parse_salt(text: &str) -> Result<Vec<u8>> {
    hex::decode(text.trim()).map_err(|e| {
        PagecryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidSalt,
            format!("custom salt is not valid hex: {}", e),
            e,
        )
    })
}

fn invalid_alphabet(msg: impl Into<String>) -> PagecryptError {
    PagecryptError::with_kind(ErrorCategory::User, ErrorKind::InvalidAlphabet, msg)
}
