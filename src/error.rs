use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// In particular this means that use of Internal is never a guarantee
    /// the error is not, for example due to a user error - merely that it
    /// cannot be confidently determined by the code.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A caller-supplied salt could not be interpreted as bytes.
    InvalidSalt,
    /// The template lacks the payload marker, the payload wrapper, or the
    /// block being exported. Always a build defect rather than user error.
    TemplateMalformed,
    /// The AEAD primitive refused to seal the plaintext.
    EncryptionFailure,
    /// Decryption did not succeed. Wrong passwords and corrupt or tampered
    /// payloads are deliberately reported identically.
    DecryptionFailed,
    /// PBKDF2 key derivation failed.
    KeyDerivationFailure,
    /// The operating system random source could not be read.
    RandomnessUnavailable,
    /// The password alphabet is empty or larger than 256 characters.
    InvalidAlphabet,
    /// A password length of zero was requested.
    InvalidLength,
    /// Password could not be obtained from the configured reader.
    PasswordUnavailable,
    /// Unexpected state reached within pagecrypt logic.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct PagecryptError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl PagecryptError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    ///
    /// The kind is carried over so callers can still branch on it after
    /// context has been added.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    pub(crate) fn io(category: ErrorCategory, msg: impl Into<String>, err: std::io::Error) -> Self {
        Self::with_kind_and_source(category, ErrorKind::Io, msg, err)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, PagecryptError>;
