//! Encrypting whole HTML documents
//!
//! Key derivation is deliberately slow (seconds), so both directions run the
//! cryptography on tokio's blocking pool and can be awaited from any async
//! context without stalling other tasks.

use std::sync::Arc;

use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, PagecryptError, Result};
use crate::payload;
use crate::provider::CryptoProvider;
use crate::template;

/// How a document is encrypted and composed.
#[derive(Debug, Clone)]
pub struct EncryptOptions {
    /// Keep the decryptor script inline. Turn off when hosting it
    /// separately, for example to satisfy a Content-Security-Policy.
    pub embed_script: bool,
    /// Keep the stylesheet inline.
    pub embed_style: bool,
    /// Salt to use instead of a random one; must be at least 32 bytes to
    /// take effect.
    ///
    /// Every document encrypted with the same password and this salt shares
    /// one derived key. Only set this when that loss of separation between
    /// documents is acceptable.
    pub custom_salt: Option<Vec<u8>>,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            embed_script: true,
            embed_style: true,
            custom_salt: None,
        }
    }
}

/// Encrypt `input_html` with `password` and compose it into `template`.
///
/// The template is checked for the payload marker before any key is
/// derived, so a malformed template fails fast.
pub async fn encrypt_html(
    provider: Arc<dyn CryptoProvider>,
    template: &str,
    input_html: &str,
    password: Zeroizing<String>,
    options: &EncryptOptions,
) -> Result<String> {
    if !template.contains(template::PAYLOAD_MARKER) {
        return Err(PagecryptError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::TemplateMalformed,
            format!("template does not contain the {} marker", template::PAYLOAD_MARKER),
        ));
    }

    let content = input_html.to_string();
    let custom_salt = options.custom_salt.clone();
    let encoded = run_blocking(move || {
        payload::encode(&*provider, &content, &password, custom_salt.as_deref())
    })
    .await?;

    debug!(payload_len = encoded.len(), "composing document");
    template::compose(template, &encoded, options.embed_script, options.embed_style)
}

/// Recover the original HTML from a document produced by [`encrypt_html`].
pub async fn decrypt_html(
    provider: Arc<dyn CryptoProvider>,
    document: &str,
    password: Zeroizing<String>,
) -> Result<String> {
    let encoded = template::extract_payload(document)?.to_string();
    run_blocking(move || payload::decode(&*provider, &encoded, &password)).await
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        PagecryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::InternalInvariant,
            "cryptographic task did not complete",
            e,
        )
    })?
}
