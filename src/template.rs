//! Embedding payloads into the decrypt template
//!
//! Everything here is plain text substitution. The template is a single
//! trusted file and is required to contain:
//! - exactly one `<!--ENCRYPTED PAYLOAD-->` marker
//! - exactly one `<script type="module">` block and one `<style>` block,
//!   neither containing nested markup of its own tag
//!
//! Those preconditions are not verified beyond the marker check.

use std::ops::Range;

use tracing::debug;

use crate::error::{ErrorCategory, ErrorKind, PagecryptError, Result};

/// Placeholder replaced by the encrypted payload.
pub const PAYLOAD_MARKER: &str = "<!--ENCRYPTED PAYLOAD-->";

const PAYLOAD_OPEN: &str = "<pre class=\"hidden\">";
const PAYLOAD_CLOSE: &str = "</pre>";

/// The decrypt template shipped with pagecrypt.
pub const DEFAULT_TEMPLATE: &str = include_str!("../assets/decrypt-template.html");

/// The inline blocks a template carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// The decryptor, `<script type="module">…</script>`.
    Script,
    /// The page style, `<style>…</style>`.
    Style,
}

impl BlockKind {
    fn open_tag(self) -> &'static str {
        match self {
            BlockKind::Script => "<script type=\"module\">",
            BlockKind::Style => "<style>",
        }
    }

    fn close_tag(self) -> &'static str {
        match self {
            BlockKind::Script => "</script>",
            BlockKind::Style => "</style>",
        }
    }

    fn name(self) -> &'static str {
        match self {
            BlockKind::Script => "script",
            BlockKind::Style => "style",
        }
    }
}

/// Substitute `payload` into `template` and optionally drop the inline
/// script and style.
///
/// Fails with `TemplateMalformed` if the marker is missing; a template
/// without it would otherwise yield a page that encrypts nothing.
pub fn compose(
    template: &str,
    payload: &str,
    embed_script: bool,
    embed_style: bool,
) -> Result<String> {
    let at = template.find(PAYLOAD_MARKER).ok_or_else(|| {
        PagecryptError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::TemplateMalformed,
            format!("template does not contain the {} marker", PAYLOAD_MARKER),
        )
    })?;

    let mut document = String::with_capacity(
        template.len() + payload.len() + PAYLOAD_OPEN.len() + PAYLOAD_CLOSE.len(),
    );
    document.push_str(&template[..at]);
    document.push_str(PAYLOAD_OPEN);
    document.push_str(payload);
    document.push_str(PAYLOAD_CLOSE);
    document.push_str(&template[at + PAYLOAD_MARKER.len()..]);

    if !embed_script {
        document = strip_block(&document, BlockKind::Script);
    }
    if !embed_style {
        document = strip_block(&document, BlockKind::Style);
    }

    Ok(document)
}

/// Return the payload text embedded in a composed document.
pub fn extract_payload(document: &str) -> Result<&str> {
    let start = document
        .find(PAYLOAD_OPEN)
        .map(|i| i + PAYLOAD_OPEN.len())
        .ok_or_else(|| {
            PagecryptError::with_kind(
                ErrorCategory::User,
                ErrorKind::TemplateMalformed,
                "document does not contain an encrypted payload",
            )
        })?;
    let len = document[start..].find(PAYLOAD_CLOSE).ok_or_else(|| {
        PagecryptError::with_kind(
            ErrorCategory::User,
            ErrorKind::TemplateMalformed,
            "encrypted payload is not terminated",
        )
    })?;
    Ok(document[start..start + len].trim())
}

/// Return the contents of the first block of `kind`, without its tags.
///
/// Used to host the decryptor script and style as separate files.
pub fn extract_block(template: &str, kind: BlockKind) -> Result<&str> {
    let (_, inner) = find_block(template, kind).ok_or_else(|| {
        PagecryptError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::TemplateMalformed,
            format!("template does not contain an inline {} block", kind.name()),
        )
    })?;
    Ok(&template[inner])
}

/// Removes the first block of `kind`. Leaves `html` unchanged if it has none.
fn strip_block(html: &str, kind: BlockKind) -> String {
    match find_block(html, kind) {
        Some((outer, _)) => {
            debug!(block = kind.name(), "stripping inline block");
            let mut out = String::with_capacity(html.len() - outer.len());
            out.push_str(&html[..outer.start]);
            out.push_str(&html[outer.end..]);
            out
        }
        None => {
            debug!(block = kind.name(), "no inline block to strip");
            html.to_string()
        }
    }
}

/// Locate the first block of `kind`: the shortest span from its opening tag
/// to the next closing tag, matched ASCII case-insensitively.
///
/// Returns the range including the tags and the range of the contents.
fn find_block(html: &str, kind: BlockKind) -> Option<(Range<usize>, Range<usize>)> {
    // ASCII lowercasing keeps every byte offset valid in `html`.
    let lower = html.to_ascii_lowercase();
    let open = kind.open_tag();
    let close = kind.close_tag();

    let start = lower.find(open)?;
    let inner_start = start + open.len();
    let inner_end = inner_start + lower[inner_start..].find(close)?;
    let end = inner_end + close.len();

    Some((start..end, inner_start..inner_end))
}
