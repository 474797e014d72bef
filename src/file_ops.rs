//! File encryption/decryption operations
//!
//! This module reads input documents from disk, runs them through
//! [`crate::document`], and writes the results. Every output is written to a
//! temporary file next to the target and renamed into place, so a failed
//! run never leaves a partial or unencrypted file behind.

use crate::document::{self, EncryptOptions};
use crate::error::{ErrorCategory, ErrorKind, PagecryptError, Result};
use crate::password::PasswordReader;
use crate::provider::CryptoProvider;
use crate::template::{self, BlockKind};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// File name of the exported decryptor script.
pub const SCRIPT_ASSET: &str = "pagecrypt.js";

/// File name of the exported stylesheet.
pub const STYLE_ASSET: &str = "pagecrypt.css";

/// Mode for documents meant to be published.
const PUBLIC_MODE: u32 = 0o644;

/// Mode for recovered plaintext.
const PRIVATE_MODE: u32 = 0o600;

/// Encrypt an HTML file with a password
///
/// Reads the page from `input_path`, encrypts it using a password from
/// `password_reader`, composes it into `template`, and writes the protected
/// page to `output_path`.
pub async fn encrypt_file(
    provider: Arc<dyn CryptoProvider>,
    input_path: &Path,
    output_path: &Path,
    password_reader: &mut dyn PasswordReader,
    template: &str,
    options: &EncryptOptions,
) -> Result<()> {
    let html = read_text(input_path)?;
    let password = password_reader.read_password()?;
    let encrypted = document::encrypt_html(provider, template, &html, password, options)
        .await
        .map_err(|e| e.with_context("encryption failed"))?;
    write_file_atomic(output_path, encrypted.as_bytes(), PUBLIC_MODE)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(output = %output_path.display(), "wrote encrypted page");
    Ok(())
}

/// Decrypt a page produced by [`encrypt_file`]
///
/// The recovered HTML is written with mode 0o600 (read/write for owner
/// only) on Unix systems.
pub async fn decrypt_file(
    provider: Arc<dyn CryptoProvider>,
    input_path: &Path,
    output_path: &Path,
    password_reader: &mut dyn PasswordReader,
) -> Result<()> {
    let encrypted = read_text(input_path)?;
    let password = password_reader.read_password()?;
    let html = document::decrypt_html(provider, &encrypted, password)
        .await
        .map_err(|e| e.with_context("failed to decrypt"))?;
    write_file_atomic(output_path, html.as_bytes(), PRIVATE_MODE)
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    info!(output = %output_path.display(), "wrote decrypted page");
    Ok(())
}

/// Write the template's script and style to `dir` as [`SCRIPT_ASSET`] and
/// [`STYLE_ASSET`], for pages encrypted without them inline.
pub fn export_assets(template: &str, dir: &Path) -> Result<()> {
    let script = template::extract_block(template, BlockKind::Script)?;
    let style = template::extract_block(template, BlockKind::Style)?;

    fs::create_dir_all(dir).map_err(|e| {
        PagecryptError::io(
            ErrorCategory::User,
            format!("failed to create {}", dir.display()),
            e,
        )
    })?;
    for (name, contents) in [(SCRIPT_ASSET, script), (STYLE_ASSET, style)] {
        let path = dir.join(name);
        write_file_atomic(&path, contents.as_bytes(), PUBLIC_MODE)
            .map_err(|e| e.with_context(format!("failed to write to {}", path.display())))?;
        info!(output = %path.display(), "wrote asset");
    }
    Ok(())
}

/// Read a template or page as UTF-8 text
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        PagecryptError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("{} is not valid UTF-8", path.display()),
            e,
        )
    })
}

/// Atomically replace `path` with `contents` (tempfile + fsync + rename)
///
/// Either the old file or the complete new file exists afterwards, never a
/// partial one.
fn write_file_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
        PagecryptError::io(ErrorCategory::User, "failed to create tempfile", e)
    })?;

    temp_file.write_all(contents).map_err(|e| {
        PagecryptError::io(ErrorCategory::Internal, "failed to write to tempfile", e)
    })?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file.flush().map_err(|e| {
        PagecryptError::io(ErrorCategory::Internal, "failed to flush tempfile", e)
    })?;
    temp_file.as_file().sync_all().map_err(|e| {
        PagecryptError::io(
            ErrorCategory::Internal,
            "failed to sync file prior to rename",
            e,
        )
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(mode))
            .map_err(|e| {
                PagecryptError::io(
                    ErrorCategory::Internal,
                    "failed to set tempfile permissions",
                    e,
                )
            })?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    temp_file.persist(path).map_err(|e| {
        PagecryptError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            format!("failed to rename to target file {}", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn read_error(path: &Path, err: io::Error) -> PagecryptError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    PagecryptError::io(category, format!("failed to read from {}", path.display()), err)
}
