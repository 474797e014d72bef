//! CLI integration tests
//!
//! Tests the command-line interface end-to-end.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Get path to the pagecrypt binary
fn pagecrypt_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pagecrypt"))
}

/// Run pagecrypt with password from stdin
fn run_pagecrypt_with_password(
    args: &[&str],
    password: &str,
) -> Result<std::process::Output, std::io::Error> {
    let mut child = Command::new(pagecrypt_bin())
        .arg("--password-stdin")
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    {
        let stdin = child.stdin.as_mut().expect("failed to open stdin");
        // Ignore BrokenPipe errors - the command may exit before reading stdin
        // if it encounters an error (e.g., file not found)
        let _ = stdin.write_all(password.as_bytes());
    }

    child.wait_with_output()
}

fn run_pagecrypt(args: &[&str]) -> std::process::Output {
    Command::new(pagecrypt_bin())
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run pagecrypt")
}

/// Get path to testdata directory
fn testdata_path(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("testdata");
    path.push(filename);
    path
}

#[test]
fn test_encrypt_decrypt_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = testdata_path("hello.html");
    let encrypted_path = temp_dir.path().join("hello.protected.html");
    let decrypted_path = temp_dir.path().join("hello.decrypted.html");

    let result = run_pagecrypt_with_password(
        &[
            "encrypt",
            "-i",
            plaintext_path.to_str().unwrap(),
            "-o",
            encrypted_path.to_str().unwrap(),
        ],
        "test\n",
    )
    .unwrap();

    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let encrypted = fs::read_to_string(&encrypted_path).unwrap();
    assert!(!encrypted.contains("Hello, world!"));
    assert!(!encrypted.contains("<!--ENCRYPTED PAYLOAD-->"));
    assert!(encrypted.contains("<pre class=\"hidden\">"));
    assert!(encrypted.contains("<script type=\"module\">"));

    let result = run_pagecrypt_with_password(
        &[
            "decrypt",
            "-i",
            encrypted_path.to_str().unwrap(),
            "-o",
            decrypted_path.to_str().unwrap(),
        ],
        "test",
    )
    .unwrap();

    assert!(
        result.status.success(),
        "decrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let original = fs::read_to_string(&plaintext_path).unwrap();
    let decrypted = fs::read_to_string(&decrypted_path).unwrap();
    assert_eq!(original, decrypted);
}

#[test]
fn test_generated_password_and_external_assets() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = testdata_path("hello.html");
    let encrypted_path = temp_dir.path().join("hello.protected.html");
    let decrypted_path = temp_dir.path().join("hello.decrypted.html");

    let result = run_pagecrypt(&[
        "encrypt",
        "-i",
        plaintext_path.to_str().unwrap(),
        "-o",
        encrypted_path.to_str().unwrap(),
        "--generate-password",
        "24",
        "--no-embed-script",
        "--no-embed-style",
    ]);
    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let password = String::from_utf8(result.stdout).unwrap();
    let password = password.trim_end();
    assert_eq!(password.len(), 24);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));

    let encrypted = fs::read_to_string(&encrypted_path).unwrap();
    assert!(!encrypted.contains("<script"));
    assert!(!encrypted.contains("<style"));

    let result = run_pagecrypt_with_password(
        &[
            "decrypt",
            "-i",
            encrypted_path.to_str().unwrap(),
            "-o",
            decrypted_path.to_str().unwrap(),
        ],
        password,
    )
    .unwrap();
    assert!(
        result.status.success(),
        "decrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert_eq!(
        fs::read_to_string(&decrypted_path).unwrap(),
        fs::read_to_string(&plaintext_path).unwrap()
    );
}

#[test]
fn test_decrypt_with_wrong_password_fails() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = testdata_path("hello.html");
    let encrypted_path = temp_dir.path().join("hello.protected.html");
    let decrypted_path = temp_dir.path().join("hello.decrypted.html");

    let result = run_pagecrypt_with_password(
        &[
            "encrypt",
            "-i",
            plaintext_path.to_str().unwrap(),
            "-o",
            encrypted_path.to_str().unwrap(),
        ],
        "correct_password",
    )
    .unwrap();
    assert!(result.status.success());

    let result = run_pagecrypt_with_password(
        &[
            "decrypt",
            "-i",
            encrypted_path.to_str().unwrap(),
            "-o",
            decrypted_path.to_str().unwrap(),
        ],
        "wrong_password",
    )
    .unwrap();

    assert!(!result.status.success());
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(
        stderr.contains("decrypt"),
        "Expected error message about decryption, got: {}",
        stderr
    );
    assert!(!decrypted_path.exists());
}

#[test]
fn test_custom_salt_is_embedded() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = testdata_path("hello.html");
    let encrypted_path = temp_dir.path().join("hello.protected.html");

    let result = run_pagecrypt(&["generate-salt"]);
    assert!(result.status.success());
    let salt = String::from_utf8(result.stdout).unwrap();
    let salt = salt.trim_end();
    assert_eq!(salt.len(), 64);

    let result = run_pagecrypt_with_password(
        &[
            "encrypt",
            "-i",
            plaintext_path.to_str().unwrap(),
            "-o",
            encrypted_path.to_str().unwrap(),
            "--salt",
            salt,
        ],
        "test",
    )
    .unwrap();
    assert!(
        result.status.success(),
        "encrypt failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let encrypted = fs::read_to_string(&encrypted_path).unwrap();
    let start = encrypted.find("<pre class=\"hidden\">").unwrap() + "<pre class=\"hidden\">".len();
    let end = start + encrypted[start..].find("</pre>").unwrap();
    let payload = &encrypted[start..end];

    use base64::Engine;
    let data = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .unwrap();
    assert_eq!(hex::encode(&data[..32]), salt);
}

#[test]
fn test_invalid_salt_fails() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = testdata_path("hello.html");
    let encrypted_path = temp_dir.path().join("hello.protected.html");

    let result = run_pagecrypt_with_password(
        &[
            "encrypt",
            "-i",
            plaintext_path.to_str().unwrap(),
            "-o",
            encrypted_path.to_str().unwrap(),
            "--salt",
            "zz-not-hex",
        ],
        "test",
    )
    .unwrap();

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("salt"));
    assert!(!encrypted_path.exists());
}

#[test]
fn test_template_without_marker_fails() {
    let temp_dir = TempDir::new().unwrap();
    let plaintext_path = testdata_path("hello.html");
    let template_path = temp_dir.path().join("template.html");
    let encrypted_path = temp_dir.path().join("hello.protected.html");
    fs::write(&template_path, "<html><body>no marker here</body></html>").unwrap();

    let result = run_pagecrypt_with_password(
        &[
            "encrypt",
            "-i",
            plaintext_path.to_str().unwrap(),
            "-o",
            encrypted_path.to_str().unwrap(),
            "--template",
            template_path.to_str().unwrap(),
        ],
        "test",
    )
    .unwrap();

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("marker"));
    assert!(!encrypted_path.exists());
}

#[test]
fn test_encrypt_nonexistent_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let nonexistent = temp_dir.path().join("nonexistent.html");
    let output = temp_dir.path().join("output.html");

    let result = run_pagecrypt_with_password(
        &[
            "encrypt",
            "-i",
            nonexistent.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ],
        "test",
    )
    .unwrap();

    assert!(!result.status.success());
    assert!(!output.exists());
}

#[test]
fn test_generate_password() {
    let result = run_pagecrypt(&["generate-password"]);
    assert!(result.status.success());
    let password = String::from_utf8(result.stdout).unwrap();
    assert_eq!(password.trim_end().len(), 80);

    let result = run_pagecrypt(&["generate-password", "--length", "12", "--alphabet", "xyz"]);
    assert!(result.status.success());
    let password = String::from_utf8(result.stdout).unwrap();
    let password = password.trim_end();
    assert_eq!(password.len(), 12);
    assert!(password.chars().all(|c| "xyz".contains(c)));

    let result = run_pagecrypt(&["generate-password", "--alphabet", ""]);
    assert!(!result.status.success());
}

#[test]
fn test_export_assets() {
    let temp_dir = TempDir::new().unwrap();
    let assets = temp_dir.path().join("client");

    let result = run_pagecrypt(&["export-assets", "-o", assets.to_str().unwrap()]);
    assert!(
        result.status.success(),
        "export-assets failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );

    let script = fs::read_to_string(assets.join("pagecrypt.js")).unwrap();
    assert!(script.contains("PBKDF2"));
    assert!(fs::read_to_string(assets.join("pagecrypt.css")).unwrap().contains(".hidden"));
}
