//! pagecrypt - password-protected, self-decrypting HTML pages
//!
//! A page is encrypted with AES-256-GCM under a PBKDF2-derived key and
//! embedded in a template whose inline script decrypts it in the browser.

#![forbid(unsafe_code)]

pub mod document;
pub mod error;
pub mod file_ops;
pub mod passgen;
pub mod password;
pub mod payload;
pub mod provider;
pub mod template;
