//! Password transform
//!
//! Passwords never travel or rest in plain text. Both the configuration
//! file and the AUTH command carry `salt ++ base64(sha256(salt ++ plain))`,
//! and the server compares that form in constant time.

use base64::Engine as _;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Salt applied when none is given
pub const DEFAULT_SALT: &str = "xx";

/// Encrypt a plain-text password
///
/// The result starts with the salt.
pub fn encrypt_password(plain: &str, salt: Option<&str>) -> String {
    let salt = salt.unwrap_or(DEFAULT_SALT);

    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(plain.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(salt.len() + 44);
    out.push_str(salt);
    base64::engine::general_purpose::STANDARD.encode_string(digest, &mut out);
    out
}

/// Constant-time comparison of two secrets
pub fn secrets_match(given: &str, expected: &str) -> bool {
    given.as_bytes().ct_eq(expected.as_bytes()).into()
}
