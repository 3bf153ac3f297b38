//! Salted password digests.
//!
//! Stored as `hex(salt)$hex(sha256(salt || password))`. Verification is
//! constant-time over the digest bytes.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Hash a password with a fresh random salt.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    format!(
        "{}${}",
        hex::encode(salt),
        hex::encode(digest(&salt, password))
    )
}

/// Check a candidate password against a stored hash.
///
/// Malformed stored hashes read as a mismatch rather than an error; login
/// treats both identically.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };
    digest(&salt, password).ct_eq(&expected).into()
}
