//! Password hashing and API token primitives.
//!
//! Passwords are stretched with Argon2id and stored as
//! `argon2id$<hex salt>$<hex hash>`. API tokens are random alphanumeric
//! strings with a `gl_` prefix; only their SHA-256 digest is persisted.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Prefix carried by every issued API token.
pub const TOKEN_PREFIX: &str = "gl_";

/// Number of random characters after the prefix.
pub const TOKEN_LENGTH: usize = 40;

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
const SCHEME: &str = "argon2id";

/// Argon2id cost parameters (memory KiB, iterations, parallelism).
const MEMORY_KIB: u32 = 19456;
const ITERATIONS: u32 = 2;
const PARALLELISM: u32 = 1;

/// Generate a random alphanumeric string.
fn generate_secret(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Issue a fresh plaintext API token.
pub fn generate_token() -> String {
    format!("{}{}", TOKEN_PREFIX, generate_secret(TOKEN_LENGTH))
}

/// SHA-256 hex digest of a token, as stored in `api_token.token_hash`.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn argon2() -> Result<Argon2<'static>> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, Some(HASH_LEN))
        .map_err(|e| Error::Internal(format!("argon2 params: {}", e)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn derive(password: &str, salt: &[u8]) -> Result<[u8; HASH_LEN]> {
    let mut out = [0u8; HASH_LEN];
    argon2()?
        .hash_password_into(password.as_bytes(), salt, &mut out)
        .map_err(|e| Error::Internal(format!("argon2 hash: {}", e)))?;
    Ok(out)
}

/// Hash a password with a random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill(&mut salt);
    let hash = derive(password, &salt)?;
    Ok(format!("{}${}${}", SCHEME, hex::encode(salt), hex::encode(hash)))
}

/// Check `password` against a value produced by [`hash_password`].
///
/// Malformed stored hashes verify as `false`.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(salt_hex), Some(hash_hex), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Ok(false);
    };

    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return Ok(false);
    };
    if expected.len() != HASH_LEN {
        return Ok(false);
    }

    let actual = derive(password, &salt)?;
    Ok(constant_time_eq(&actual, &expected))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
