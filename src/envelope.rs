//! Versioned encrypted envelope using scrypt + XSalsa20Poly1305
//!
//! This module implements the on-disk container for password-protected
//! documents:
//! - scrypt for key derivation from the password
//! - NaCl secretbox (XSalsa20Poly1305) for authenticated encryption
//!
//! The binary format is:
//! - version: 1 byte (only 0x01 is recognized)
//! - salt: 16 bytes
//! - nonce: 24 bytes
//! - sealed box: variable length (includes 16-byte Poly1305 MAC)
//!
//! An empty password selects plaintext mode: no envelope is written and
//! input bytes pass through untouched. The caller decides which mode
//! applies; the codec never probes the data to guess.

use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};
use rand::RngCore;
use rand::rngs::OsRng;
use scrypt::{Params, scrypt};
use zeroize::Zeroizing;

use crate::error::{ErrorCategory, ErrorKind, InkvaultError, Result};

/// Format tag written as the first byte of every envelope
pub const FORMAT_VERSION: u8 = 0x01;

/// Length of the version tag in bytes
pub const VERSION_LEN: usize = 1;

/// Length of salt in bytes
pub const SALT_LEN: usize = 16;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 24;

/// Length of derived key in bytes
const KEY_LEN: usize = 32;

/// Length of the Poly1305 MAC carried inside the sealed box
pub const MAC_LEN: usize = 16;

/// Length of the fixed header preceding the sealed box
pub const HEADER_LEN: usize = VERSION_LEN + SALT_LEN + NONCE_LEN;

/// scrypt N parameter (CPU/memory cost)
const SCRYPT_N: u32 = 32768;

/// scrypt r parameter (block size)
const SCRYPT_R: u32 = 8;

/// scrypt p parameter (parallelization)
const SCRYPT_P: u32 = 1;

/// Derive a 32-byte key from a password and salt using scrypt
///
/// The key is returned in `Zeroizing` so it is wiped on every exit path
/// of the single encrypt/decrypt operation it serves.
fn derive_key(password: &[u8], salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let params = Params::new(
        (SCRYPT_N as f64).log2() as u8, // log_n
        SCRYPT_R,
        SCRYPT_P,
        KEY_LEN,
    )
    .map_err(|e| {
        InkvaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KeyDerivation,
            "failed to create scrypt params",
            e,
        )
    })?;

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt(password, salt, &params, key.as_mut_slice()).map_err(|e| {
        InkvaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::KeyDerivation,
            "scrypt key derivation failed",
            e,
        )
    })?;

    Ok(key)
}

/// Encrypt plaintext with a password using random salt and nonce
///
/// Returns the binary format: version(1) + salt(16) + nonce(24) + sealedbox.
/// An empty password returns the plaintext unchanged (no envelope).
pub fn encode(plaintext: &[u8], password: &str) -> Result<Vec<u8>> {
    if password.is_empty() {
        return Ok(plaintext.to_vec());
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    seal_with(plaintext, password, &salt, &nonce)
}

/// Encrypt plaintext with a password using provided salt and nonce
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encode()` which generates random
/// salt/nonce.
pub fn seal_with(
    plaintext: &[u8],
    password: &str,
    salt: &[u8; SALT_LEN],
    nonce: &[u8; NONCE_LEN],
) -> Result<Vec<u8>> {
    let key = derive_key(password.as_bytes(), salt)?;

    let cipher = XSalsa20Poly1305::new(Key::from_slice(key.as_slice()));
    let nonce_obj = Nonce::from(*nonce);
    let sealed_box = cipher.encrypt(&nonce_obj, plaintext).map_err(|e| {
        InkvaultError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::EncryptionFailure,
            format!("encryption failed: {}", e),
        )
    })?;

    let mut output = Vec::with_capacity(HEADER_LEN + sealed_box.len());
    output.push(FORMAT_VERSION);
    output.extend_from_slice(salt);
    output.extend_from_slice(nonce);
    output.extend_from_slice(&sealed_box);

    Ok(output)
}

/// Decrypt an envelope with a password
///
/// Empty input yields empty plaintext (a new or empty document has no
/// envelope). An empty password returns the raw bytes unchanged, without
/// parsing any envelope. Otherwise the version byte is checked, the header
/// extracted, and the sealed box opened; a wrong password and corrupted
/// data are indistinguishable and reported as one condition.
pub fn decode(raw: &[u8], password: &str) -> Result<Vec<u8>> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    if password.is_empty() {
        return Ok(raw.to_vec());
    }

    if raw[0] != FORMAT_VERSION {
        return Err(InkvaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::UnsupportedVersion,
            format!("unsupported format version 0x{:02x}", raw[0]),
        ));
    }

    // Shortest valid envelope: header plus the sealed box of an empty
    // plaintext, which is just the MAC.
    if raw.len() < HEADER_LEN + MAC_LEN {
        return Err(InkvaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::TruncatedInput,
            "truncated or corrupted file: too short to hold an envelope",
        ));
    }

    let mut pos = VERSION_LEN;
    let salt: [u8; SALT_LEN] = raw[pos..pos + SALT_LEN].try_into().map_err(|e| {
        InkvaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::TruncatedInput,
            "failed to read salt",
            e,
        )
    })?;
    pos += SALT_LEN;

    let nonce: [u8; NONCE_LEN] = raw[pos..pos + NONCE_LEN].try_into().map_err(|e| {
        InkvaultError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::TruncatedInput,
            "failed to read nonce",
            e,
        )
    })?;
    pos += NONCE_LEN;

    let sealed_box = &raw[pos..];

    let key = derive_key(password.as_bytes(), &salt)?;
    let cipher = XSalsa20Poly1305::new(Key::from_slice(key.as_slice()));
    let nonce_obj = Nonce::from(nonce);
    let plaintext = cipher.decrypt(&nonce_obj, sealed_box).map_err(|_| {
        InkvaultError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "wrong password or corrupted file",
        )
    })?;

    Ok(plaintext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let plaintext = b"hello";

        let envelope = encode(plaintext, "test").unwrap();
        let decrypted = decode(&envelope, "test").unwrap();

        assert_eq!(plaintext, &decrypted[..]);
    }

    #[test]
    fn test_empty_plaintext() {
        let plaintext = b"";

        let envelope = encode(plaintext, "test").unwrap();
        assert_eq!(envelope.len(), HEADER_LEN + MAC_LEN);

        let decrypted = decode(&envelope, "test").unwrap();
        assert_eq!(plaintext, &decrypted[..]);
    }

    #[test]
    fn test_envelope_layout() {
        let salt = [0x11u8; SALT_LEN];
        let nonce = [0x22u8; NONCE_LEN];

        let envelope = seal_with(b"hello\r\n", "hunter2", &salt, &nonce).unwrap();

        assert_eq!(envelope[0], 0x01);
        assert_eq!(&envelope[VERSION_LEN..VERSION_LEN + SALT_LEN], &salt);
        assert_eq!(&envelope[VERSION_LEN + SALT_LEN..HEADER_LEN], &nonce);
        assert_eq!(envelope.len(), HEADER_LEN + b"hello\r\n".len() + MAC_LEN);
    }

    #[test]
    fn test_deterministic_sealing() {
        let plaintext = b"hello world";
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];

        let e1 = seal_with(plaintext, "test", &salt, &nonce).unwrap();
        let e2 = seal_with(plaintext, "test", &salt, &nonce).unwrap();

        // Same salt/nonce produces identical envelopes
        assert_eq!(e1, e2);

        assert_eq!(decode(&e1, "test").unwrap(), plaintext);
        assert_eq!(decode(&e2, "test").unwrap(), plaintext);
    }

    #[test]
    fn test_different_nonce_different_envelope() {
        let plaintext = b"hello world";
        let salt = [1u8; SALT_LEN];

        let e1 = seal_with(plaintext, "test", &salt, &[2u8; NONCE_LEN]).unwrap();
        let e2 = seal_with(plaintext, "test", &salt, &[3u8; NONCE_LEN]).unwrap();

        assert_ne!(e1, e2);
        assert_eq!(decode(&e1, "test").unwrap(), plaintext);
        assert_eq!(decode(&e2, "test").unwrap(), plaintext);
    }

    #[test]
    fn test_empty_password_passthrough() {
        let plaintext = b"not encrypted at all";

        // encode writes no envelope
        let encoded = encode(plaintext, "").unwrap();
        assert_eq!(encoded, plaintext);

        // decode returns the bytes untouched, even if they happen to
        // start with a valid-looking version byte
        let decoded = decode(plaintext, "").unwrap();
        assert_eq!(decoded, plaintext);

        let odd = [0x01u8, 0xde, 0xad];
        assert_eq!(decode(&odd, "").unwrap(), odd);
    }

    #[test]
    fn test_empty_input_is_empty_document() {
        assert_eq!(decode(b"", "whatever").unwrap(), b"");
        assert_eq!(decode(b"", "").unwrap(), b"");
    }

    #[test]
    fn test_wrong_password() {
        let envelope = encode(b"secret data", "correct").unwrap();
        let err = decode(&envelope, "wrong").expect_err("expected authentication failure");

        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert!(err.message().contains("wrong password or corrupted file"));
    }

    #[test]
    fn test_version_gate() {
        let mut envelope = encode(b"payload", "test").unwrap();

        for bad in [0x00u8, 0x02, 0x7f, 0xff] {
            envelope[0] = bad;
            let err = decode(&envelope, "test").expect_err("expected version error");
            assert_eq!(err.kind, Some(ErrorKind::UnsupportedVersion));
        }
    }

    #[test]
    fn test_tampered_sealed_box() {
        let envelope = encode(b"attack at dawn", "test").unwrap();

        // Flip one bit in every sealed box byte position in turn; each
        // must be detected, never returned as garbled plaintext.
        for i in HEADER_LEN..envelope.len() {
            let mut bent = envelope.clone();
            bent[i] ^= 0x01;
            let err = decode(&bent, "test").expect_err("expected authentication failure");
            assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        }
    }

    #[test]
    fn test_tampered_header_fails() {
        let envelope = encode(b"attack at dawn", "test").unwrap();

        // Salt or nonce corruption surfaces as the same conflated failure.
        let mut bent = envelope.clone();
        bent[VERSION_LEN] ^= 0x01;
        assert_eq!(
            decode(&bent, "test").unwrap_err().kind,
            Some(ErrorKind::AuthenticationFailed)
        );

        let mut bent = envelope.clone();
        bent[VERSION_LEN + SALT_LEN] ^= 0x01;
        assert_eq!(
            decode(&bent, "test").unwrap_err().kind,
            Some(ErrorKind::AuthenticationFailed)
        );
    }

    #[test]
    fn test_truncated_input() {
        let envelope = encode(b"hello", "test").unwrap();

        // Anything shorter than header+MAC (but non-empty, with a valid
        // version byte) is malformed.
        for len in 1..HEADER_LEN + MAC_LEN {
            let err = decode(&envelope[..len], "test").expect_err("expected truncation error");
            assert_eq!(err.kind, Some(ErrorKind::TruncatedInput));
        }
    }

    #[test]
    fn test_all_byte_values() {
        let plaintext: Vec<u8> = (0..=255).collect();

        let envelope = encode(&plaintext, "test").unwrap();
        let decrypted = decode(&envelope, "test").unwrap();

        assert_eq!(plaintext, decrypted);
    }

    #[test]
    fn test_large_plaintext() {
        let plaintext = vec![0x42u8; 128 * 1024]; // 128KB

        let envelope = encode(&plaintext, "test").unwrap();
        let decrypted = decode(&envelope, "test").unwrap();

        assert_eq!(plaintext, decrypted);
    }
}
