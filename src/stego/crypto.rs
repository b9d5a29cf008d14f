// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Password-based encryption for protected containers.
//!
//! A single Argon2id pass over the password and the container's random
//! 16-byte salt yields 44 bytes of key material: a 32-byte AES-256 key
//! followed by a 12-byte AES-GCM-SIV nonce. Only the salt travels in the
//! container header.
//!
//! AES-256-GCM-SIV appends a 16-byte authentication tag; a tag mismatch is
//! reported as [`StegoError::AuthenticationFailed`] and no plaintext is
//! returned. All key material lives in [`Zeroizing`] buffers and is wiped
//! when dropped.

use aes_gcm_siv::aead::Aead;
use aes_gcm_siv::{Aes256GcmSiv, KeyInit, Nonce};
use argon2::Argon2;
use zeroize::Zeroizing;

use crate::stego::error::StegoError;

/// Argon2 salt length in bytes (stored in the container header).
pub const SALT_LEN: usize = 16;
/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// AES-GCM-SIV nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// AES-GCM-SIV authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Key and nonce derived from one password/salt pair.
struct SessionKey {
    material: Zeroizing<[u8; KEY_LEN + NONCE_LEN]>,
}

impl SessionKey {
    fn key(&self) -> &[u8] {
        &self.material[..KEY_LEN]
    }

    fn nonce(&self) -> &Nonce {
        Nonce::from_slice(&self.material[KEY_LEN..])
    }

    fn cipher(&self) -> Result<Aes256GcmSiv, StegoError> {
        Aes256GcmSiv::new_from_slice(self.key()).map_err(|_| StegoError::AuthenticationFailed)
    }
}

/// Derive the session key (AES key + nonce) from password and salt.
///
/// This is the deliberately slow step of a decode.
fn derive_session_key(password: &str, salt: &[u8; SALT_LEN]) -> Result<SessionKey, StegoError> {
    let mut material = Zeroizing::new([0u8; KEY_LEN + NONCE_LEN]);
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut *material)
        .map_err(|_| StegoError::AuthenticationFailed)?;
    Ok(SessionKey { material })
}

/// Draw a fresh random salt.
pub fn random_salt() -> [u8; SALT_LEN] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Encrypt `plaintext` under a key derived from `password` and `salt`.
///
/// Returns `ciphertext || tag` (`plaintext.len() + TAG_LEN` bytes).
pub fn encrypt(
    plaintext: &[u8],
    password: &str,
    salt: &[u8; SALT_LEN],
) -> Result<Vec<u8>, StegoError> {
    let session = derive_session_key(password, salt)?;
    session
        .cipher()?
        .encrypt(session.nonce(), plaintext)
        .map_err(|_| StegoError::PayloadTooLarge { needed: plaintext.len(), available: 0 })
}

/// Authenticate and decrypt `ciphertext || tag`.
///
/// # Errors
/// [`StegoError::AuthenticationFailed`] on a wrong password or tampered
/// ciphertext. No partial plaintext is ever returned.
pub fn decrypt(
    ciphertext: &[u8],
    password: &str,
    salt: &[u8; SALT_LEN],
) -> Result<Zeroizing<Vec<u8>>, StegoError> {
    if ciphertext.len() < TAG_LEN {
        return Err(StegoError::AuthenticationFailed);
    }
    let session = derive_session_key(password, salt)?;
    session
        .cipher()?
        .decrypt(session.nonce(), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| StegoError::AuthenticationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let msg = b"Hello, steganography!";
        let salt = random_salt();
        let ct = encrypt(msg, "secret123", &salt).unwrap();
        assert_eq!(ct.len(), msg.len() + TAG_LEN);
        let pt = decrypt(&ct, "secret123", &salt).unwrap();
        assert_eq!(pt.as_slice(), msg);
    }

    #[test]
    fn wrong_password_fails() {
        let salt = random_salt();
        let ct = encrypt(b"secret message", "correct", &salt).unwrap();
        assert!(matches!(decrypt(&ct, "wrong", &salt), Err(StegoError::AuthenticationFailed)));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let salt = [7u8; SALT_LEN];
        let mut ct = encrypt(b"payload", "pw", &salt).unwrap();
        ct[0] ^= 0x01;
        assert!(matches!(decrypt(&ct, "pw", &salt), Err(StegoError::AuthenticationFailed)));
    }

    #[test]
    fn truncated_ciphertext_fails() {
        assert!(matches!(
            decrypt(&[0u8; TAG_LEN - 1], "pw", &[0u8; SALT_LEN]),
            Err(StegoError::AuthenticationFailed)
        ));
    }

    #[test]
    fn empty_message_works() {
        let salt = random_salt();
        let ct = encrypt(b"", "pass", &salt).unwrap();
        assert_eq!(ct.len(), TAG_LEN);
        assert!(decrypt(&ct, "pass", &salt).unwrap().is_empty());
    }

    #[test]
    fn session_key_differs_by_salt() {
        let a = derive_session_key("pass", &[0u8; SALT_LEN]).unwrap();
        let b = derive_session_key("pass", &[1u8; SALT_LEN]).unwrap();
        assert_ne!(*a.material, *b.material);
    }

    #[test]
    fn session_key_deterministic() {
        let a = derive_session_key("mypass", &[3u8; SALT_LEN]).unwrap();
        let b = derive_session_key("mypass", &[3u8; SALT_LEN]).unwrap();
        assert_eq!(*a.material, *b.material);
    }

    #[test]
    fn ciphertext_differs_per_salt() {
        let ct1 = encrypt(b"same message", "pass", &random_salt()).unwrap();
        let ct2 = encrypt(b"same message", "pass", &random_salt()).unwrap();
        assert_ne!(ct1, ct2);
    }
}
