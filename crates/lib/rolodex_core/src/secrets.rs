//! AES-256-GCM encryption for tenant secrets.
//!
//! The Okta API token and Graph client secret are encrypted before they are
//! written to `tenant_settings`. The 32-byte key is derived from the
//! configured passphrase with SHA-256; output is base64
//! `nonce || ciphertext || tag` so it fits a TEXT column.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::settings::SettingsError;

/// Nonce size for AES-256-GCM (12 bytes).
const NONCE_SIZE: usize = 12;
/// AES-256 key size (32 bytes).
const KEY_SIZE: usize = 32;
/// GCM tag size (16 bytes).
const TAG_SIZE: usize = 16;

/// Derive a 32-byte key from the configured passphrase using SHA-256.
fn derive_key(passphrase: &str) -> [u8; KEY_SIZE] {
    let digest = Sha256::digest(passphrase.as_bytes());
    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&digest);
    key
}

/// Encrypt a secret for storage.
pub fn encrypt(plaintext: &str, encryption_key: &str) -> Result<String, SettingsError> {
    let key_bytes = derive_key(encryption_key);
    let cipher = Aes256Gcm::new_from_slice(&key_bytes)
        .map_err(|e| SettingsError::Encryption(format!("Key init failed: {e}")))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| SettingsError::Encryption(format!("Encryption failed: {e}")))?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(&combined))
}

/// Decrypt a stored secret.
pub fn decrypt(encrypted_b64: &str, encryption_key: &str) -> Result<String, SettingsError> {
    let combined = STANDARD
        .decode(encrypted_b64)
        .map_err(|e| SettingsError::Encryption(format!("Base64 decode failed: {e}")))?;

    if combined.len() < NONCE_SIZE + TAG_SIZE {
        return Err(SettingsError::Encryption("Ciphertext too short".into()));
    }

    let key_bytes = derive_key(encryption_key);
    let cipher = Aes256Gcm::new_from_slice(&key_bytes)
        .map_err(|e| SettingsError::Encryption(format!("Key init failed: {e}")))?;

    let nonce = Nonce::from_slice(&combined[..NONCE_SIZE]);
    let plaintext = cipher
        .decrypt(nonce, &combined[NONCE_SIZE..])
        .map_err(|e| SettingsError::Encryption(format!("Decryption failed: {e}")))?;

    String::from_utf8(plaintext)
        .map_err(|e| SettingsError::Encryption(format!("UTF-8 decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let key = "rolodex-settings-key";
        let plaintext = "00Txyz-okta-api-token";
        let encrypted = encrypt(plaintext, key).unwrap();
        assert_ne!(encrypted, plaintext);
        assert_eq!(decrypt(&encrypted, key).unwrap(), plaintext);
    }

    #[test]
    fn wrong_key_fails() {
        let encrypted = encrypt("client-secret", "correct-key").unwrap();
        assert!(decrypt(&encrypted, "wrong-key").is_err());
    }

    #[test]
    fn empty_plaintext() {
        let key = "rolodex-settings-key";
        let encrypted = encrypt("", key).unwrap();
        assert_eq!(decrypt(&encrypted, key).unwrap(), "");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let key = "rolodex-settings-key";
        let a = encrypt("same-secret", key).unwrap();
        let b = encrypt("same-secret", key).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn truncated_ciphertext_fails() {
        assert!(decrypt("c2hvcnQ=", "key").is_err());
    }
}
