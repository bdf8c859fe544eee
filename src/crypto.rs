//! Secret encryption for stored provider credentials.
//!
//! Values in `integration_secrets.encrypted_value` are AES-256-GCM sealed
//! with additional authenticated data derived from the owning integration
//! and the secret type, so a ciphertext copied onto another row fails
//! authentication instead of decrypting.
//!
//! Wire format: one version byte, then the 12-byte nonce, then ciphertext
//! with the GCM tag appended. Payloads that do not start with the version
//! byte are rows written before encryption existed and are returned as-is.

#![allow(deprecated)]

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
};
use thiserror::Error;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION_ENCRYPTED: u8 = 0x01;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
// version byte + nonce + tag of an empty message
const MIN_ENCRYPTED_LEN: usize = 1 + NONCE_LEN + TAG_LEN;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key must be 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("ciphertext too short for the versioned format")]
    InvalidFormat,
    #[error("empty ciphertext")]
    EmptyCiphertext,
}

/// Key material that wipes itself when dropped.
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct ZeroizingKey(Vec<u8>);

pub type CryptoKey = ZeroizingKey;

impl CryptoKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength(bytes.len()));
        }
        Ok(ZeroizingKey(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

fn cipher_for(key: &CryptoKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

/// Seals `plaintext` under `key`, binding it to `aad`. Each call draws a
/// fresh random nonce.
pub fn encrypt_bytes(
    key: &CryptoKey,
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher_for(key)
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(1 + NONCE_LEN + sealed.len());
    out.push(VERSION_ENCRYPTED);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Opens a payload produced by [`encrypt_bytes`]. Legacy rows without the
/// version marker come back unchanged so pre-encryption secrets stay
/// readable until the next connect overwrites them.
pub fn decrypt_bytes(
    key: &CryptoKey,
    aad: &[u8],
    payload: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let Some((&version, rest)) = payload.split_first() else {
        return Err(CryptoError::EmptyCiphertext);
    };

    if version != VERSION_ENCRYPTED {
        return Ok(payload.to_vec());
    }
    if payload.len() < MIN_ENCRYPTED_LEN {
        return Err(CryptoError::InvalidFormat);
    }

    let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);
    cipher_for(key)
        .decrypt(Nonce::from_slice(nonce_bytes), Payload { msg: sealed, aad })
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// Whether a stored payload carries the versioned encrypted format.
pub fn is_encrypted_payload(payload: &[u8]) -> bool {
    payload.len() >= MIN_ENCRYPTED_LEN && payload[0] == VERSION_ENCRYPTED
}

/// AAD binding a secret to its owning integration and secret type. Moving a
/// ciphertext row to another integration makes it undecryptable.
fn secret_aad(integration_id: Uuid, secret_type: &str) -> String {
    format!("{}|{}", integration_id, secret_type)
}

/// Encrypt a credential string for storage on an integration
pub fn encrypt_secret(
    key: &CryptoKey,
    integration_id: Uuid,
    secret_type: &str,
    value: &str,
) -> Result<Vec<u8>, CryptoError> {
    let aad = secret_aad(integration_id, secret_type);
    encrypt_bytes(key, aad.as_bytes(), value.as_bytes())
}

/// Decrypt a stored credential string for an integration
pub fn decrypt_secret(
    key: &CryptoKey,
    integration_id: Uuid,
    secret_type: &str,
    ciphertext: &[u8],
) -> Result<String, CryptoError> {
    let aad = secret_aad(integration_id, secret_type);
    let bytes = decrypt_bytes(key, aad.as_bytes(), ciphertext)?;
    String::from_utf8(bytes)
        .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CryptoKey {
        CryptoKey::new(vec![7u8; 32]).unwrap()
    }

    #[test]
    fn roundtrip_recovers_the_plaintext() {
        let sealed = encrypt_bytes(&key(), b"aad", b"canvas-token").unwrap();

        assert_ne!(sealed, b"canvas-token");
        assert_eq!(decrypt_bytes(&key(), b"aad", &sealed).unwrap(), b"canvas-token");
    }

    #[test]
    fn empty_plaintext_roundtrips() {
        let sealed = encrypt_bytes(&key(), b"aad", b"").unwrap();

        assert_eq!(sealed.len(), MIN_ENCRYPTED_LEN);
        assert_eq!(decrypt_bytes(&key(), b"aad", &sealed).unwrap(), b"");
    }

    #[test]
    fn wrong_aad_fails_authentication() {
        let sealed = encrypt_bytes(&key(), b"id-1|access_token", b"value").unwrap();

        assert!(decrypt_bytes(&key(), b"id-2|access_token", &sealed).is_err());
    }

    #[test]
    fn flipped_ciphertext_bit_fails_authentication() {
        let mut sealed = encrypt_bytes(&key(), b"aad", b"value").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;

        assert!(decrypt_bytes(&key(), b"aad", &sealed).is_err());
    }

    #[test]
    fn nonces_never_repeat_across_calls() {
        let first = encrypt_bytes(&key(), b"aad", b"value").unwrap();
        let second = encrypt_bytes(&key(), b"aad", b"value").unwrap();

        assert_ne!(first[1..1 + NONCE_LEN], second[1..1 + NONCE_LEN]);
        assert_eq!(decrypt_bytes(&key(), b"aad", &first).unwrap(), b"value");
        assert_eq!(decrypt_bytes(&key(), b"aad", &second).unwrap(), b"value");
    }

    #[test]
    fn unversioned_payload_passes_through() {
        let legacy = b"raw-legacy-token".to_vec();

        assert_eq!(decrypt_bytes(&key(), b"aad", &legacy).unwrap(), legacy);
        assert!(!is_encrypted_payload(&legacy));
    }

    #[test]
    fn sealed_payload_is_detected_as_encrypted() {
        let sealed = encrypt_bytes(&key(), b"aad", b"value").unwrap();

        assert!(is_encrypted_payload(&sealed));
    }

    #[test]
    fn truncated_versioned_payload_is_invalid() {
        let stub = vec![VERSION_ENCRYPTED, 0xAB, 0xCD];

        assert!(matches!(
            decrypt_bytes(&key(), b"aad", &stub),
            Err(CryptoError::InvalidFormat)
        ));
    }

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(
            decrypt_bytes(&key(), b"aad", b""),
            Err(CryptoError::EmptyCiphertext)
        ));
    }

    #[test]
    fn secret_is_bound_to_integration_and_type() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let sealed = encrypt_secret(&key(), a, "access_token", "tok-123").unwrap();

        assert_eq!(
            decrypt_secret(&key(), a, "access_token", &sealed).unwrap(),
            "tok-123"
        );
        assert!(decrypt_secret(&key(), b, "access_token", &sealed).is_err());
        assert!(decrypt_secret(&key(), a, "canvas_url", &sealed).is_err());
    }

    #[test]
    fn legacy_plaintext_survives_decrypt_secret() {
        let read = decrypt_secret(&key(), Uuid::new_v4(), "access_token", b"plain-token");

        assert_eq!(read.unwrap(), "plain-token");
    }

    #[test]
    fn key_must_be_exactly_32_bytes() {
        assert!(matches!(
            CryptoKey::new(vec![0u8; 16]),
            Err(CryptoError::InvalidKeyLength(16))
        ));
        assert!(matches!(
            CryptoKey::new(vec![0u8; 64]),
            Err(CryptoError::InvalidKeyLength(64))
        ));
        assert!(CryptoKey::new(vec![0u8; 32]).is_ok());
    }
}
