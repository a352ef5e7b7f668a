//! Cryptographic operations for the ledger
//!
//! This module provides:
//! - Ed25519 key pair generation (PEM), signing, and verification
//! - Canonical encoding + SHA-256 hashing for blocks
//! - HMAC-SHA256 fingerprinting of raw identity markers
//!
//! # Canonical encoding
//!
//! Values are converted to a `serde_json::Value` first. Its object type is
//! ordered by key, so the compact JSON written from it has sorted keys at every
//! level regardless of struct field order or map insertion order. Hashes and
//! signatures are computed over those bytes.

use crate::{Error, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Ed25519 key pair as PEM strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// SPKI `PUBLIC KEY` PEM
    pub public_key: String,

    /// PKCS#8 `PRIVATE KEY` PEM (USE WITH CAUTION - should be protected)
    pub private_key: String,
}

/// Generate a new random key pair
pub fn generate_key_pair() -> Result<KeyPair> {
    let signing_key = SigningKey::from_bytes(&rand::random::<[u8; 32]>());
    key_pair_from_signing_key(&signing_key)
}

/// Create from seed (32 bytes) - deterministic generation
pub fn key_pair_from_seed(seed: &[u8; 32]) -> Result<KeyPair> {
    key_pair_from_signing_key(&SigningKey::from_bytes(seed))
}

fn key_pair_from_signing_key(signing_key: &SigningKey) -> Result<KeyPair> {
    let private_key = signing_key
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| Error::Crypto(format!("Failed to encode private key: {}", e)))?;
    let public_key = signing_key
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| Error::Crypto(format!("Failed to encode public key: {}", e)))?;

    Ok(KeyPair {
        public_key,
        private_key: private_key.as_str().to_owned(),
    })
}

/// Canonical bytes of `value` (sorted-key compact JSON)
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&value)?)
}

/// SHA-256 of the canonical encoding, hex-encoded
pub fn hash_object<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(hex::encode(hash_bytes(&canonical_bytes(value)?)))
}

/// Hash arbitrary bytes using SHA-256
pub fn hash_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// HMAC-SHA256 keyed by `secret` over `raw_fingerprint`, hex-encoded
///
/// The output is the only form of a fingerprint the ledger ever stores.
pub fn hmac_fingerprint(raw_fingerprint: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(raw_fingerprint.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Sign the canonical encoding of `payload`, returning base64
pub fn sign_payload<T: Serialize + ?Sized>(payload: &T, private_key_pem: &str) -> Result<String> {
    let signing_key = SigningKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| Error::Crypto(format!("Invalid private key: {}", e)))?;
    let signature = signing_key.sign(&canonical_bytes(payload)?);
    Ok(BASE64.encode(signature.to_bytes()))
}

/// Verify a base64 signature over the canonical encoding of `payload`
///
/// Malformed signatures, keys, or payloads verify as `false`.
pub fn verify_signature<T: Serialize + ?Sized>(
    payload: &T,
    signature: &str,
    public_key_pem: &str,
) -> bool {
    let Ok(message) = canonical_bytes(payload) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_public_key_pem(public_key_pem) else {
        return false;
    };
    let Ok(raw) = BASE64.decode(signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&raw) else {
        return false;
    };

    verifying_key.verify(&message, &signature).is_ok()
}
