//! Signing and verification primitives.
//!
//! Signatures cover the exact byte sequence handed in; any transformation
//! between signing and transmission (or receipt and verification) breaks
//! the match. Signing is SHA-256 over the input followed by an RSA
//! PKCS#1 v1.5 signature, base64-encoded for transport in a header.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::sign::{Signer, Verifier};
use sha2::{Digest, Sha256};

use crate::error::{KeyError, Result};
use crate::rsa::RsaKeyPair;

/// Sign `payload` with the key pair's private half.
///
/// Deterministic: identical (key, payload) inputs always yield an
/// identical signature. PKCS#1 v1.5 padding carries no randomness.
pub fn sign(keypair: &RsaKeyPair, payload: &[u8]) -> Result<String> {
    let mut signer = Signer::new(MessageDigest::sha256(), keypair.pkey())
        .map_err(|e| KeyError::SigningError(format!("signer init failed: {e}")))?;
    signer
        .update(payload)
        .map_err(|e| KeyError::SigningError(format!("digest update failed: {e}")))?;
    let signature = signer
        .sign_to_vec()
        .map_err(|e| KeyError::SigningError(format!("signature generation failed: {e}")))?;
    Ok(BASE64.encode(signature))
}

/// Check a base64-encoded signature against `payload` using a PEM-encoded
/// public key.
///
/// Total: malformed signature encoding, malformed public key, a signature
/// from a different key, or a signature over different bytes all yield
/// `false`. Returns `true` only when the signature was produced by the
/// matching private key over exactly these bytes.
pub fn verify(public_key_pem: &str, payload: &[u8], signature_b64: &str) -> bool {
    let signature = match BASE64.decode(signature_b64) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };
    let public_key = match PKey::public_key_from_pem(public_key_pem.as_bytes()) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let mut verifier = match Verifier::new(MessageDigest::sha256(), &public_key) {
        Ok(v) => v,
        Err(_) => return false,
    };
    if verifier.update(payload).is_err() {
        return false;
    }
    verifier.verify(&signature).unwrap_or(false)
}

/// SHA-256 hex fingerprint of a string.
///
/// Used to correlate sensitive values in logs without exposing them; the
/// digest is not reversible.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
