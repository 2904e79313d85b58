//! RSA key pair management for the installation identity.
//!
//! Every installation owns exactly one RSA-2048 key pair. The private half
//! signs outbound request bodies; the public half is registered with the
//! server during the installation handshake.

use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;

use crate::error::{KeyError, Result};

/// Key size used for installation identities. The server contract requires
/// RSA-2048 with public exponent 65537.
pub const RSA_KEY_BITS: u32 = 2048;

/// An RSA key pair held as a single private key object; the public half is
/// derived from it on demand.
#[derive(Clone)]
pub struct RsaKeyPair {
    private: PKey<Private>,
}

impl RsaKeyPair {
    /// Generate a fresh 2048-bit RSA key pair.
    ///
    /// Each call produces a cryptographically distinct pair; generation
    /// never reuses key material.
    pub fn generate() -> Result<Self> {
        let rsa = Rsa::generate(RSA_KEY_BITS)
            .map_err(|e| KeyError::KeyGeneration(format!("RSA generation failed: {e}")))?;
        let private = PKey::from_rsa(rsa)
            .map_err(|e| KeyError::KeyGeneration(format!("PKey conversion failed: {e}")))?;
        Ok(Self { private })
    }

    /// Rebuild a key pair from a PKCS#8 PEM-encoded private key.
    pub fn from_private_key_pem(pem: &str) -> Result<Self> {
        let private = PKey::private_key_from_pem(pem.as_bytes())
            .map_err(|e| KeyError::InvalidKeyFormat(format!("unreadable private key PEM: {e}")))?;
        if private.rsa().is_err() {
            return Err(KeyError::InvalidKeyFormat(
                "private key PEM does not contain an RSA key".to_string(),
            ));
        }
        Ok(Self { private })
    }

    /// The private key as a PKCS#8 PEM string.
    pub fn private_key_pem(&self) -> Result<String> {
        let pem = self.private.private_key_to_pem_pkcs8()?;
        String::from_utf8(pem)
            .map_err(|e| KeyError::InvalidKeyFormat(format!("non-UTF8 PEM output: {e}")))
    }

    /// The public key as a SubjectPublicKeyInfo PEM string. This is the
    /// exact representation registered with the server.
    pub fn public_key_pem(&self) -> Result<String> {
        let pem = self.private.public_key_to_pem()?;
        String::from_utf8(pem)
            .map_err(|e| KeyError::InvalidKeyFormat(format!("non-UTF8 PEM output: {e}")))
    }

    pub(crate) fn pkey(&self) -> &PKey<Private> {
        &self.private
    }
}

/// Whether `pem` parses as a SubjectPublicKeyInfo public key.
pub fn is_valid_public_key_pem(pem: &str) -> bool {
    openssl::pkey::PKey::public_key_from_pem(pem.as_bytes()).is_ok()
}

impl std::fmt::Debug for RsaKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never expose key material through Debug output
        f.debug_struct("RsaKeyPair")
            .field("bits", &self.private.bits())
            .finish()
    }
}
