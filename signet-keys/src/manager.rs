//! Key manager owning the installation identity and the server trust anchor.

use std::sync::Arc;

use signet_common::logging::Logger;

use crate::error::{KeyError, Result};
use crate::keystore::KeyStore;
use crate::rsa::RsaKeyPair;
use crate::signing::sha256_hex;

/// Keystore entry holding the installation's private key PEM.
const CLIENT_KEY_ENTRY: &str = "client_key.pem";
/// Keystore entry holding the server's public key PEM (trust anchor).
const SERVER_KEY_ENTRY: &str = "server_key.pem";

/// Owns the installation's RSA key pair and the server public key obtained
/// during the installation handshake.
///
/// Corrupt persisted key material is fatal for the installation: the
/// manager never regenerates keys behind the caller's back, since a server
/// that trusts the old public key would no longer recognize the caller.
/// The caller must re-run the installation handshake to mint a new
/// identity.
pub struct KeyManager {
    keypair: Option<RsaKeyPair>,
    server_public_key: Option<String>,
    logger: Arc<Logger>,
}

impl KeyManager {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self {
            keypair: None,
            server_public_key: None,
            logger,
        }
    }

    /// Generate a fresh installation identity, replacing any held key pair.
    pub fn generate_keypair(&mut self) -> Result<&RsaKeyPair> {
        let keypair = RsaKeyPair::generate()?;
        self.logger.info(format!(
            "installation keypair generated, public key fingerprint {}",
            sha256_hex(&keypair.public_key_pem()?)
        ));
        Ok(self.keypair.insert(keypair))
    }

    /// The current installation key pair, if one has been generated or loaded.
    pub fn current_keypair(&self) -> Option<&RsaKeyPair> {
        self.keypair.as_ref()
    }

    /// Record the server public key delivered by the installation handshake.
    ///
    /// The trust anchor must not silently change: storing a key that
    /// differs from an already-held one fails with `TrustAnchorConflict`.
    /// An explicit [`reset_trust_anchor`](Self::reset_trust_anchor) is the
    /// re-installation path.
    pub fn set_server_public_key(&mut self, pem: &str) -> Result<()> {
        if !crate::rsa::is_valid_public_key_pem(pem) {
            return Err(KeyError::InvalidKeyFormat(
                "server public key is not valid PEM".to_string(),
            ));
        }
        if let Some(existing) = &self.server_public_key {
            if existing != pem {
                return Err(KeyError::TrustAnchorConflict(
                    "server public key differs from the stored trust anchor".to_string(),
                ));
            }
            return Ok(());
        }
        self.logger.info(format!(
            "server public key pinned, fingerprint {}",
            sha256_hex(pem)
        ));
        self.server_public_key = Some(pem.to_string());
        Ok(())
    }

    /// The pinned server public key, if installation has completed.
    pub fn server_public_key(&self) -> Option<&str> {
        self.server_public_key.as_deref()
    }

    /// Drop the pinned server key so a re-installation can pin a new one.
    pub fn reset_trust_anchor(&mut self) {
        self.logger.warn("trust anchor reset, re-installation required");
        self.server_public_key = None;
    }

    /// Persist the identity and trust anchor to durable storage.
    pub fn persist(&self, store: &dyn KeyStore) -> Result<()> {
        let keypair = self
            .keypair
            .as_ref()
            .ok_or_else(|| KeyError::KeyNotFound("no installation keypair held".to_string()))?;
        let private_pem = keypair.private_key_pem()?;
        store
            .persist(CLIENT_KEY_ENTRY, private_pem.as_bytes())
            .map_err(|e| KeyError::KeyStoreError(format!("persisting client key: {e}")))?;
        if let Some(server_key) = &self.server_public_key {
            store
                .persist(SERVER_KEY_ENTRY, server_key.as_bytes())
                .map_err(|e| KeyError::KeyStoreError(format!("persisting server key: {e}")))?;
        }
        self.logger.debug("key material persisted");
        Ok(())
    }

    /// Load the identity and trust anchor from durable storage.
    ///
    /// Returns `false` when no identity has been persisted yet. Unreadable
    /// or unparsable stored material yields `CorruptKeyStore` and leaves
    /// the manager unchanged.
    pub fn load(&mut self, store: &dyn KeyStore) -> Result<bool> {
        let private_bytes = match store
            .load(CLIENT_KEY_ENTRY)
            .map_err(|e| KeyError::KeyStoreError(format!("loading client key: {e}")))?
        {
            Some(bytes) => bytes,
            None => return Ok(false),
        };
        let private_pem = String::from_utf8(private_bytes).map_err(|_| {
            KeyError::CorruptKeyStore("stored client key is not UTF-8".to_string())
        })?;
        let keypair = RsaKeyPair::from_private_key_pem(&private_pem).map_err(|e| {
            KeyError::CorruptKeyStore(format!("stored client key is unreadable: {e}"))
        })?;

        let server_public_key = match store
            .load(SERVER_KEY_ENTRY)
            .map_err(|e| KeyError::KeyStoreError(format!("loading server key: {e}")))?
        {
            Some(bytes) => {
                let pem = String::from_utf8(bytes).map_err(|_| {
                    KeyError::CorruptKeyStore("stored server key is not UTF-8".to_string())
                })?;
                if !crate::rsa::is_valid_public_key_pem(&pem) {
                    return Err(KeyError::CorruptKeyStore(
                        "stored server key is unreadable".to_string(),
                    ));
                }
                Some(pem)
            }
            None => None,
        };

        self.keypair = Some(keypair);
        self.server_public_key = server_public_key;
        self.logger.info("installation identity loaded from keystore");
        Ok(true)
    }
}
