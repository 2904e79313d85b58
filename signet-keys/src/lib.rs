//! Signet Keys – installation identity and signing primitives

pub mod error;
pub mod keystore;
pub mod manager;
pub mod rsa;
pub mod signing;

pub use error::{KeyError, Result};

pub use keystore::{FileKeyStore, KeyStore};
pub use manager::KeyManager;
pub use rsa::{is_valid_public_key_pem, RsaKeyPair, RSA_KEY_BITS};
pub use signing::{sha256_hex, sign, verify};
