use thiserror::Error;

/// Error types for the signet-keys crate
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Key generation error: {0}")]
    KeyGeneration(String),

    #[error("Crypto error: {0}")]
    CryptoError(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Corrupt key store: {0}")]
    CorruptKeyStore(String),

    #[error("Key store error: {0}")]
    KeyStoreError(String),

    #[error("Trust anchor conflict: {0}")]
    TrustAnchorConflict(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<openssl::error::ErrorStack> for KeyError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        KeyError::CryptoError(err.to_string())
    }
}

/// Result type for signet-keys operations
pub type Result<T> = std::result::Result<T, KeyError>;
