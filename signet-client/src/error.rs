use thiserror::Error;

use crate::transport::TransportError;
use signet_keys::KeyError;

/// Handshake steps, in their strict execution order. Carried on
/// [`ApiError::Handshake`] so callers can tell which step aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    Installation,
    DeviceRegistration,
    SessionStart,
}

impl std::fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HandshakeStage::Installation => "installation",
            HandshakeStage::DeviceRegistration => "device registration",
            HandshakeStage::SessionStart => "session start",
        };
        f.write_str(name)
    }
}

/// Error types surfaced by the request layer. Every failure class is
/// distinguishable by the caller; none are swallowed inside the core.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key material missing or corrupt. Fatal; requires re-installation.
    #[error("Identity error: {0}")]
    Identity(#[from] KeyError),

    /// Installation/device/session creation failed. Partial handshake
    /// state is never reusable; retry the whole handshake.
    #[error("Handshake failed during {stage}: {reason}")]
    Handshake {
        stage: HandshakeStage,
        reason: String,
    },

    /// The server rejected the session token. Recoverable exactly once
    /// via refresh-and-retry.
    #[error("Authorization rejected (status {status}): {reason}")]
    Authorization { status: u16, reason: String },

    /// The response signature did not match the server public key. Fatal
    /// by default; retrying does not fix a tampered channel.
    #[error("Response signature verification failed: {context}")]
    SignatureVerification { context: String },

    /// Network-level failure, propagated as-is. No retry or backoff
    /// happens at this layer beyond the single session refresh.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a payload this client cannot interpret.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ApiError {
    /// Whether this error should trigger the single session refresh-and-retry.
    pub fn is_authorization(&self) -> bool {
        matches!(self, ApiError::Authorization { .. })
    }
}

/// Result type for signet-client operations
pub type Result<T> = std::result::Result<T, ApiError>;
