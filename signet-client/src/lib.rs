//! Signet Client – authenticated request layer for the signed banking API
//!
//! Every API call flows through the [`RequestPipeline`], which attaches
//! the session credential, signs the request body for mutating calls,
//! verifies the server's response signature against the pinned server
//! key, and transparently refreshes an expired session exactly once.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod transport;

pub use config::ClientConfig;
pub use error::{ApiError, HandshakeStage, Result};
pub use pipeline::{RequestPipeline, SignOptions};
pub use session::{
    Installation, RequestOptions, Session, SessionManager, SessionState, DEVICE_PATH,
    INSTALLATION_PATH, SESSION_PATH,
};
pub use transport::{
    Method, RequestEnvelope, ResponseEnvelope, Transport, TransportError, CLIENT_AUTH_HEADER,
    CLIENT_REQUEST_ID_HEADER, CLIENT_SIGNATURE_HEADER, SERVER_SIGNATURE_HEADER,
};
