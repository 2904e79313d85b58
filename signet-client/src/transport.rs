//! Transport abstraction and the raw request/response envelopes.
//!
//! The transport is an external collaborator: any HTTP client that can
//! send the request body bytes untouched and hand back the response body
//! bytes untouched. Byte-exactness on both legs is a hard requirement;
//! a transport that reformats bodies breaks signature verification.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Header carrying the base64 signature over the request body.
pub const CLIENT_SIGNATURE_HEADER: &str = "X-Signet-Client-Signature";
/// Header carrying the server's base64 signature over the response body.
pub const SERVER_SIGNATURE_HEADER: &str = "X-Signet-Server-Signature";
/// Header carrying the current credential (installation or session token).
pub const CLIENT_AUTH_HEADER: &str = "X-Signet-Client-Auth";
/// Header carrying a unique id per outbound call, for server-side tracing.
pub const CLIENT_REQUEST_ID_HEADER: &str = "X-Signet-Client-Request-Id";

/// HTTP methods used by the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// An outbound request. The body bytes are the exact signing input; they
/// must reach the wire unmodified. Envelopes are constructed once per call
/// and never re-serialized after construction.
#[derive(Debug, Clone)]
pub struct RequestEnvelope {
    pub method: Method,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl RequestEnvelope {
    pub fn new(method: Method, path: impl Into<String>, body: Bytes) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path, Bytes::new())
    }

    pub fn post(path: impl Into<String>, body: Bytes) -> Self {
        Self::new(Method::Post, path, body)
    }

    pub fn put(path: impl Into<String>, body: Bytes) -> Self {
        Self::new(Method::Put, path, body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path, Bytes::new())
    }

    /// Set a header, replacing any existing value under the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An inbound response. The body holds the exact bytes received from the
/// wire; verification runs over them before any parsing.
#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseEnvelope {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the server rejected the presented credential.
    pub fn is_authorization_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Network-level failures from the transport collaborator.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// External collaborator sending envelopes over the wire.
///
/// Implementations must preserve request body bytes exactly as given and
/// return response body bytes exactly as received.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &RequestEnvelope,
    ) -> std::result::Result<ResponseEnvelope, TransportError>;
}
