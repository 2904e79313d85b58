//! The request pipeline every API call passes through.
//!
//! Attaches the session credential, signs the body for mutating calls,
//! sends the envelope, verifies the server's response signature, and
//! wraps the whole call in the single refresh-and-retry.

use std::sync::Arc;

use uuid::Uuid;

use signet_common::logging::{Component, Logger};
use signet_common::redact::redact_sensitive;
use signet_keys::{sign, verify, RsaKeyPair};

use crate::error::{ApiError, Result};
use crate::session::SessionManager;
use crate::transport::{
    RequestEnvelope, ResponseEnvelope, CLIENT_AUTH_HEADER, CLIENT_REQUEST_ID_HEADER,
    CLIENT_SIGNATURE_HEADER, SERVER_SIGNATURE_HEADER,
};

/// Per-call options. Mutating operations set `sign`; reads may skip the
/// body signature but responses are always verified.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignOptions {
    pub sign: bool,
}

impl SignOptions {
    pub fn signed() -> Self {
        Self { sign: true }
    }

    pub fn unsigned() -> Self {
        Self { sign: false }
    }
}

/// Compute the body signature and attach it as a request header.
///
/// Signs the raw body bytes only; method, path and headers are outside
/// the signing contract.
pub(crate) fn attach_signature(
    envelope: &mut RequestEnvelope,
    keypair: &RsaKeyPair,
) -> Result<()> {
    let signature = sign(keypair, &envelope.body).map_err(ApiError::Identity)?;
    envelope.set_header(CLIENT_SIGNATURE_HEADER, signature);
    Ok(())
}

/// Check the server signature header against the exact response body.
///
/// A missing header or a failed check is a distinct, fatal-by-default
/// error class; it signals a protocol mismatch or a compromised channel
/// and is never retried.
pub(crate) fn verify_response(
    server_public_key: &str,
    response: &ResponseEnvelope,
) -> Result<()> {
    let signature = response.header(SERVER_SIGNATURE_HEADER).ok_or_else(|| {
        ApiError::SignatureVerification {
            context: "response signature header missing".to_string(),
        }
    })?;
    if !verify(server_public_key, &response.body, signature) {
        return Err(ApiError::SignatureVerification {
            context: format!(
                "signature mismatch over {} response body bytes",
                response.body.len()
            ),
        });
    }
    Ok(())
}

/// The single entry point for authenticated API calls.
pub struct RequestPipeline {
    session: Arc<SessionManager>,
    logger: Arc<Logger>,
}

impl RequestPipeline {
    pub fn new(session: Arc<SessionManager>, logger: Arc<Logger>) -> Self {
        Self {
            session,
            logger: Arc::new(logger.with_component(Component::Api)),
        }
    }

    /// Execute one call. An authorization failure triggers exactly one
    /// silent session refresh followed by exactly one retry of the
    /// original envelope; the retry re-signs the identical body bytes.
    ///
    /// Once a signed request has been transmitted it must not be treated
    /// as cancellable; abandon the future for reads only, and poll the
    /// outcome of a mutating call rather than assume non-delivery.
    pub async fn execute(
        &self,
        envelope: RequestEnvelope,
        options: SignOptions,
    ) -> Result<ResponseEnvelope> {
        self.session
            .with_session_refresh(|| self.execute_once(envelope.clone(), options))
            .await
    }

    async fn execute_once(
        &self,
        mut envelope: RequestEnvelope,
        options: SignOptions,
    ) -> Result<ResponseEnvelope> {
        let request_options = self.session.request_options()?;
        envelope.set_header(CLIENT_AUTH_HEADER, request_options.token);
        envelope.set_header(CLIENT_REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        if options.sign {
            attach_signature(&mut envelope, &request_options.keypair)?;
        }
        self.log_request(&envelope);

        let response = self.session.transport().send(&envelope).await?;

        if response.is_authorization_failure() {
            self.logger.debug(format!(
                "{} {} rejected with status {}",
                envelope.method.as_str(),
                envelope.path,
                response.status
            ));
            return Err(ApiError::Authorization {
                status: response.status,
                reason: "server rejected the session token".to_string(),
            });
        }

        // Verify over the exact received bytes, before any parsing.
        verify_response(&request_options.server_public_key, &response)?;
        self.logger.debug(format!(
            "{} {} -> {}",
            envelope.method.as_str(),
            envelope.path,
            response.status
        ));
        Ok(response)
    }

    /// Request metadata goes to the log through the redactor; bodies are
    /// only logged at debug level and only after masking.
    fn log_request(&self, envelope: &RequestEnvelope) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        self.logger.debug(format!(
            "{} {} ({} body bytes)",
            envelope.method.as_str(),
            envelope.path,
            envelope.body.len()
        ));
        if envelope.body.is_empty() {
            return;
        }
        if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&envelope.body) {
            self.logger
                .debug(format!("request body: {}", redact_sensitive(&json)));
        }
    }
}
