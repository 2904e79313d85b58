//! Session lifecycle: installation handshake, token refresh, retry wrapper.
//!
//! The session token is the only mutable shared value in this layer. It is
//! published through an [`ArcSwap`] so concurrent readers observe either
//! the prior valid token or the refreshed one, never a torn value, and all
//! refreshes are serialized behind one lock so concurrent expiry
//! detections coalesce into a single handshake.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwapOption;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use signet_common::logging::{Component, Logger};
use signet_keys::{is_valid_public_key_pem, KeyError, RsaKeyPair};

use crate::config::ClientConfig;
use crate::error::{ApiError, HandshakeStage, Result};
use crate::pipeline::{attach_signature, verify_response};
use crate::transport::{
    RequestEnvelope, ResponseEnvelope, Transport, CLIENT_AUTH_HEADER, CLIENT_REQUEST_ID_HEADER,
};

/// Handshake endpoint registering the installation public key.
pub const INSTALLATION_PATH: &str = "/v1/installation";
/// Handshake endpoint binding the installation to a device.
pub const DEVICE_PATH: &str = "/v1/device-server";
/// Handshake endpoint exchanging the installation for a session token.
pub const SESSION_PATH: &str = "/v1/session-server";

/// Observable session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Installed,
    SessionActive,
    SessionExpired,
}

/// A completed installation: the server-side registration this client
/// authenticates against. Immutable once published.
#[derive(Debug, Clone)]
pub struct Installation {
    /// Token authenticating handshake-level calls.
    pub token: String,
    /// Server-side id of the device registration.
    pub device_id: u64,
    /// The server's public key, pinned at installation time.
    pub server_public_key: String,
}

/// The current session token and its local bookkeeping.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub issued_at: SystemTime,
    /// Advisory only; the server remains the source of truth for expiry.
    pub expires_at: Option<SystemTime>,
    generation: u64,
}

impl Session {
    /// Monotonic counter bumped on every refresh; used to coalesce
    /// concurrent refresh attempts.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Everything the request pipeline needs to attach to an outbound call.
#[derive(Clone)]
pub struct RequestOptions {
    pub token: String,
    pub keypair: Arc<RsaKeyPair>,
    pub server_public_key: String,
}

// -- wire payloads ---------------------------------------------------------

#[derive(Serialize)]
struct InstallationRequest<'a> {
    client_public_key: &'a str,
}

#[derive(Deserialize)]
struct InstallationResponse {
    token: String,
    server_public_key: String,
}

#[derive(Serialize)]
struct DeviceRequest<'a> {
    description: &'a str,
    permitted_ips: &'a [String],
}

#[derive(Deserialize)]
struct DeviceResponse {
    device_id: u64,
}

#[derive(Serialize)]
struct SessionRequest<'a> {
    installation_token: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

// --------------------------------------------------------------------------

/// Owns the installation/device/session handshake and the live session.
///
/// Injectable handle: construct one per identity and pass it to every
/// caller that needs the session, rather than sharing ambient state.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    keypair: Arc<RsaKeyPair>,
    installation: ArcSwapOption<Installation>,
    session: ArcSwapOption<Session>,
    /// Serializes install and refresh; concurrent refreshes coalesce here.
    refresh_lock: Mutex<()>,
    logger: Arc<Logger>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: ClientConfig,
        keypair: Arc<RsaKeyPair>,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            transport,
            config,
            keypair,
            installation: ArcSwapOption::empty(),
            session: ArcSwapOption::empty(),
            refresh_lock: Mutex::new(()),
            logger: Arc::new(logger.with_component(Component::Session)),
        }
    }

    /// Run the installation handshake: register the public key, bind the
    /// device, then exchange for a session token.
    ///
    /// The three steps are strictly ordered and any failure aborts the
    /// whole handshake; nothing is published until every step succeeded,
    /// so partial state is never observable.
    pub async fn install(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.logger.info("starting installation handshake");

        let public_pem = self.keypair.public_key_pem().map_err(ApiError::Identity)?;
        let body = encode_payload(
            HandshakeStage::Installation,
            &InstallationRequest {
                client_public_key: &public_pem,
            },
        )?;
        // The server key only becomes known through this first response,
        // so the installation step itself cannot be verified against it.
        let response = self
            .handshake_call(
                HandshakeStage::Installation,
                INSTALLATION_PATH,
                body,
                None,
                false,
                None,
            )
            .await?;
        let installed: InstallationResponse =
            parse_json(HandshakeStage::Installation, &response)?;
        if !is_valid_public_key_pem(&installed.server_public_key) {
            return Err(ApiError::Handshake {
                stage: HandshakeStage::Installation,
                reason: "server delivered an unparsable public key".to_string(),
            });
        }

        let device_body = encode_payload(
            HandshakeStage::DeviceRegistration,
            &DeviceRequest {
                description: &self.config.device_description,
                permitted_ips: &self.config.permitted_ips,
            },
        )?;
        let device_response = self
            .handshake_call(
                HandshakeStage::DeviceRegistration,
                DEVICE_PATH,
                device_body,
                Some(&installed.token),
                true,
                Some(&installed.server_public_key),
            )
            .await?;
        let device: DeviceResponse =
            parse_json(HandshakeStage::DeviceRegistration, &device_response)?;

        let installation = Installation {
            token: installed.token,
            device_id: device.device_id,
            server_public_key: installed.server_public_key,
        };
        let session = self.start_session(&installation, 1).await?;

        self.installation.store(Some(Arc::new(installation)));
        self.session.store(Some(Arc::new(session)));
        self.logger
            .info("installation handshake complete, session active");
        Ok(())
    }

    /// Adopt a previously persisted installation (process restart path).
    /// A session still has to be obtained through [`refresh`](Self::refresh).
    pub fn restore_installation(
        &self,
        token: impl Into<String>,
        device_id: u64,
        server_public_key: impl Into<String>,
    ) -> Result<()> {
        let server_public_key = server_public_key.into();
        if !is_valid_public_key_pem(&server_public_key) {
            return Err(ApiError::Identity(KeyError::InvalidKeyFormat(
                "restored server public key is not valid PEM".to_string(),
            )));
        }
        self.installation.store(Some(Arc::new(Installation {
            token: token.into(),
            device_id,
            server_public_key,
        })));
        self.logger.info("installation restored from storage");
        Ok(())
    }

    /// Obtain a fresh session token, coalescing concurrent attempts.
    ///
    /// `observed_generation` is the generation the caller saw when it
    /// detected the expiry. If the live session is already newer when the
    /// refresh lock is acquired, another task refreshed in the meantime
    /// and the live session is returned without a network round-trip.
    pub async fn refresh(&self, observed_generation: u64) -> Result<Arc<Session>> {
        let _guard = self.refresh_lock.lock().await;
        if let Some(current) = self.session.load_full() {
            if current.generation > observed_generation {
                self.logger.debug(format!(
                    "refresh coalesced, session already at generation {}",
                    current.generation
                ));
                return Ok(current);
            }
        }

        let installation = self.installation.load_full().ok_or(ApiError::Handshake {
            stage: HandshakeStage::SessionStart,
            reason: "no completed installation to refresh against".to_string(),
        })?;
        let next_generation = self
            .session
            .load_full()
            .map(|s| s.generation + 1)
            .unwrap_or(1);
        let session = Arc::new(self.start_session(&installation, next_generation).await?);
        self.session.store(Some(session.clone()));
        self.logger.info(format!(
            "session refreshed (generation {})",
            session.generation
        ));
        Ok(session)
    }

    /// Run `operation`; on an authorization failure, refresh the session
    /// exactly once and retry `operation` exactly once. The second failure
    /// (if any) propagates unchanged. Never retries more than once.
    pub async fn with_session_refresh<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let observed = self.session_generation();
        match operation().await {
            Err(err) if err.is_authorization() => {
                self.logger
                    .debug("authorization failure, refreshing session once");
                self.refresh(observed).await?;
                operation().await
            }
            other => other,
        }
    }

    /// What the pipeline attaches to an outbound call. Errors while no
    /// session is active; never returns a stale token once one is.
    pub fn request_options(&self) -> Result<RequestOptions> {
        let installation = self.installation.load_full().ok_or(ApiError::Handshake {
            stage: HandshakeStage::Installation,
            reason: "not installed".to_string(),
        })?;
        let session = self.session.load_full().ok_or(ApiError::Handshake {
            stage: HandshakeStage::SessionStart,
            reason: "no active session; run install() first".to_string(),
        })?;
        Ok(RequestOptions {
            token: session.token.clone(),
            keypair: self.keypair.clone(),
            server_public_key: installation.server_public_key.clone(),
        })
    }

    /// The live session snapshot, if any.
    pub fn current_session(&self) -> Option<Arc<Session>> {
        self.session.load_full()
    }

    /// The completed installation, if any.
    pub fn current_installation(&self) -> Option<Arc<Installation>> {
        self.installation.load_full()
    }

    /// Generation of the live session; 0 before any session exists.
    pub fn session_generation(&self) -> u64 {
        self.session
            .load_full()
            .map(|s| s.generation)
            .unwrap_or(0)
    }

    /// Derived lifecycle state. Expiry here is advisory local tracking;
    /// the authoritative expiry signal is the server's authorization error.
    pub fn state(&self) -> SessionState {
        match (self.installation.load_full(), self.session.load_full()) {
            (None, _) => SessionState::Uninitialized,
            (Some(_), None) => SessionState::Installed,
            (Some(_), Some(session)) => {
                if session.is_expired_at(SystemTime::now()) {
                    SessionState::SessionExpired
                } else {
                    SessionState::SessionActive
                }
            }
        }
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Exchange the installation for a session token (the third handshake
    /// step, also the refresh operation).
    async fn start_session(
        &self,
        installation: &Installation,
        generation: u64,
    ) -> Result<Session> {
        let body = encode_payload(
            HandshakeStage::SessionStart,
            &SessionRequest {
                installation_token: &installation.token,
            },
        )?;
        let response = self
            .handshake_call(
                HandshakeStage::SessionStart,
                SESSION_PATH,
                body,
                Some(&installation.token),
                true,
                Some(&installation.server_public_key),
            )
            .await?;
        let issued: SessionResponse = parse_json(HandshakeStage::SessionStart, &response)?;
        let issued_at = SystemTime::now();
        Ok(Session {
            token: issued.token,
            issued_at,
            expires_at: issued
                .expires_in
                .map(|secs| issued_at + Duration::from_secs(secs)),
            generation,
        })
    }

    /// One handshake request over the transport: attach headers, sign the
    /// body when required, check the status, verify the response signature
    /// once the server key is known.
    async fn handshake_call(
        &self,
        stage: HandshakeStage,
        path: &str,
        payload: Bytes,
        auth_token: Option<&str>,
        sign_body: bool,
        verify_key: Option<&str>,
    ) -> Result<ResponseEnvelope> {
        let mut envelope = RequestEnvelope::post(path, payload);
        envelope.set_header(CLIENT_REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        if let Some(token) = auth_token {
            envelope.set_header(CLIENT_AUTH_HEADER, token);
        }
        if sign_body {
            attach_signature(&mut envelope, &self.keypair)?;
        }
        self.logger.debug(format!("handshake step {stage}: POST {path}"));

        let response = self.transport.send(&envelope).await?;
        if !response.is_success() {
            return Err(ApiError::Handshake {
                stage,
                reason: format!("server returned status {}", response.status),
            });
        }
        if let Some(server_key) = verify_key {
            verify_response(server_key, &response)?;
        }
        Ok(response)
    }
}

fn encode_payload<T: Serialize>(stage: HandshakeStage, payload: &T) -> Result<Bytes> {
    serde_json::to_vec(payload)
        .map(Bytes::from)
        .map_err(|e| ApiError::Handshake {
            stage,
            reason: format!("encoding request payload: {e}"),
        })
}

fn parse_json<T: DeserializeOwned>(
    stage: HandshakeStage,
    response: &ResponseEnvelope,
) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Handshake {
        stage,
        reason: format!("malformed response body: {e}"),
    })
}
