//! In-process mock of the signed banking API, used by the integration
//! tests. Plays the server side of the handshake and signs every response
//! body with its own RSA key, the way the real server does.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};

use signet_client::{
    RequestEnvelope, ResponseEnvelope, Transport, TransportError, CLIENT_AUTH_HEADER,
    CLIENT_SIGNATURE_HEADER, DEVICE_PATH, INSTALLATION_PATH, SERVER_SIGNATURE_HEADER,
    SESSION_PATH,
};
use signet_keys::{sign, verify, RsaKeyPair};

#[derive(Default)]
struct ServerState {
    client_public_key: Option<String>,
    installation_token: Option<String>,
    session_counter: u64,
    active_token: Option<String>,
    session_ttl: Option<u64>,
    request_log: Vec<String>,
    last_business_signature: Option<String>,
    last_business_auth: Option<String>,
    fail_path: Option<String>,
    fail_transport_next: bool,
    tamper_next_response: bool,
    omit_signature_next: bool,
    reject_business: bool,
}

pub struct MockServer {
    keypair: RsaKeyPair,
    public_key_pem: String,
    state: Mutex<ServerState>,
    pub send_calls: AtomicUsize,
    pub installation_calls: AtomicUsize,
    pub device_calls: AtomicUsize,
    pub session_calls: AtomicUsize,
    pub business_calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockServer {
    pub fn new() -> Self {
        let keypair = RsaKeyPair::generate().expect("server keygen");
        let public_key_pem = keypair.public_key_pem().expect("server public pem");
        Self {
            keypair,
            public_key_pem,
            state: Mutex::new(ServerState {
                session_ttl: Some(600),
                ..ServerState::default()
            }),
            send_calls: AtomicUsize::new(0),
            installation_calls: AtomicUsize::new(0),
            device_calls: AtomicUsize::new(0),
            session_calls: AtomicUsize::new(0),
            business_calls: AtomicUsize::new(0),
        }
    }

    pub fn server_public_key_pem(&self) -> String {
        self.public_key_pem.clone()
    }

    pub fn request_log(&self) -> Vec<String> {
        self.state.lock().unwrap().request_log.clone()
    }

    pub fn last_business_signature(&self) -> Option<String> {
        self.state.lock().unwrap().last_business_signature.clone()
    }

    pub fn last_business_auth(&self) -> Option<String> {
        self.state.lock().unwrap().last_business_auth.clone()
    }

    pub fn active_token(&self) -> Option<String> {
        self.state.lock().unwrap().active_token.clone()
    }

    /// Server-side invalidation of the current session token.
    pub fn revoke_session(&self) {
        self.state.lock().unwrap().active_token = None;
    }

    /// Reject every business call with 401 regardless of the token.
    pub fn reject_business(&self, reject: bool) {
        self.state.lock().unwrap().reject_business = reject;
    }

    /// Answer the next request to `path` with a 500.
    pub fn fail_next(&self, path: &str) {
        self.state.lock().unwrap().fail_path = Some(path.to_string());
    }

    /// Fail the next send at the network level.
    pub fn fail_transport_next(&self) {
        self.state.lock().unwrap().fail_transport_next = true;
    }

    /// Flip a byte of the next response body after signing it.
    pub fn tamper_next_response(&self) {
        self.state.lock().unwrap().tamper_next_response = true;
    }

    /// Drop the signature header from the next response.
    pub fn omit_signature_next(&self) {
        self.state.lock().unwrap().omit_signature_next = true;
    }

    pub fn set_session_ttl(&self, ttl: Option<u64>) {
        self.state.lock().unwrap().session_ttl = ttl;
    }

    fn finish(&self, state: &mut ServerState, status: u16, body: Value) -> ResponseEnvelope {
        let mut bytes = serde_json::to_vec(&body).expect("mock body");
        let signature = sign(&self.keypair, &bytes).expect("mock sign");
        if state.tamper_next_response {
            state.tamper_next_response = false;
            bytes.push(b' ');
        }
        let mut headers = Vec::new();
        if state.omit_signature_next {
            state.omit_signature_next = false;
        } else {
            headers.push((SERVER_SIGNATURE_HEADER.to_string(), signature));
        }
        ResponseEnvelope {
            status,
            headers,
            body: Bytes::from(bytes),
        }
    }

    fn handshake_auth_ok(&self, state: &ServerState, request: &RequestEnvelope) -> bool {
        match (&state.installation_token, request.header(CLIENT_AUTH_HEADER)) {
            (Some(expected), Some(presented)) => expected == presented,
            _ => false,
        }
    }

    fn client_signature_ok(&self, state: &ServerState, request: &RequestEnvelope) -> bool {
        let Some(client_key) = &state.client_public_key else {
            return false;
        };
        match request.header(CLIENT_SIGNATURE_HEADER) {
            Some(signature) => verify(client_key, &request.body, signature),
            None => false,
        }
    }
}

#[async_trait]
impl Transport for MockServer {
    async fn send(
        &self,
        request: &RequestEnvelope,
    ) -> Result<ResponseEnvelope, TransportError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        state.request_log.push(request.path.clone());

        if state.fail_transport_next {
            state.fail_transport_next = false;
            return Err(TransportError::ConnectionFailed(
                "simulated outage".to_string(),
            ));
        }
        if state.fail_path.as_deref() == Some(request.path.as_str()) {
            state.fail_path = None;
            let response = self.finish(&mut state, 500, json!({"error": "internal"}));
            return Ok(response);
        }

        let response = match request.path.as_str() {
            INSTALLATION_PATH => {
                self.installation_calls.fetch_add(1, Ordering::SeqCst);
                let payload: Value =
                    serde_json::from_slice(&request.body).expect("installation payload");
                let client_key = payload["client_public_key"]
                    .as_str()
                    .expect("client_public_key field")
                    .to_string();
                state.client_public_key = Some(client_key);
                let token = format!(
                    "inst-{}",
                    self.installation_calls.load(Ordering::SeqCst)
                );
                state.installation_token = Some(token.clone());
                self.finish(
                    &mut state,
                    200,
                    json!({"token": token, "server_public_key": self.public_key_pem}),
                )
            }
            DEVICE_PATH => {
                self.device_calls.fetch_add(1, Ordering::SeqCst);
                if !self.handshake_auth_ok(&state, request) {
                    self.finish(&mut state, 401, json!({"error": "bad installation token"}))
                } else if !self.client_signature_ok(&state, request) {
                    self.finish(&mut state, 400, json!({"error": "bad signature"}))
                } else {
                    self.finish(&mut state, 200, json!({"device_id": 1}))
                }
            }
            SESSION_PATH => {
                self.session_calls.fetch_add(1, Ordering::SeqCst);
                if !self.handshake_auth_ok(&state, request) {
                    self.finish(&mut state, 401, json!({"error": "bad installation token"}))
                } else if !self.client_signature_ok(&state, request) {
                    self.finish(&mut state, 400, json!({"error": "bad signature"}))
                } else {
                    state.session_counter += 1;
                    let token = format!("session-{}", state.session_counter);
                    state.active_token = Some(token.clone());
                    let ttl = state.session_ttl;
                    self.finish(
                        &mut state,
                        200,
                        json!({"token": token, "expires_in": ttl}),
                    )
                }
            }
            path => {
                self.business_calls.fetch_add(1, Ordering::SeqCst);
                state.last_business_auth = request
                    .header(CLIENT_AUTH_HEADER)
                    .map(|value| value.to_string());
                state.last_business_signature = request
                    .header(CLIENT_SIGNATURE_HEADER)
                    .map(|value| value.to_string());

                let token_ok = !state.reject_business
                    && matches!(
                        (&state.active_token, request.header(CLIENT_AUTH_HEADER)),
                        (Some(active), Some(presented)) if active == presented
                    );
                if !token_ok {
                    self.finish(&mut state, 401, json!({"error": "session expired"}))
                } else if request.header(CLIENT_SIGNATURE_HEADER).is_some()
                    && !self.client_signature_ok(&state, request)
                {
                    self.finish(&mut state, 400, json!({"error": "bad signature"}))
                } else {
                    self.finish(
                        &mut state,
                        200,
                        json!({"path": path, "received_bytes": request.body.len()}),
                    )
                }
            }
        };
        Ok(response)
    }
}
