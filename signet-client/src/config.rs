//! Client configuration for the handshake and request pipeline.

use serde::{Deserialize, Serialize};

/// Configuration handed to the session manager at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API, without trailing slash.
    pub api_base: String,
    /// Human-readable device description sent during device registration.
    pub device_description: String,
    /// IPs the session may be used from; empty means the server default.
    pub permitted_ips: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.signet.example".to_string(),
            device_description: "signet-client".to_string(),
            permitted_ips: Vec::new(),
        }
    }
}

impl ClientConfig {
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_device_description(mut self, description: impl Into<String>) -> Self {
        self.device_description = description.into();
        self
    }

    pub fn with_permitted_ips(mut self, ips: Vec<String>) -> Self {
        self.permitted_ips = ips;
        self
    }
}
