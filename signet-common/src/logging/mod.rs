// Logging utilities for the Signet client stack
//
// Every layer logs through a component-scoped Logger so that log lines
// carry the installation id and the component that emitted them. Child
// loggers inherit the installation id from their parent.

use log::{debug, error, info, warn};

/// Predefined components for logging categorization
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Component {
    Client,
    Keys,
    Session,
    Api,
    Redact,
    Custom(&'static str),
}

impl Component {
    /// Get the string representation of the component
    pub fn as_str(&self) -> &str {
        match self {
            Component::Client => "Client",
            Component::Keys => "Keys",
            Component::Session => "Session",
            Component::Api => "Api",
            Component::Redact => "Redact",
            Component::Custom(name) => name,
        }
    }
}

/// A helper for creating component-specific loggers with installation id tracking
#[derive(Clone)]
pub struct Logger {
    /// Component this logger is for
    component: Component,
    /// Installation id carried on every line for correlation
    client_id: String,
    /// Parent component for hierarchical logging (if any)
    parent_component: Option<Component>,
}

impl Logger {
    /// Create a new root logger for a specific component and installation id.
    /// This should only be called once by the owning client.
    pub fn new_root(component: Component, client_id: &str) -> Self {
        Self {
            component,
            client_id: client_id.to_string(),
            parent_component: None,
        }
    }

    /// Create a child logger with the same installation id but different component.
    /// This is the preferred way to create loggers in subcomponents.
    pub fn with_component(&self, component: Component) -> Self {
        Self {
            component,
            client_id: self.client_id.clone(),
            parent_component: Some(self.component),
        }
    }

    /// Get a reference to the installation id
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Get the component prefix for logging, including parent if available
    fn component_prefix(&self) -> String {
        match self.parent_component {
            Some(parent) if parent != Component::Client => {
                format!("{}.{}", parent.as_str(), self.component.as_str())
            }
            _ => self.component.as_str().to_string(),
        }
    }

    /// Log a debug message
    pub fn debug(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Debug) {
            // Skip displaying the component if it's the root Client to avoid redundancy
            if self.component == Component::Client && self.parent_component.is_none() {
                debug!("[{}] {}", self.client_id, message.into());
            } else {
                debug!(
                    "[{}][{}] {}",
                    self.client_id,
                    self.component_prefix(),
                    message.into()
                );
            }
        }
    }

    /// Log an info message
    pub fn info(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Info) {
            if self.component == Component::Client && self.parent_component.is_none() {
                info!("[{}] {}", self.client_id, message.into());
            } else {
                info!(
                    "[{}][{}] {}",
                    self.client_id,
                    self.component_prefix(),
                    message.into()
                );
            }
        }
    }

    /// Log a warning message
    pub fn warn(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Warn) {
            warn!(
                "[{}][{}] {}",
                self.client_id,
                self.component_prefix(),
                message.into()
            );
        }
    }

    /// Log an error message
    pub fn error(&self, message: impl Into<String>) {
        if log::log_enabled!(log::Level::Error) {
            error!(
                "[{}][{}] {}",
                self.client_id,
                self.component_prefix(),
                message.into()
            );
        }
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Initialize the `log` backend from `RUST_LOG`. Safe to call more than
/// once; later calls are no-ops.
pub fn init_from_env() {
    let _ = env_logger::try_init();
}
