pub mod logging;
pub mod redact;

pub use logging::{Component, Logger};
pub use redact::{redact_sensitive, REDACTED};
