//! Core types used by the session component.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_NODE: &str = "localhost";
pub const DEFAULT_PORT: &str = "20000";
pub const DEFAULT_MAX_RETRIES: u32 = 1;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Lifecycle state of a [`Session`](super::session::Session).
///
/// `Unbound` is terminal: it means the native library never loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Unbound,
    Disconnected,
    Connected,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unbound => write!(f, "Unbound"),
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Per-call connection settings. Not stored by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionParameters {
    /// Host name or IP address of the TRACE32 instance.
    pub node: String,
    /// API port, passed to the library as text.
    pub port: String,
    /// Total number of attempts; `0` is treated as `1`.
    pub max_retries: u32,
    /// Constant wait between failed attempts.
    pub retry_delay: Duration,
}

impl ConnectionParameters {
    pub fn new(node: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            port: port.into(),
            ..Default::default()
        }
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            node: DEFAULT_NODE.to_string(),
            port: DEFAULT_PORT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Status of one command or script invocation, mirrored from the native
/// layer. Negative sentinels are produced locally without any native call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub status_code: i32,
}

impl CommandResult {
    /// The session was not connected.
    pub const NOT_CONNECTED: i32 = -1;
    /// An argument could not be converted to a C string.
    pub const INVALID_ARGUMENT: i32 = -2;

    pub fn from_status(status_code: i32) -> Self {
        Self { status_code }
    }

    pub fn not_connected() -> Self {
        Self::from_status(Self::NOT_CONNECTED)
    }

    pub fn succeeded(&self) -> bool {
        self.status_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_parameters() {
        let params = ConnectionParameters::default();
        assert_eq!(params.node, "localhost");
        assert_eq!(params.port, "20000");
        assert_eq!(params.max_retries, 1);
        assert_eq!(params.retry_delay, Duration::from_secs_f64(1.0));
    }

    #[test]
    fn test_command_result_success() {
        assert!(CommandResult::from_status(0).succeeded());
        assert!(!CommandResult::from_status(3).succeeded());
        assert!(!CommandResult::not_connected().succeeded());
        assert_eq!(CommandResult::not_connected().status_code, -1);
    }
}
