//! Structured events emitted by a [`Session`](super::session::Session).
//!
//! Every event is written to the `log` facade and handed to the optional
//! observer, so hosts can react to the lifecycle without parsing text.

use std::time::Duration;

use log::{debug, error, info, warn};

/// One step of the session lifecycle.
///
/// Variants:
/// - `AttemptStarted`: a connection attempt begins with the given node and port.
/// - `InitFailed`: `T32_Init` returned a non-zero status; `T32_Attach` was skipped.
/// - `AttachFailed`: `T32_Init` succeeded but `T32_Attach` did not.
/// - `RetryWait`: the session sleeps `delay` before the next attempt.
/// - `Connected`: the attempt numbered `attempt` attached to the target.
/// - `ConnectFailed`: every attempt failed; carries the last native status.
/// - `AlreadyConnected`: connect was requested on a connected session.
/// - `Disconnected`: `T32_Exit` was called and returned `status`.
/// - `HealthChecked`: result of the connection health check.
/// - `CommandCompleted`: a command or script line was sent and returned `status`.
/// - `Rejected`: `operation` was refused without a native call.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    AttemptStarted {
        attempt: u32,
        max_retries: u32,
        node: String,
        port: String,
    },
    InitFailed {
        attempt: u32,
        status: i32,
    },
    AttachFailed {
        attempt: u32,
        status: i32,
    },
    RetryWait {
        attempt: u32,
        delay: Duration,
    },
    Connected {
        attempt: u32,
    },
    ConnectFailed {
        attempts: u32,
        last_status: i32,
    },
    AlreadyConnected,
    Disconnected {
        status: i32,
    },
    HealthChecked {
        healthy: bool,
    },
    CommandCompleted {
        command: String,
        status: i32,
    },
    Rejected {
        operation: &'static str,
        reason: &'static str,
    },
}

impl SessionEvent {
    pub(crate) fn log(&self) {
        match self {
            SessionEvent::AttemptStarted {
                attempt,
                max_retries,
                node,
                port,
            } => info!(
                "Connection attempt {}/{}: NODE={}, PORT={}, PACKLEN=1024",
                attempt, max_retries, node, port
            ),
            SessionEvent::InitFailed { attempt, status } => {
                warn!("T32_Init failed with status {} (attempt {})", status, attempt)
            }
            SessionEvent::AttachFailed { attempt, status } => {
                warn!("T32_Attach failed with status {} (attempt {})", status, attempt)
            }
            SessionEvent::RetryWait { attempt, delay } => {
                debug!("Waiting {:?} before attempt {}", delay, attempt + 1)
            }
            SessionEvent::Connected { attempt } => {
                info!("T32_Attach successful, connection established (attempt {})", attempt)
            }
            SessionEvent::ConnectFailed {
                attempts,
                last_status,
            } => error!(
                "Failed to connect after {} attempt(s), last status {}",
                attempts, last_status
            ),
            SessionEvent::AlreadyConnected => {
                warn!("connect() called while already connected, keeping the active session")
            }
            SessionEvent::Disconnected { status } => {
                if *status == 0 {
                    info!("T32_Exit successful")
                } else {
                    warn!("T32_Exit returned status {}", status)
                }
            }
            SessionEvent::HealthChecked { healthy } => {
                if *healthy {
                    debug!("Connection health check passed")
                } else {
                    warn!("Connection health check failed")
                }
            }
            SessionEvent::CommandCompleted { command, status } => {
                debug!("`{}` returned status {}", command, status)
            }
            SessionEvent::Rejected { operation, reason } => {
                warn!("{} rejected: {}", operation, reason)
            }
        }
    }
}
