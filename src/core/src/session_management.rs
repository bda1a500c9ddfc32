//! Session management core module.
//!
//! This module owns the connection lifecycle against the debug target:
//! binding state, connect with retry, disconnect, health check and command
//! dispatch.

/// Submodule for structured lifecycle events.
pub mod events;
/// Submodule for the drop-guarded connected session.
pub mod guard;
/// Submodule for the session itself.
pub mod session;
/// Submodule for session data structures.
pub mod types;

pub use events::SessionEvent;
pub use guard::ConnectedSession;
pub use session::Session;
pub use types::{CommandResult, ConnectionParameters, SessionState};
