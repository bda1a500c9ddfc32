//! Automation harness for TRACE32 debug targets.
//!
//! The [`session_management`] module is the core: it binds the vendor remote
//! API library through [`binding`], connects with retry, dispatches commands
//! and scripts, and tears the connection down. [`configuration`] resolves
//! connection settings and [`runner`] drives external test suites.

pub mod binding;
pub mod configuration;
pub mod error_handling;
pub mod runner;
pub mod session_management;

pub use session_management::*;
