//! Test runner subsystem.
//!
//! Spawns the configured external test command, streams its output line by
//! line and produces a JSON-serializable [`RunReport`].
//!
//! Components:
//! - `test_runner`: process spawning, output streaming and stop handling.
//! - `summary`: pass/fail counters extracted from libtest or pytest output.
//! - `types`: `RunnerConfig`, `OutputLine`, `RunReport`.

pub mod summary;
pub mod test_runner;
pub mod types;

pub use test_runner::{RunHandle, TestRunner};
pub use types::{OutputLine, OutputStream, RunReport, RunnerConfig, TestSummary};
