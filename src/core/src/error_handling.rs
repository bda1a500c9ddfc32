//! Error types shared across the harness.
//!
//! Every subsystem owns one enum in [`types`]; [`types::HarnessError`] wraps
//! them for the binary.

pub mod types;
