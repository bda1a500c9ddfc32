//! Native debug-target binding.
//!
//! The vendor library is reached only through the [`DebugApi`] trait. All raw
//! pointer work (C strings, null-terminated argument arrays, symbol lookup) is
//! confined to [`library`]; [`resolver`] decides which library file to load.
//!
//! Components:
//! - `api`: the `DebugApi` trait and the fixed protocol constants.
//! - `library`: `NativeLibrary`, the `libloading`-backed implementation.
//! - `resolver`: explicit path then platform candidates, failures recorded.

pub mod api;
pub mod library;
pub mod resolver;

pub use api::DebugApi;
pub use library::NativeLibrary;
pub use resolver::{LoadAttempt, LoadOutcome};
