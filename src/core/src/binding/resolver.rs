//! Library binding resolution.
//!
//! Order of attempts:
//! 1. the explicit path, when one is configured;
//! 2. the platform candidates from [`default_candidates`], first match wins.
//!
//! Nothing here returns an error: every failed attempt is recorded as a
//! [`LoadAttempt`] and exhaustion is reported as [`LoadOutcome::Unbound`].

use std::ffi::OsStr;
use std::path::Path;

use log::{error, info, warn};

use super::library::NativeLibrary;
use crate::error_handling::types::BindingError;

#[cfg(windows)]
const CANDIDATES: &[&str] = &["t32api64.dll", "t32api.dll"];

#[cfg(not(windows))]
const CANDIDATES: &[&str] = &["t32api.so"];

/// One failed attempt to load a library candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadAttempt {
    pub candidate: String,
    pub reason: String,
}

/// Result of library resolution.
///
/// Variants:
/// - `Bound`: `api` was loaded from `source`.
/// - `Unbound`: nothing loaded; one entry per failed attempt, in order.
pub enum LoadOutcome<T> {
    Bound { api: T, source: String },
    Unbound(Vec<LoadAttempt>),
}

impl<T> LoadOutcome<T> {
    pub fn is_bound(&self) -> bool {
        matches!(self, LoadOutcome::Bound { .. })
    }
}

/// Library file names tried for the current platform, in order.
pub fn default_candidates() -> &'static [&'static str] {
    CANDIDATES
}

/// Loads the vendor library, trying `explicit` first and then the platform
/// candidates.
pub fn resolve(explicit: Option<&Path>) -> LoadOutcome<NativeLibrary> {
    resolve_with(explicit, default_candidates(), NativeLibrary::load)
}

/// Resolution with an injected loader, shared by [`resolve`] and the tests.
pub fn resolve_with<T, F>(explicit: Option<&Path>, candidates: &[&str], mut load: F) -> LoadOutcome<T>
where
    F: FnMut(&OsStr) -> Result<T, BindingError>,
{
    let mut attempts = Vec::new();

    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        match load(path.as_os_str()) {
            Ok(api) => {
                info!("Successfully loaded T32 API from: {}", path.display());
                return LoadOutcome::Bound {
                    api,
                    source: path.display().to_string(),
                };
            }
            Err(e) => {
                warn!("Failed to load T32 API from {}: {}", path.display(), e);
                attempts.push(LoadAttempt {
                    candidate: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for candidate in candidates {
        match load(OsStr::new(candidate)) {
            Ok(api) => {
                info!("Successfully loaded T32 API: {}", candidate);
                return LoadOutcome::Bound {
                    api,
                    source: candidate.to_string(),
                };
            }
            Err(e) => {
                warn!("Failed to load T32 API {}: {}", candidate, e);
                attempts.push(LoadAttempt {
                    candidate: candidate.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    error!(
        "Could not load Trace32 API library after {} attempt(s). Ensure it is on the library search path or set api_dll_path",
        attempts.len()
    );
    LoadOutcome::Unbound(attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn loader_accepting<'a>(
        accepted: &'static str,
        seen: &'a mut Vec<String>,
    ) -> impl FnMut(&OsStr) -> Result<String, BindingError> + 'a {
        move |name| {
            let name = name.to_string_lossy().into_owned();
            seen.push(name.clone());
            if name == accepted {
                Ok(name)
            } else {
                Err(BindingError::LoadFailed(format!("{} not found", name)))
            }
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        let mut seen = Vec::new();
        let path = PathBuf::from("/opt/t32/bin/pc_linux64/t32api.so");
        let outcome = resolve_with(
            Some(&path),
            &["a.so", "b.so"],
            loader_accepting("/opt/t32/bin/pc_linux64/t32api.so", &mut seen),
        );

        match outcome {
            LoadOutcome::Bound { source, .. } => {
                assert_eq!(source, "/opt/t32/bin/pc_linux64/t32api.so")
            }
            LoadOutcome::Unbound(_) => panic!("expected a bound library"),
        }
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_explicit_failure_falls_through_to_candidates() {
        let mut seen = Vec::new();
        let path = PathBuf::from("/wrong/t32api.so");
        let outcome = resolve_with(
            Some(&path),
            &["t32api64.dll", "t32api.dll"],
            loader_accepting("t32api.dll", &mut seen),
        );

        assert!(outcome.is_bound());
        assert_eq!(seen, vec!["/wrong/t32api.so", "t32api64.dll", "t32api.dll"]);
    }

    #[test]
    fn test_empty_explicit_path_is_ignored() {
        let mut seen = Vec::new();
        let path = PathBuf::new();
        let outcome = resolve_with(Some(&path), &["t32api.so"], loader_accepting("t32api.so", &mut seen));

        assert!(outcome.is_bound());
        assert_eq!(seen, vec!["t32api.so"]);
    }

    #[test]
    fn test_exhaustion_records_every_attempt() {
        let mut seen = Vec::new();
        let path = PathBuf::from("/wrong/t32api.so");
        let outcome = resolve_with(
            Some(&path),
            &["t32api64.dll", "t32api.dll"],
            loader_accepting("nothing", &mut seen),
        );

        match outcome {
            LoadOutcome::Unbound(attempts) => {
                assert_eq!(attempts.len(), 3);
                assert_eq!(attempts[0].candidate, "/wrong/t32api.so");
                assert!(attempts[2].reason.contains("t32api.dll not found"));
            }
            LoadOutcome::Bound { .. } => panic!("nothing should have loaded"),
        }
    }

    #[test]
    fn test_platform_candidates() {
        let candidates = default_candidates();
        if cfg!(windows) {
            assert_eq!(candidates, ["t32api64.dll", "t32api.dll"]);
        } else {
            assert_eq!(candidates, ["t32api.so"]);
        }
    }
}
