use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::time::Duration;

use log::{debug, info};

use super::events::SessionEvent;
use super::types::{CommandResult, ConnectionParameters, SessionState};
use crate::binding::api::{quote, DebugApi, ATTACH_DEVICE_API, PACKET_LENGTH};
use crate::binding::resolver::{self, LoadAttempt, LoadOutcome};
use crate::error_handling::types::{BindingError, SessionError};

/// Benign command used to probe an established connection.
pub const HEALTH_CHECK_COMMAND: &str = "PRINT \"t32h health check\"";

pub type Sleeper = Box<dyn FnMut(Duration) + Send>;
pub type Observer = Box<dyn FnMut(&SessionEvent) + Send>;

/// One logical connection to a debug target.
///
/// A `Session` owns the loaded library (if any) and a [`SessionState`]:
/// - `Unbound` when no library could be loaded; every operation then
///   short-circuits without touching native code.
/// - `Disconnected` / `Connected`, toggled by [`connect`](Self::connect) and
///   [`disconnect`](Self::disconnect).
///
/// Commands, scripts and health checks require `Connected` and fail fast
/// otherwise. No operation panics or returns native failures as errors the
/// caller must unwind; they are all plain return values.
///
/// The session is meant to be driven from one thread at a time. Retry waits
/// block the calling thread.
pub struct Session {
    api: Option<Box<dyn DebugApi>>,
    library_source: Option<String>,
    load_attempts: Vec<LoadAttempt>,
    state: SessionState,
    sleeper: Sleeper,
    observer: Option<Observer>,
}

enum AttemptFailure {
    Init(i32),
    Attach(i32),
}

impl Session {
    /// Resolves and loads the vendor library, `api_path` first.
    ///
    /// Never fails: an unloadable library yields an `Unbound` session whose
    /// [`load_attempts`](Self::load_attempts) explain why.
    pub fn open(api_path: Option<&Path>) -> Self {
        Self::from_outcome(resolver::resolve(api_path))
    }

    pub fn from_outcome<T: DebugApi + 'static>(outcome: LoadOutcome<T>) -> Self {
        match outcome {
            LoadOutcome::Bound { api, source } => Self::bound(Box::new(api), source),
            LoadOutcome::Unbound(attempts) => Self::unbound(attempts),
        }
    }

    /// Wraps an already loaded binding.
    pub fn bound(api: Box<dyn DebugApi>, source: impl Into<String>) -> Self {
        let source = source.into();
        info!("Session bound to T32 API library {}", source);
        Self {
            api: Some(api),
            library_source: Some(source),
            load_attempts: Vec::new(),
            state: SessionState::Disconnected,
            sleeper: Box::new(std::thread::sleep),
            observer: None,
        }
    }

    pub fn unbound(load_attempts: Vec<LoadAttempt>) -> Self {
        Self {
            api: None,
            library_source: None,
            load_attempts,
            state: SessionState::Unbound,
            sleeper: Box::new(std::thread::sleep),
            observer: None,
        }
    }

    /// Replaces the function used to wait between connection attempts.
    pub fn with_sleeper(mut self, sleeper: impl FnMut(Duration) + Send + 'static) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    pub fn with_observer(mut self, observer: impl FnMut(&SessionEvent) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn is_bound(&self) -> bool {
        self.api.is_some()
    }

    pub fn library_source(&self) -> Option<&str> {
        self.library_source.as_deref()
    }

    /// Failed load attempts recorded while resolving the library.
    pub fn load_attempts(&self) -> &[LoadAttempt] {
        &self.load_attempts
    }

    /// Connects, returning `true` once attached.
    pub fn connect(&mut self, params: &ConnectionParameters) -> bool {
        self.establish(params).is_ok()
    }

    /// Connects with up to `max_retries` attempts and a constant
    /// `retry_delay` between them.
    ///
    /// Each attempt configures `NODE`, `PORT` and `PACKLEN`, then calls
    /// `T32_Init` and, if that succeeds, `T32_Attach`. Returns the attempt
    /// number that succeeded, or `0` when the session was already connected.
    pub fn establish(&mut self, params: &ConnectionParameters) -> Result<u32, SessionError> {
        let Session {
            api,
            state,
            sleeper,
            observer,
            ..
        } = self;

        let Some(api) = api.as_mut() else {
            notify(
                observer,
                SessionEvent::Rejected {
                    operation: "connect",
                    reason: "T32 API library not loaded",
                },
            );
            return Err(SessionError::LibraryNotLoaded);
        };

        if *state == SessionState::Connected {
            notify(observer, SessionEvent::AlreadyConnected);
            return Ok(0);
        }

        let max_retries = params.max_retries.max(1);
        let mut last_status = 0;

        for attempt in 1..=max_retries {
            notify(
                observer,
                SessionEvent::AttemptStarted {
                    attempt,
                    max_retries,
                    node: params.node.clone(),
                    port: params.port.clone(),
                },
            );

            match attempt_connection(&mut **api, params) {
                Ok(Ok(())) => {
                    *state = SessionState::Connected;
                    notify(observer, SessionEvent::Connected { attempt });
                    return Ok(attempt);
                }
                Ok(Err(failure)) => {
                    *state = SessionState::Disconnected;
                    let event = match failure {
                        AttemptFailure::Init(status) => {
                            last_status = status;
                            SessionEvent::InitFailed { attempt, status }
                        }
                        AttemptFailure::Attach(status) => {
                            last_status = status;
                            SessionEvent::AttachFailed { attempt, status }
                        }
                    };
                    notify(observer, event);
                }
                Err(e) => {
                    *state = SessionState::Disconnected;
                    notify(
                        observer,
                        SessionEvent::Rejected {
                            operation: "connect",
                            reason: "connection parameters contain a NUL byte",
                        },
                    );
                    return Err(SessionError::InvalidParameters(e.to_string()));
                }
            }

            if attempt < max_retries {
                notify(
                    observer,
                    SessionEvent::RetryWait {
                        attempt,
                        delay: params.retry_delay,
                    },
                );
                sleeper(params.retry_delay);
            }
        }

        notify(
            observer,
            SessionEvent::ConnectFailed {
                attempts: max_retries,
                last_status,
            },
        );
        Err(SessionError::RetriesExhausted {
            attempts: max_retries,
            last_status,
        })
    }

    /// Calls `T32_Exit` once if connected. The session is considered torn
    /// down whatever the native status.
    pub fn disconnect(&mut self) {
        let Some(api) = self.api.as_mut() else {
            debug!("T32 API library not loaded. Nothing to disconnect.");
            return;
        };

        if self.state != SessionState::Connected {
            debug!("Not connected to T32. Nothing to disconnect.");
            return;
        }

        let status = api.exit();
        self.state = SessionState::Disconnected;
        notify(&mut self.observer, SessionEvent::Disconnected { status });
    }

    /// Probes the connection with a benign command. Never changes state.
    pub fn check_connection(&mut self) -> bool {
        let Some(api) = self.connected_api("check_connection") else {
            return false;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| api.cmd(HEALTH_CHECK_COMMAND)));
        let healthy = matches!(outcome, Ok(Ok(0)));
        notify(&mut self.observer, SessionEvent::HealthChecked { healthy });
        healthy
    }

    /// Sends a raw command line through `T32_Cmd`.
    pub fn run_command(&mut self, command: &str) -> CommandResult {
        let Some(api) = self.connected_api("run_command") else {
            return CommandResult::not_connected();
        };

        let result = to_result(api.cmd(command));
        notify(
            &mut self.observer,
            SessionEvent::CommandCompleted {
                command: command.to_string(),
                status: result.status_code,
            },
        );
        result
    }

    /// Runs a PRACTICE script with `DO "<path>"`, forwarding `args` as the
    /// script's argument vector.
    pub fn run_script(&mut self, path: &Path, args: &[String]) -> CommandResult {
        let Some(api) = self.connected_api("run_script") else {
            return CommandResult::not_connected();
        };

        let Some(path) = path.to_str() else {
            debug!("Script path {:?} is not valid UTF-8, not sent", path);
            return CommandResult::from_status(CommandResult::INVALID_ARGUMENT);
        };

        let command = format!("DO {}", quote(path));
        let result = to_result(api.execute_script(&command, args));
        notify(
            &mut self.observer,
            SessionEvent::CommandCompleted {
                command,
                status: result.status_code,
            },
        );
        result
    }

    /// The bound api when connected; otherwise reports the rejection.
    fn connected_api(&mut self, operation: &'static str) -> Option<&mut Box<dyn DebugApi>> {
        if self.state == SessionState::Connected {
            return self.api.as_mut();
        }

        let reason = if self.api.is_none() {
            "T32 API library not loaded"
        } else {
            "not connected"
        };
        notify(&mut self.observer, SessionEvent::Rejected { operation, reason });
        None
    }
}

fn attempt_connection(
    api: &mut dyn DebugApi,
    params: &ConnectionParameters,
) -> Result<Result<(), AttemptFailure>, BindingError> {
    api.config("NODE=", &params.node)?;
    api.config("PORT=", &params.port)?;
    api.config("PACKLEN=", PACKET_LENGTH)?;

    let status = api.init();
    if status != 0 {
        return Ok(Err(AttemptFailure::Init(status)));
    }

    let status = api.attach(ATTACH_DEVICE_API);
    if status != 0 {
        return Ok(Err(AttemptFailure::Attach(status)));
    }

    Ok(Ok(()))
}

fn to_result(status: Result<i32, BindingError>) -> CommandResult {
    match status {
        Ok(status) => CommandResult::from_status(status),
        Err(e) => {
            debug!("Command not sent: {}", e);
            CommandResult::from_status(CommandResult::INVALID_ARGUMENT)
        }
    }
}

fn notify(observer: &mut Option<Observer>, event: SessionEvent) {
    event.log();
    if let Some(observer) = observer.as_mut() {
        observer(&event);
    }
}
