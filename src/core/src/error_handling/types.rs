use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    FileNotFound(String),
    EmptyNode,
    BadPortsRange(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::FileNotFound(e) => write!(f, "Config file not found: {}", e),
            ConfigError::EmptyNode => write!(f, "Node address must not be empty"),
            ConfigError::BadPortsRange(e) => write!(f, "Port range error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Failures of the native binding layer. None of these ever escape a
/// [`Session`](crate::session_management::session::Session); they are turned
/// into failed attempts or sentinel statuses there.
#[derive(Debug)]
pub enum BindingError {
    LoadFailed(String),
    MissingSymbol(String),
    InvalidString(String),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::LoadFailed(e) => write!(f, "Library load failed: {}", e),
            BindingError::MissingSymbol(e) => write!(f, "Missing library symbol: {}", e),
            BindingError::InvalidString(e) => {
                write!(f, "String cannot be passed to the native library: {}", e)
            }
        }
    }
}

impl std::error::Error for BindingError {}

impl From<std::ffi::NulError> for BindingError {
    fn from(err: std::ffi::NulError) -> Self {
        BindingError::InvalidString(err.to_string())
    }
}

#[derive(Debug, PartialEq)]
pub enum SessionError {
    LibraryNotLoaded,
    RetriesExhausted { attempts: u32, last_status: i32 },
    InvalidParameters(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::LibraryNotLoaded => write!(f, "T32 API library not loaded"),
            SessionError::RetriesExhausted {
                attempts,
                last_status,
            } => write!(
                f,
                "Connection failed after {} attempt(s), last status {}",
                attempts, last_status
            ),
            SessionError::InvalidParameters(e) => write!(f, "Invalid connection parameters: {}", e),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug)]
pub enum RunnerError {
    SpawnFailed(std::io::Error),
    WaitFailed(std::io::Error),
    TaskFailed(String),
    ReportFailed(String),
    EmptyCommand,
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerError::SpawnFailed(e) => write!(f, "Failed to spawn test process: {}", e),
            RunnerError::WaitFailed(e) => write!(f, "Failed to wait for test process: {}", e),
            RunnerError::TaskFailed(e) => write!(f, "Test supervisor task failed: {}", e),
            RunnerError::ReportFailed(e) => write!(f, "Failed to write run report: {}", e),
            RunnerError::EmptyCommand => write!(f, "No test program configured"),
        }
    }
}

impl std::error::Error for RunnerError {}

#[derive(Debug)]
pub enum HarnessError {
    ConfigurationError(ConfigError),
    SessionError(SessionError),
    RunnerError(RunnerError),
    CommandFailed(i32),
    HealthCheckFailed,
    InitializationFailed(String),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            HarnessError::SessionError(e) => write!(f, "Session error: {}", e),
            HarnessError::RunnerError(e) => write!(f, "Runner error: {}", e),
            HarnessError::CommandFailed(status) => {
                write!(f, "Command returned non-zero status {}", status)
            }
            HarnessError::HealthCheckFailed => write!(f, "Connection health check failed"),
            HarnessError::InitializationFailed(e) => write!(f, "Initialization failed: {}", e),
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<ConfigError> for HarnessError {
    fn from(err: ConfigError) -> Self {
        HarnessError::ConfigurationError(err)
    }
}

impl From<SessionError> for HarnessError {
    fn from(err: SessionError) -> Self {
        HarnessError::SessionError(err)
    }
}

impl From<RunnerError> for HarnessError {
    fn from(err: RunnerError) -> Self {
        HarnessError::RunnerError(err)
    }
}
