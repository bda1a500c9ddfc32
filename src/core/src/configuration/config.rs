use super::types::*;
use crate::error_handling::types::ConfigError;
use crate::runner::types::RunnerConfig;
use crate::session_management::types::{
    ConnectionParameters, DEFAULT_MAX_RETRIES, DEFAULT_NODE, DEFAULT_PORT, DEFAULT_RETRY_DELAY,
};
use clap::Args;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file looked up when no `--config` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config/global_settings.toml";

/// Command-line and environment overrides.
///
/// Each field is read by `clap` from its flag first and from its environment
/// variable second, so a value present here already follows
/// "CLI > environment". [`Config::resolve`] then falls back to the file and
/// finally to the built-in defaults.
///
/// # Command Line
/// All flags are global, e.g. `t32h --node 10.0.0.7 --max-retries 3 connect`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    /// Settings file (TOML)
    #[arg(long, env = "T32H_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Host name or IP address of the TRACE32 instance
    #[arg(long, env = "T32_NODE", global = true)]
    pub node: Option<String>,

    /// TRACE32 remote API port
    #[arg(long, env = "T32_PORT", global = true)]
    pub port: Option<String>,

    /// Explicit path to the T32 API library; empty searches the default locations
    #[arg(long, env = "T32_API_DLL_PATH", global = true)]
    pub api_dll_path: Option<String>,

    /// Total number of connection attempts
    #[arg(long, env = "T32_MAX_RETRIES", global = true, allow_negative_numbers = true)]
    pub max_retries: Option<i64>,

    /// Seconds to wait between connection attempts
    #[arg(long, env = "T32_RETRY_DELAY", global = true, allow_negative_numbers = true)]
    pub retry_delay: Option<f64>,
}

/// Fully resolved harness configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub node: String,
    pub port: String,
    /// `None` means "search the platform default library names".
    pub api_dll_path: Option<PathBuf>,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub runner: RunnerConfig,
    /// Settings file the values were read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: DEFAULT_NODE.to_string(),
            port: DEFAULT_PORT.to_string(),
            api_dll_path: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            runner: RunnerConfig::default(),
            source: None,
        }
    }
}

impl Config {
    /// Loads the settings file and applies `overrides` on top of it.
    ///
    /// An explicitly requested file must exist. The default file
    /// ([`DEFAULT_CONFIG_PATH`]) is optional; without it only overrides and
    /// built-in defaults apply.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let (file, source) = match &overrides.config {
            Some(path) => (Self::read_file(path)?, Some(path.clone())),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    (Self::read_file(&path)?, Some(path))
                } else {
                    info!(
                        "No settings file at {}, using built-in defaults",
                        path.display()
                    );
                    (FileConfig::default(), None)
                }
            }
        };

        let mut config = Self::resolve(file, overrides)?;
        config.source = source;
        Ok(config)
    }

    /// Parses a TOML settings file.
    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&content)?;
        debug!("Read settings from {}", path.display());
        Ok(file)
    }

    /// Merges overrides, file values and defaults, then validates the result.
    pub fn resolve(file: FileConfig, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let trace32 = file.trace32;
        let runner = file.runner;

        let node = overrides
            .node
            .clone()
            .or(trace32.node)
            .unwrap_or(defaults.node);
        if node.trim().is_empty() {
            return Err(ConfigError::EmptyNode);
        }

        let port = overrides
            .port
            .clone()
            .or_else(|| trace32.port.map(PortValue::into_text))
            .unwrap_or(defaults.port);
        validate_port(&port)?;

        let api_dll_path = overrides
            .api_dll_path
            .clone()
            .or(trace32.api_dll_path)
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        let max_retries = match overrides.max_retries.or(trace32.max_retries) {
            Some(n) => validate_retries(n)?,
            None => defaults.max_retries,
        };

        let retry_delay = match overrides.retry_delay.or(trace32.retry_delay) {
            Some(secs) => validate_delay(secs)?,
            None => defaults.retry_delay,
        };

        let runner_defaults = defaults.runner;
        let runner = RunnerConfig {
            program: runner.program.unwrap_or(runner_defaults.program),
            args: runner.args.unwrap_or(runner_defaults.args),
            verbose_flag: match runner.verbose_flag {
                Some(flag) if flag.is_empty() => None,
                Some(flag) => Some(flag),
                None => runner_defaults.verbose_flag,
            },
            test_paths: runner.test_paths.unwrap_or(runner_defaults.test_paths),
            report_dir: runner.report_dir.or(runner_defaults.report_dir),
        };

        Ok(Config {
            node,
            port,
            api_dll_path,
            max_retries,
            retry_delay,
            runner,
            source: None,
        })
    }

    pub fn connection_parameters(&self) -> ConnectionParameters {
        ConnectionParameters::new(self.node.clone(), self.port.clone())
            .with_retries(self.max_retries, self.retry_delay)
    }
}

fn validate_port(port: &str) -> Result<(), ConfigError> {
    match port.trim().parse::<u16>() {
        Ok(p) if p > 0 => Ok(()),
        _ => Err(ConfigError::BadPortsRange(format!(
            "port must be a number between 1 and 65535, got `{}`",
            port
        ))),
    }
}

fn validate_retries(n: i64) -> Result<u32, ConfigError> {
    if n < 1 {
        return Err(ConfigError::NotInRange(format!(
            "max_retries must be at least 1, got {}",
            n
        )));
    }
    u32::try_from(n).map_err(|_| ConfigError::NotInRange(format!("max_retries too large: {}", n)))
}

fn validate_delay(secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        ConfigError::NotInRange(format!(
            "retry_delay must be a non-negative number of seconds, got {}",
            secs
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        overrides: ConfigOverrides,
    }

    const SAMPLE: &str = r#"
[trace32]
node = "192.168.1.20"
port = 20010
api_dll_path = "/opt/t32/bin/pc_linux64/t32api.so"
max_retries = 4
retry_delay = 0.5

[runner]
program = "python"
args = ["run_tests.py"]
verbose_flag = "-v"
test_paths = ["tests/"]
report_dir = "reports"
"#;

    fn settings_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn clear_env() {
        for key in [
            "T32H_CONFIG",
            "T32_NODE",
            "T32_PORT",
            "T32_API_DLL_PATH",
            "T32_MAX_RETRIES",
            "T32_RETRY_DELAY",
        ] {
            std::env::remove_var(key);
        }
    }

    fn parse(args: &[&str]) -> ConfigOverrides {
        let mut argv = vec!["t32h"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv)
            .unwrap_or_else(|e| panic!("{}", e))
            .overrides
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::resolve(FileConfig::default(), &ConfigOverrides::default()).unwrap();

        assert_eq!(config.node, "localhost");
        assert_eq!(config.port, "20000");
        assert_eq!(config.api_dll_path, None);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.retry_delay, Duration::from_secs(1));
        assert_eq!(config.runner, RunnerConfig::default());
    }

    #[test]
    fn test_file_values() {
        let file = settings_file(SAMPLE);
        let overrides = ConfigOverrides {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };

        let config = Config::load(&overrides).unwrap();

        assert_eq!(config.node, "192.168.1.20");
        assert_eq!(config.port, "20010");
        assert_eq!(
            config.api_dll_path,
            Some(PathBuf::from("/opt/t32/bin/pc_linux64/t32api.so"))
        );
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.runner.program, "python");
        assert_eq!(config.runner.verbose_flag.as_deref(), Some("-v"));
        assert_eq!(config.runner.report_dir, Some(PathBuf::from("reports")));
        assert_eq!(config.source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_port_as_string_and_empty_library_path() {
        let file = settings_file("[trace32]\nport = \"20005\"\napi_dll_path = \"\"\n");
        let parsed = Config::read_file(file.path()).unwrap();

        let config = Config::resolve(parsed, &ConfigOverrides::default()).unwrap();

        assert_eq!(config.port, "20005");
        assert_eq!(config.api_dll_path, None);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let overrides = ConfigOverrides {
            config: Some(PathBuf::from("/nonexistent/global_settings.toml")),
            ..Default::default()
        };

        assert!(matches!(
            Config::load(&overrides),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_file() {
        let file = settings_file("[trace32\nnode = ");

        assert!(matches!(
            Config::read_file(file.path()),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_validation() {
        let with = |trace32: Trace32Section| {
            Config::resolve(
                FileConfig {
                    trace32,
                    ..Default::default()
                },
                &ConfigOverrides::default(),
            )
        };

        assert!(matches!(
            with(Trace32Section {
                port: Some(PortValue::Number(70000)),
                ..Default::default()
            }),
            Err(ConfigError::BadPortsRange(_))
        ));
        assert!(matches!(
            with(Trace32Section {
                port: Some(PortValue::Text("api".into())),
                ..Default::default()
            }),
            Err(ConfigError::BadPortsRange(_))
        ));
        assert!(matches!(
            with(Trace32Section {
                max_retries: Some(0),
                ..Default::default()
            }),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            with(Trace32Section {
                retry_delay: Some(-1.0),
                ..Default::default()
            }),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            with(Trace32Section {
                node: Some("  ".into()),
                ..Default::default()
            }),
            Err(ConfigError::EmptyNode)
        ));
    }

    #[test]
    #[serial]
    fn test_cli_beats_env_beats_file() {
        clear_env();
        let file = settings_file(SAMPLE);
        std::env::set_var("T32H_CONFIG", file.path());
        std::env::set_var("T32_NODE", "env-node");
        std::env::set_var("T32_MAX_RETRIES", "7");

        let overrides = parse(&["--node", "cli-node"]);
        let config = Config::load(&overrides).unwrap();
        clear_env();

        assert_eq!(config.node, "cli-node");
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.port, "20010");
        assert_eq!(config.retry_delay, Duration::from_millis(500));
    }

    #[test]
    #[serial]
    fn test_cli_flags_parse() {
        clear_env();

        let overrides = parse(&[
            "--port",
            "20001",
            "--api-dll-path",
            "C:/T32/bin/windows64/t32api64.dll",
            "--max-retries",
            "3",
            "--retry-delay",
            "2.5",
        ]);

        assert_eq!(overrides.port.as_deref(), Some("20001"));
        assert_eq!(overrides.max_retries, Some(3));
        assert_eq!(overrides.retry_delay, Some(2.5));

        let config = Config::resolve(FileConfig::default(), &overrides).unwrap();
        assert_eq!(
            config.api_dll_path,
            Some(PathBuf::from("C:/T32/bin/windows64/t32api64.dll"))
        );
        assert_eq!(config.connection_parameters().retry_delay, Duration::from_millis(2500));
    }
}
