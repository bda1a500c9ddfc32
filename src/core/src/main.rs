use clap::{Parser, Subcommand};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use t32_harness::configuration::{Config, ConfigOverrides};
use t32_harness::error_handling::types::HarnessError;
use t32_harness::runner::{OutputStream, RunReport, TestRunner};
use t32_harness::{ConnectedSession, Session};

#[derive(Parser)]
#[command(name = "t32h")]
#[command(version)]
#[command(about = "Automation harness for TRACE32 debug targets")]
struct Args {
    #[command(flatten)]
    overrides: ConfigOverrides,

    /// Log at debug level
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Connect to the target, check the connection and disconnect
    Connect,
    /// Run the connection health check
    Check,
    /// Send a raw command line to the target
    Cmd { command: String },
    /// Run a PRACTICE script on the target
    Script {
        path: PathBuf,
        /// Arguments passed to the script, `-` prefixed ones included
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run the configured test command and report the result
    Test {
        /// Pass the configured verbose flag to the test command
        #[arg(short, long)]
        verbose: bool,
        /// Directory for the JSON run report (overrides the settings file)
        #[arg(long)]
        report_dir: Option<PathBuf>,
        /// Test paths or filters; defaults to the configured ones
        paths: Vec<String>,
    },
    /// Print the resolved configuration
    Config,
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_target(false)
        .init();

    info!("Importing configuration");
    let config = match Config::load(&args.overrides) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(args.command, &config) {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: &Config) -> Result<ExitCode, HarnessError> {
    match command {
        Command::Connect => with_session(config, |session| {
            if !session.check_connection() {
                warn!("Connected, but the health check failed");
            }
            Ok(ExitCode::SUCCESS)
        }),
        Command::Check => with_session(config, |session| {
            if session.check_connection() {
                info!("Connection health check passed");
                Ok(ExitCode::SUCCESS)
            } else {
                Err(HarnessError::HealthCheckFailed)
            }
        }),
        Command::Cmd { command } => with_session(config, |session| {
            status_to_exit(session.run_command(&command).status_code)
        }),
        Command::Script { path, args } => with_session(config, |session| {
            status_to_exit(session.run_script(&path, &args).status_code)
        }),
        Command::Test {
            verbose,
            report_dir,
            paths,
        } => {
            let report_dir = report_dir.or_else(|| config.runner.report_dir.clone());
            run_tests(config, &paths, verbose, report_dir.as_deref())
        }
        Command::Config => {
            print_config(config);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Opens, connects and hands the session to `op`; the guard disconnects
/// afterwards whatever `op` returns.
fn with_session<F>(config: &Config, op: F) -> Result<ExitCode, HarnessError>
where
    F: FnOnce(&mut Session) -> Result<ExitCode, HarnessError>,
{
    let session = Session::open(config.api_dll_path.as_deref());
    if !session.is_bound() {
        let tried = session
            .load_attempts()
            .iter()
            .map(|a| format!("{} ({})", a.candidate, a.reason))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(HarnessError::InitializationFailed(format!(
            "could not load the T32 API library, tried: {}",
            tried
        )));
    }

    if let Some(source) = session.library_source() {
        debug!("Using T32 API library {}", source);
    }

    let mut session = ConnectedSession::establish(session, &config.connection_parameters())?;
    info!("Connected to {}:{}", config.node, config.port);
    op(&mut *session)
}

fn status_to_exit(status: i32) -> Result<ExitCode, HarnessError> {
    if status == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Err(HarnessError::CommandFailed(status))
    }
}

fn run_tests(
    config: &Config,
    paths: &[String],
    verbose: bool,
    report_dir: Option<&Path>,
) -> Result<ExitCode, HarnessError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| HarnessError::InitializationFailed(format!("tokio runtime: {}", e)))?;

    let report = runtime.block_on(async {
        let runner = TestRunner::new(config.runner.clone());
        let (mut handle, mut output) = runner.start(paths, verbose)?;

        loop {
            tokio::select! {
                line = output.recv() => match line {
                    Some(line) => match line.stream {
                        OutputStream::Stdout => println!("{}", line.text),
                        OutputStream::Stderr => eprintln!("{}", line.text),
                    },
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    warn!("Interrupted, stopping tests");
                    handle.stop();
                }
            }
        }

        handle.wait().await
    })?;

    print_report(&report);
    if let Some(dir) = report_dir {
        report.write_json(dir)?;
    }

    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        let code = report.exit_code.unwrap_or(1).clamp(1, 255);
        ExitCode::from(code as u8)
    })
}

fn print_report(report: &RunReport) {
    println!();
    println!("Run {}", report.id);
    println!("  command:   {}", report.command.join(" "));
    println!("  duration:  {} ms", report.duration().num_milliseconds());
    match report.exit_code {
        Some(code) => println!("  exit code: {}", code),
        None => println!("  exit code: none (terminated)"),
    }
    if report.stopped {
        println!("  stopped by user");
    }
    if let Some(summary) = report.summary {
        println!(
            "  summary:   {} passed, {} failed, {} skipped",
            summary.passed, summary.failed, summary.skipped
        );
    }
}

fn print_config(config: &Config) {
    match &config.source {
        Some(path) => println!("Settings file: {}", path.display()),
        None => println!("Settings file: none (built-in defaults)"),
    }
    println!("Node: {}", config.node);
    println!("Port: {}", config.port);
    match &config.api_dll_path {
        Some(path) => println!("API DLL Path: {}", path.display()),
        None => println!("API DLL Path: Not specified, relying on the library search path."),
    }
    println!("Max retries: {}", config.max_retries);
    println!("Retry delay: {:?}", config.retry_delay);
    println!(
        "Test command: {} {}",
        config.runner.program,
        config.runner.args.join(" ")
    );
}
