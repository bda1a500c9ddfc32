use std::process::Stdio;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::summary::SummaryParser;
use super::types::{OutputLine, OutputStream, RunReport, RunnerConfig};
use crate::error_handling::types::RunnerError;

/// Upper bound for collecting output after the process is gone. Grandchildren
/// that inherited the pipes can keep them open after a stop.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the configured external test command and streams its output.
///
/// The harness does not orchestrate tests itself; it spawns whatever the
/// configuration names (`cargo test` by default), forwards stdout and stderr
/// line by line, and turns the result into a [`RunReport`].
pub struct TestRunner {
    config: RunnerConfig,
}

/// A running test process.
pub struct RunHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<RunReport, RunnerError>>,
}

impl TestRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Full argv for a run. Explicit `paths` replace the configured ones.
    pub fn command_line(&self, paths: &[String], verbose: bool) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.config.args.len() + paths.len() + 2);
        argv.push(self.config.program.clone());
        argv.extend(self.config.args.iter().cloned());
        if verbose {
            if let Some(flag) = &self.config.verbose_flag {
                argv.push(flag.clone());
            }
        }
        if paths.is_empty() {
            argv.extend(self.config.test_paths.iter().cloned());
        } else {
            argv.extend(paths.iter().cloned());
        }
        argv
    }

    /// Spawns the test process. Must be called from within a tokio runtime.
    ///
    /// Output lines are sent to the returned receiver as they arrive; the same
    /// lines end up in the report returned by [`RunHandle::wait`].
    pub fn start(
        &self,
        paths: &[String],
        verbose: bool,
    ) -> Result<(RunHandle, mpsc::UnboundedReceiver<OutputLine>), RunnerError> {
        if self.config.program.trim().is_empty() {
            return Err(RunnerError::EmptyCommand);
        }

        let command = self.command_line(paths, verbose);
        let id = Uuid::new_v4();
        info!("[{}] Running tests: {}", id, command.join(" "));

        let mut child = Command::new(&command[0])
            .args(&command[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RunnerError::SpawnFailed)?;

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, OutputStream::Stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, OutputStream::Stderr, line_tx.clone());
        }
        drop(line_tx);

        let (forward_tx, forward_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(supervise(
            id,
            command,
            Utc::now(),
            child,
            stop_rx,
            line_rx,
            forward_tx,
        ));

        Ok((
            RunHandle {
                stop_tx: Some(stop_tx),
                task,
            },
            forward_rx,
        ))
    }
}

impl RunHandle {
    /// Asks the supervisor to kill the test process. Returns `false` when a
    /// stop was already requested or the run has finished.
    pub fn stop(&mut self) -> bool {
        match self.stop_tx.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    /// Waits for the process to finish and returns its report.
    pub async fn wait(self) -> Result<RunReport, RunnerError> {
        let RunHandle { stop_tx, task } = self;
        let result = task
            .await
            .map_err(|e| RunnerError::TaskFailed(e.to_string()))?;
        // dropping the sender earlier would read as a stop request
        drop(stop_tx);
        result
    }
}

fn spawn_reader<R>(reader: R, stream: OutputStream, tx: mpsc::UnboundedSender<OutputLine>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(text)) => {
                    if tx.send(OutputLine { stream, text }).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read test output from {:?}: {}", stream, e);
                    break;
                }
            }
        }
    });
}

async fn supervise(
    id: Uuid,
    command: Vec<String>,
    started_at: DateTime<Utc>,
    mut child: Child,
    mut stop_rx: oneshot::Receiver<()>,
    mut line_rx: mpsc::UnboundedReceiver<OutputLine>,
    forward_tx: mpsc::UnboundedSender<OutputLine>,
) -> Result<RunReport, RunnerError> {
    let mut lines = Vec::new();
    let mut stopped = false;
    let mut listening = true;

    let keep = |line: OutputLine, lines: &mut Vec<OutputLine>| {
        let _ = forward_tx.send(line.clone());
        lines.push(line);
    };

    let status = loop {
        tokio::select! {
            Some(line) = line_rx.recv() => keep(line, &mut lines),
            status = child.wait() => break status.map_err(RunnerError::WaitFailed)?,
            request = &mut stop_rx, if listening => {
                listening = false;
                if request.is_ok() {
                    info!("[{}] Stopping tests on request", id);
                    stopped = true;
                    if let Err(e) = child.start_kill() {
                        warn!("[{}] Failed to kill test process: {}", id, e);
                    }
                }
            }
        }
    };

    let drain = async {
        while let Some(line) = line_rx.recv().await {
            keep(line, &mut lines);
        }
    };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        debug!("[{}] Output pipes still open after exit, report may be incomplete", id);
    }

    let summary = SummaryParser::new().parse(&lines);
    let report = RunReport {
        id,
        command,
        started_at,
        finished_at: Utc::now(),
        exit_code: status.code(),
        stopped,
        summary,
        lines,
    };

    info!(
        "[{}] Test execution finished with exit code {:?}{}",
        id,
        report.exit_code,
        if stopped { " (stopped by user)" } else { "" }
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn shell(script: &str) -> RunnerConfig {
        RunnerConfig {
            program: "sh".into(),
            args: vec!["-c".into(), script.into()],
            verbose_flag: None,
            test_paths: Vec::new(),
            report_dir: None,
        }
    }

    #[test]
    fn test_command_line_uses_configured_paths() {
        let runner = TestRunner::new(RunnerConfig {
            test_paths: vec!["session".into()],
            ..RunnerConfig::default()
        });

        assert_eq!(
            runner.command_line(&[], true),
            vec!["cargo", "test", "--verbose", "session"]
        );
        assert_eq!(
            runner.command_line(&["config".to_string()], false),
            vec!["cargo", "test", "config"]
        );
    }

    #[test]
    fn test_empty_program_is_rejected() {
        let runner = TestRunner::new(RunnerConfig {
            program: " ".into(),
            ..RunnerConfig::default()
        });

        assert!(matches!(
            runner.start(&[], false),
            Err(RunnerError::EmptyCommand)
        ));
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let runner = TestRunner::new(RunnerConfig {
            program: "/nonexistent/t32h-test-binary".into(),
            ..RunnerConfig::default()
        });

        assert!(matches!(
            runner.start(&[], false),
            Err(RunnerError::SpawnFailed(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_streams_output_and_reports_exit_code() {
        let runner = TestRunner::new(shell(
            "echo 'test result: ok. 2 passed; 1 failed; 0 ignored;'; echo oops >&2; exit 3",
        ));

        let (handle, mut rx) = assert_ok!(runner.start(&[], false));
        let report = handle.wait().await.unwrap();

        let mut streamed = Vec::new();
        while let Some(line) = rx.recv().await {
            streamed.push(line);
        }

        assert_eq!(report.exit_code, Some(3));
        assert!(!report.stopped);
        assert!(!report.succeeded());
        assert_eq!(streamed.len(), 2);
        assert!(report.lines.contains(&OutputLine {
            stream: OutputStream::Stderr,
            text: "oops".into()
        }));
        let summary = report.summary.unwrap();
        assert_eq!((summary.passed, summary.failed), (2, 1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_kills_the_process() {
        let runner = TestRunner::new(shell("echo started; exec sleep 30"));

        let (mut handle, mut rx) = assert_ok!(runner.start(&[], false));
        let first = rx.recv().await.unwrap();
        assert_eq!(first.text, "started");

        assert!(handle.stop());
        assert!(!handle.stop());

        let report = tokio::time::timeout(Duration::from_secs(10), handle.wait())
            .await
            .expect("stopped run finishes")
            .unwrap();

        assert!(report.stopped);
        assert!(!report.succeeded());
        assert_eq!(report.exit_code, None);
    }
}
