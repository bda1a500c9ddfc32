//! Data types shared by the test runner and its reports.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error_handling::types::RunnerError;

/// How the external test command is assembled:
/// `program args.. [verbose_flag] test_paths..`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Appended when a verbose run is requested.
    pub verbose_flag: Option<String>,
    /// Used when the caller gives no explicit test paths.
    pub test_paths: Vec<String>,
    /// Where JSON run reports go; `None` disables report files.
    pub report_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "cargo".to_string(),
            args: vec!["test".to_string()],
            verbose_flag: Some("--verbose".to_string()),
            test_paths: Vec::new(),
            report_dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of test process output, without its line terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

/// Pass/fail counters found in the test output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

/// Outcome of one test run, serialized as the automated test report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub id: Uuid,
    pub command: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stopped: bool,
    pub summary: Option<TestSummary>,
    pub lines: Vec<OutputLine>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        !self.stopped && self.exit_code == Some(0)
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Writes `run-<id>.json` into `dir`, creating it if needed.
    pub fn write_json(&self, dir: &Path) -> Result<PathBuf, RunnerError> {
        fs::create_dir_all(dir).map_err(|e| {
            RunnerError::ReportFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(format!("run-{}.json", self.id));
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RunnerError::ReportFailed(e.to_string()))?;
        fs::write(&path, json).map_err(|e| {
            RunnerError::ReportFailed(format!("cannot write {}: {}", path.display(), e))
        })?;

        info!("Run report written to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn report(exit_code: Option<i32>, stopped: bool) -> RunReport {
        let now = Utc::now();
        RunReport {
            id: Uuid::new_v4(),
            command: vec!["cargo".into(), "test".into()],
            started_at: now,
            finished_at: now + chrono::Duration::seconds(2),
            exit_code,
            stopped,
            summary: Some(TestSummary {
                passed: 3,
                failed: 0,
                skipped: 1,
            }),
            lines: vec![OutputLine {
                stream: OutputStream::Stdout,
                text: "test result: ok".into(),
            }],
        }
    }

    #[test]
    fn test_succeeded() {
        assert!(report(Some(0), false).succeeded());
        assert!(!report(Some(1), false).succeeded());
        assert!(!report(Some(0), true).succeeded());
        assert!(!report(None, true).succeeded());
    }

    #[test]
    fn test_write_json_report() {
        let dir = TempDir::new().unwrap();
        let original = report(Some(0), false);

        let path = original.write_json(&dir.path().join("reports")).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("run-{}.json", original.id)
        );
        let loaded: RunReport =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.id, original.id);
        assert_eq!(loaded.summary, original.summary);
        assert_eq!(loaded.lines, original.lines);
        assert_eq!(loaded.duration(), chrono::Duration::seconds(2));
    }
}
