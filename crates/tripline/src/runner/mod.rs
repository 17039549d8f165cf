//! Change-gated execution of a single action.
//!
//! An action is anything with watch prefixes and a command line: a plain job
//! or a Helm chart upgrade. [`ActionRunner::run_if_changed`] consults the
//! snapshot, runs the command when one of its prefixes changed, and sends
//! exactly one notification per executed action.

pub mod exec;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempPath;
use thiserror::Error;
use tracing::{info, info_span, Instrument};

use crate::notify::{Notification, Notifier, NotifyError};
use crate::snapshot::Snapshot;

pub use exec::{ActionExecutor, ExecOutput, ProcessExecutor};

/// Notification color used when an action does not set one.
pub const DEFAULT_COLOR: &str = "#10148c";

/// Infrastructure failures: the action could not be run or reported.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Command line is empty")]
    EmptyCommand,

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decrypt '{path}': {message}")]
    Decrypt { path: String, message: String },

    #[error("Failed to write temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// The action ran but exited unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionError {
    pub exit_code: Option<i32>,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "exit status {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

impl std::error::Error for ActionError {}

/// A ready-to-spawn command line.
///
/// Holds any temporary files the command reads; they are deleted when the
/// value is dropped, after the command has finished.
#[derive(Debug, Default)]
pub struct PreparedCommand {
    pub argv: Vec<String>,
    _temp_files: Vec<TempPath>,
}

impl PreparedCommand {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            _temp_files: Vec::new(),
        }
    }

    /// Keeps `path` alive for as long as this command.
    pub fn keep_alive(&mut self, path: TempPath) {
        self._temp_files.push(path);
    }
}

/// Something the runner can gate on the snapshot and execute.
#[async_trait]
pub trait GatedAction: Send + Sync {
    /// Display name, used in logs and notifications.
    fn title(&self) -> &str;

    /// Repository-relative path prefixes that trigger this action.
    fn watch_prefixes(&self) -> &[String];

    fn color(&self) -> &str {
        DEFAULT_COLOR
    }

    /// Builds the command line. Only called when the action will execute.
    async fn prepare(&self, snapshot: &Snapshot) -> Result<PreparedCommand, RunError>;
}

/// Outcome of one gated run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub output: String,
    /// The path that triggered the run; `None` when skipped.
    pub changed_path: Option<String>,
    pub action_error: Option<ActionError>,
}

impl RunReport {
    pub fn skipped() -> Self {
        Self::default()
    }

    pub fn was_skipped(&self) -> bool {
        self.changed_path.is_none()
    }

    pub fn is_failure(&self) -> bool {
        self.action_error.is_some()
    }
}

/// Per-pipeline tally, logged once a pipeline finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, result: &Result<RunReport, RunError>) {
        match result {
            Ok(report) if report.is_failure() => self.failed += 1,
            Ok(report) if report.was_skipped() => self.skipped += 1,
            Ok(_) => self.executed += 1,
            Err(_) => self.failed += 1,
        }
    }
}

pub struct ActionRunner {
    executor: Arc<dyn ActionExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl ActionRunner {
    pub fn new(executor: Arc<dyn ActionExecutor>, notifier: Arc<dyn Notifier>) -> Self {
        Self { executor, notifier }
    }

    /// Runs `action` if one of its watch prefixes changed in `snapshot`.
    ///
    /// A non-zero exit is not an `Err`: it is recorded in the report and
    /// notified. `Err` means the command could not be prepared, spawned or
    /// reported.
    pub async fn run_if_changed(
        &self,
        action: &dyn GatedAction,
        snapshot: &Snapshot,
    ) -> Result<RunReport, RunError> {
        let span = info_span!("action", title = %action.title());
        self.run_gated(action, snapshot).instrument(span).await
    }

    async fn run_gated(
        &self,
        action: &dyn GatedAction,
        snapshot: &Snapshot,
    ) -> Result<RunReport, RunError> {
        let Some(changed) = snapshot.changed_under_prefix(action.watch_prefixes()) else {
            info!(
                watch_paths = ?action.watch_prefixes(),
                "watch paths did not change, skipping"
            );
            return Ok(RunReport::skipped());
        };
        let changed = changed.to_string();

        if snapshot.is_dry_run() {
            info!(changed = %changed, "dry run, not executing");
            return Ok(RunReport {
                output: String::new(),
                changed_path: Some(changed),
                action_error: None,
            });
        }

        info!(changed = %changed, "watch path changed, executing");
        let prepared = action.prepare(snapshot).await?;
        let result = self
            .executor
            .execute(&prepared.argv, snapshot.local_path())
            .await?;
        drop(prepared);

        let action_error = (!result.success).then_some(ActionError {
            exit_code: result.exit_code,
        });
        let description = match &action_error {
            None => format!("watch path {} changed\n{}", changed, result.output),
            Some(err) => format!(
                "watch path {} changed\n{}: {}",
                changed, err, result.output
            ),
        };
        let status = if action_error.is_none() {
            "success"
        } else {
            "failure"
        };
        info!(status, "job completed");

        self.notifier
            .notify(&Notification {
                color: action.color().to_string(),
                title: action.title().to_string(),
                success: action_error.is_none(),
                description,
                old_revision: snapshot.old_revision().cloned(),
                new_revision: snapshot.new_revision().clone(),
            })
            .await?;

        Ok(RunReport {
            output: result.output,
            changed_path: Some(changed),
            action_error,
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording doubles shared by the runner, job and chart tests.

    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use super::*;

    /// Records every command and answers with a fixed exit code.
    #[derive(Default)]
    pub struct RecordingExecutor {
        pub calls: Mutex<Vec<(Vec<String>, PathBuf)>>,
        pub exit_code: i32,
        pub output: String,
    }

    impl RecordingExecutor {
        pub fn failing(exit_code: i32, output: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                exit_code,
                output: output.to_string(),
            }
        }

        pub fn commands(&self) -> Vec<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(argv, _)| argv.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ActionExecutor for RecordingExecutor {
        async fn execute(
            &self,
            command: &[String],
            working_dir: &Path,
        ) -> Result<ExecOutput, RunError> {
            self.calls
                .lock()
                .unwrap()
                .push((command.to_vec(), working_dir.to_path_buf()));
            Ok(ExecOutput {
                output: self.output.clone(),
                success: self.exit_code == 0,
                exit_code: Some(self.exit_code),
            })
        }
    }

    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub fn sent(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }
}
