//! Subprocess execution for actions.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::RunError;

/// Captured result of one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    /// All of stdout followed by all of stderr. The two streams are captured
    /// separately, so writes are not interleaved in the order they happened.
    pub output: String,
    pub success: bool,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Runs `command` (program followed by arguments) in `working_dir`.
    ///
    /// A non-zero exit is reported through [`ExecOutput::success`]; only a
    /// failure to start the program is an error.
    async fn execute(
        &self,
        command: &[String],
        working_dir: &Path,
    ) -> Result<ExecOutput, RunError>;
}

/// Spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

#[async_trait]
impl ActionExecutor for ProcessExecutor {
    async fn execute(
        &self,
        command: &[String],
        working_dir: &Path,
    ) -> Result<ExecOutput, RunError> {
        let (program, args) = command.split_first().ok_or(RunError::EmptyCommand)?;

        let output = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| RunError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            output: combined,
            success: output.status.success(),
            exit_code: output.status.code(),
        })
    }
}
