//! Executor and notifier doubles that record instead of acting.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use tripline::notify::NotifyError;
use tripline::{ActionExecutor, ExecOutput, Notification, Notifier, RunError};

/// Records every command line and reports success.
#[derive(Default)]
pub struct RecordingExecutor {
    commands: Mutex<Vec<Vec<String>>>,
}

impl RecordingExecutor {
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.commands.lock().unwrap().clone()
    }

    /// Helm release names, i.e. the second to last argument of each helm call.
    pub fn helm_releases(&self) -> Vec<String> {
        self.commands()
            .iter()
            .filter(|argv| argv.first().map(String::as_str) == Some("helm"))
            .map(|argv| argv[argv.len() - 2].clone())
            .collect()
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn execute(
        &self,
        command: &[String],
        _working_dir: &Path,
    ) -> Result<ExecOutput, RunError> {
        self.commands.lock().unwrap().push(command.to_vec());
        Ok(ExecOutput {
            output: "ok\n".to_string(),
            success: true,
            exit_code: Some(0),
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|n| n.title.clone())
            .collect();
        titles.sort();
        titles
    }

    pub fn all_succeeded(&self) -> bool {
        self.sent.lock().unwrap().iter().all(|n| n.success)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}
