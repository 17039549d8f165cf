//! Plain jobs: arbitrary commands fanned out without ordering.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::config::JobConfig;
use crate::runner::{
    ActionRunner, GatedAction, PreparedCommand, RunError, RunReport, RunSummary, DEFAULT_COLOR,
};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub name: String,
    pub watch_paths: Vec<String>,
    pub exec_line: Vec<String>,
    pub color: Option<String>,
}

impl JobSpec {
    pub fn from_config(name: &str, config: &JobConfig) -> Self {
        Self {
            name: name.to_string(),
            watch_paths: config.watch_paths.clone(),
            exec_line: config.exec_line.clone(),
            color: config.slack_color.clone(),
        }
    }
}

#[async_trait]
impl GatedAction for JobSpec {
    fn title(&self) -> &str {
        &self.name
    }

    fn watch_prefixes(&self) -> &[String] {
        &self.watch_paths
    }

    fn color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_COLOR)
    }

    async fn prepare(&self, _snapshot: &Snapshot) -> Result<PreparedCommand, RunError> {
        if self.exec_line.is_empty() {
            return Err(RunError::EmptyCommand);
        }
        Ok(PreparedCommand::new(self.exec_line.clone()))
    }
}

/// Runs every job concurrently and waits for all of them.
///
/// Errors never leave a task; they are logged and counted.
pub async fn run_jobs(
    jobs: Vec<JobSpec>,
    snapshot: Arc<Snapshot>,
    runner: Arc<ActionRunner>,
) -> RunSummary {
    let mut tasks = JoinSet::new();

    for job in jobs {
        let snapshot = Arc::clone(&snapshot);
        let runner = Arc::clone(&runner);
        tasks.spawn(async move {
            let result = runner.run_if_changed(&job, &snapshot).await;
            log_outcome(&job.name, &result);
            result
        });
    }

    let mut summary = RunSummary::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => summary.record(&result),
            Err(e) => {
                log::error!("running job: task panicked: {}", e);
                summary.failed += 1;
            }
        }
    }
    summary
}

fn log_outcome(name: &str, result: &Result<RunReport, RunError>) {
    match result {
        Ok(report) => {
            if let Some(err) = &report.action_error {
                log::error!("running job {}: {}", name, err);
            }
        }
        Err(e) => log::error!("running job {}: {}", name, e),
    }
}
