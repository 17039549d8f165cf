//! One observe-and-dispatch run over the tracked repository.

use std::sync::Arc;

use crate::config::Config;
use crate::error::{ConfigError, Result};
use crate::helm::{self, ChartNode};
use crate::jobs::{self, JobSpec};
use crate::notify::{NoopNotifier, Notifier, SlackNotifier};
use crate::runner::{ActionExecutor, ActionRunner, ProcessExecutor, RunSummary};
use crate::scheduler::DependencyGraph;
use crate::snapshot::{Snapshot, SnapshotTracker};

/// What a run ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The head did not move and no override was set.
    UpToDate,
    Dispatched {
        charts: RunSummary,
        jobs: RunSummary,
    },
}

pub struct Daemon {
    config: Arc<Config>,
    executor: Arc<dyn ActionExecutor>,
    notifier: Arc<dyn Notifier>,
}

impl Daemon {
    /// Real subprocesses, and Slack when `[slack]` is configured.
    pub fn new(config: Config) -> Self {
        let notifier: Arc<dyn Notifier> = match &config.slack {
            Some(slack) => Arc::new(SlackNotifier::new(slack)),
            None => Arc::new(NoopNotifier),
        };
        Self::with_parts(config, Arc::new(ProcessExecutor), notifier)
    }

    pub fn with_parts(
        config: Config,
        executor: Arc<dyn ActionExecutor>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            executor,
            notifier,
        }
    }

    /// Observes the repository once and runs every action whose watch paths
    /// changed. Charts and jobs run as two concurrent pipelines.
    ///
    /// Configuration, chart graph and snapshot errors abort before anything
    /// is dispatched. Failures of individual actions are logged and counted,
    /// never returned.
    pub async fn run(&self) -> Result<RunOutcome> {
        let tracker = SnapshotTracker::from_config(&self.config)?;
        let snapshot = tokio::task::spawn_blocking(move || tracker.observe())
            .await??;

        if !snapshot.head_moved() {
            log::info!("No new commits");
            return Ok(RunOutcome::UpToDate);
        }
        log::info!(
            "Branch HEAD moved: {} -> {}",
            snapshot
                .old_revision()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "<none>".to_string()),
            snapshot.new_revision()
        );

        let graph = self.chart_graph(&snapshot)?;
        let job_specs: Vec<JobSpec> = self
            .config
            .jobs
            .iter()
            .map(|(name, job)| JobSpec::from_config(name, job))
            .collect();

        let snapshot = Arc::new(snapshot);
        let runner = Arc::new(ActionRunner::new(
            Arc::clone(&self.executor),
            Arc::clone(&self.notifier),
        ));

        let charts_pipeline = {
            let snapshot = Arc::clone(&snapshot);
            let runner = Arc::clone(&runner);
            async move {
                match graph {
                    Some(graph) => helm::run_charts(graph, snapshot, runner).await,
                    None => RunSummary::default(),
                }
            }
        };
        let jobs_pipeline = jobs::run_jobs(job_specs, snapshot, runner);

        let (charts, jobs) = tokio::join!(charts_pipeline, jobs_pipeline);
        log::info!(
            "Charts: {} executed, {} skipped, {} failed",
            charts.executed,
            charts.skipped,
            charts.failed
        );
        log::info!(
            "Jobs: {} executed, {} skipped, {} failed",
            jobs.executed,
            jobs.skipped,
            jobs.failed
        );

        Ok(RunOutcome::Dispatched { charts, jobs })
    }

    fn chart_graph(
        &self,
        snapshot: &Snapshot,
    ) -> std::result::Result<Option<DependencyGraph<Arc<ChartNode>>>, ConfigError> {
        let Some(helm_config) = &self.config.helm else {
            return Ok(None);
        };
        let charts = helm::discover_charts(snapshot.local_path(), helm_config)?;
        Ok(Some(helm::chart_graph(charts)?))
    }
}
