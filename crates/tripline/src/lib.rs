pub mod config;
pub mod daemon;
pub mod error;
pub mod git;
pub mod helm;
pub mod jobs;
pub mod notify;
pub mod runner;
pub mod scheduler;
pub mod snapshot;

pub use config::{load_config, Config, RunOverrides};
pub use daemon::{Daemon, RunOutcome};
pub use error::{ConfigError, Result, TriplineError};
pub use git::{GitError, GitRepository, RevisionId};
pub use helm::ChartNode;
pub use jobs::JobSpec;
pub use notify::{NoopNotifier, Notification, Notifier, SlackNotifier};
pub use runner::{
    ActionExecutor, ActionRunner, ExecOutput, GatedAction, ProcessExecutor, RunError, RunReport,
    RunSummary,
};
pub use scheduler::{DependencyGraph, DependencyScheduler, GraphError};
pub use snapshot::{Snapshot, SnapshotError, SnapshotTracker, TagPolicy};
