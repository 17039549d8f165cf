//! Helm chart upgrades, run in dependency order.

pub mod discovery;
pub mod sops;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::config::ChartConfig;
use crate::runner::{ActionRunner, GatedAction, PreparedCommand, RunError, RunSummary};
use crate::scheduler::{DependencyGraph, DependencyScheduler, GraphError};
use crate::snapshot::Snapshot;

pub use discovery::{chart_config_name, discover_charts};

pub const CHART_COLOR: &str = "#10148c";

/// One chart directory and how to upgrade it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartNode {
    /// Directory name; other charts refer to it in `dependencies`.
    pub name: String,
    /// Repository-relative chart directory.
    pub chart_path: String,
    pub release_name: String,
    pub namespace: String,
    pub chart_path_override: Option<String>,
    pub value_paths: Vec<String>,
    pub optional_value_paths: Vec<String>,
    pub sops_value_paths: Vec<String>,
    pub dependencies: Vec<String>,
    title: String,
    watch: Vec<String>,
}

impl ChartNode {
    pub fn from_config(name: String, chart_path: String, config: ChartConfig) -> Self {
        Self {
            title: format!("Helm Chart {}", name),
            watch: vec![chart_path.clone()],
            name,
            chart_path,
            release_name: config.release_name,
            namespace: config.namespace,
            chart_path_override: config.chart_path_override.filter(|p| !p.is_empty()),
            value_paths: config.value_paths,
            optional_value_paths: config.optional_value_paths,
            sops_value_paths: config.sops_value_paths,
            dependencies: config.dependencies,
        }
    }

    /// Path handed to helm, with `chart_path_override` applied.
    pub fn install_path(&self) -> String {
        match &self.chart_path_override {
            Some(sub) => join(&self.chart_path, sub),
            None => self.chart_path.clone(),
        }
    }

    /// The full `helm upgrade --install` invocation.
    ///
    /// `mirror` is only used to check which optional values files exist;
    /// relative paths in the result are relative to the mirror.
    pub fn command_line(&self, mirror: &Path, decrypted: &[PathBuf]) -> Vec<String> {
        let mut argv: Vec<String> = [
            "helm",
            "upgrade",
            "--install",
            "--wait",
            "--namespace",
            self.namespace.as_str(),
            "--create-namespace",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        for path in &self.value_paths {
            argv.push("--values".to_string());
            argv.push(join(&self.chart_path, path));
        }

        for path in &self.optional_value_paths {
            let expanded = expand_home(path);
            if mirror.join(&expanded).exists() {
                argv.push("--values".to_string());
                argv.push(expanded.display().to_string());
            } else {
                log::debug!("Optional values file {:?} not found, skipping", expanded);
            }
        }

        for path in decrypted {
            argv.push("--values".to_string());
            argv.push(path.display().to_string());
        }

        argv.push(self.release_name.clone());
        argv.push(self.install_path());
        argv
    }
}

#[async_trait]
impl GatedAction for ChartNode {
    fn title(&self) -> &str {
        &self.title
    }

    fn watch_prefixes(&self) -> &[String] {
        &self.watch
    }

    fn color(&self) -> &str {
        CHART_COLOR
    }

    async fn prepare(&self, snapshot: &Snapshot) -> Result<PreparedCommand, RunError> {
        let mirror = snapshot.local_path();

        let mut decrypted = Vec::with_capacity(self.sops_value_paths.len());
        for path in &self.sops_value_paths {
            let encrypted = mirror.join(&self.chart_path).join(path);
            decrypted.push(sops::decrypt_to_temp(&encrypted).await?);
        }

        let paths: Vec<PathBuf> = decrypted.iter().map(|t| t.to_path_buf()).collect();
        let mut prepared = PreparedCommand::new(self.command_line(mirror, &paths));
        for temp in decrypted {
            prepared.keep_alive(temp);
        }
        Ok(prepared)
    }
}

fn join(base: &str, path: &str) -> String {
    Path::new(base).join(path).display().to_string()
}

/// Expands a leading `~` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Builds the dependency graph; unknown dependencies and cycles are errors.
pub fn chart_graph(
    charts: Vec<ChartNode>,
) -> Result<DependencyGraph<Arc<ChartNode>>, GraphError> {
    let entries = charts.into_iter().map(|chart| {
        let dependencies = chart.dependencies.clone();
        (chart.name.clone(), dependencies, Arc::new(chart))
    });
    DependencyGraph::build(entries)
}

#[derive(Default)]
struct ChartTally {
    summary: RunSummary,
    failed: HashSet<String>,
}

/// Upgrades every chart in dependency order and waits for all of them.
///
/// A chart whose dependency failed still runs; the failure is only logged.
pub async fn run_charts(
    graph: DependencyGraph<Arc<ChartNode>>,
    snapshot: Arc<Snapshot>,
    runner: Arc<ActionRunner>,
) -> RunSummary {
    let tally = Arc::new(Mutex::new(ChartTally::default()));
    let recorder = Arc::clone(&tally);

    DependencyScheduler::new(graph)
        .run(move |chart: Arc<ChartNode>| {
            let snapshot = Arc::clone(&snapshot);
            let runner = Arc::clone(&runner);
            let tally = Arc::clone(&recorder);
            async move {
                {
                    let tally = tally.lock().unwrap_or_else(PoisonError::into_inner);
                    for dependency in &chart.dependencies {
                        if tally.failed.contains(dependency) {
                            log::warn!(
                                "Chart {} depends on {}, which failed; upgrading anyway",
                                chart.name,
                                dependency
                            );
                        }
                    }
                }

                let result = runner.run_if_changed(chart.as_ref(), &snapshot).await;
                let failed = match &result {
                    Ok(report) => match &report.action_error {
                        Some(err) => {
                            log::error!("upgrading Helm chart {}: {}", chart.chart_path, err);
                            true
                        }
                        None => false,
                    },
                    Err(e) => {
                        log::error!("upgrading Helm chart {}: {}", chart.chart_path, e);
                        true
                    }
                };

                let mut tally = tally.lock().unwrap_or_else(PoisonError::into_inner);
                tally.summary.record(&result);
                if failed {
                    tally.failed.insert(chart.name.clone());
                }
            }
        })
        .await;

    let summary = tally.lock().unwrap_or_else(PoisonError::into_inner).summary;
    summary
}
