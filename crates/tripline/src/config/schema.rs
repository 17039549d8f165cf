use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level daemon configuration, read from `tripline.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// URL of the tracked repository.
    #[serde(default)]
    pub repo_url: String,
    /// Branch of the tracked repository.
    #[serde(default)]
    pub branch: String,
    /// Report what would run without spawning anything.
    #[serde(default)]
    pub dry_run: bool,
    /// Treat every watch path as changed.
    #[serde(default)]
    pub force_rerun: bool,
    /// Directory holding the local mirrors. Defaults to the working directory.
    #[serde(default = "default_mirror_dir")]
    pub mirror_dir: String,
    #[serde(default)]
    pub tag: TagConfig,
    #[serde(default)]
    pub helm: Option<HelmConfig>,
    #[serde(default)]
    pub slack: Option<SlackConfig>,
    #[serde(default)]
    pub jobs: BTreeMap<String, JobConfig>,
}

fn default_mirror_dir() -> String {
    ".".to_string()
}

impl Config {
    /// Returns the run-wide overrides consulted by the change gate.
    pub fn overrides(&self) -> RunOverrides {
        RunOverrides {
            force_rerun: self.force_rerun,
            dry_run: self.dry_run,
        }
    }
}

/// Flags that short-circuit change detection for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub force_rerun: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagModel {
    #[default]
    Disabled,
    Static,
    Semver,
    Pattern,
}

/// How a release tag is picked after pulling the branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagConfig {
    #[serde(default)]
    pub model: TagModel,
    /// Revision expression for `static`, regular expression for `pattern`.
    #[serde(default)]
    pub value: Option<String>,
    /// Let `semver` pick pre-release tags such as `2.0.0-rc1`.
    #[serde(default)]
    pub include_prerelease: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelmConfig {
    /// Repository-relative directory containing one sub-directory per chart.
    pub charts_path: String,
    /// Selects `tripline.<env>.toml` instead of `tripline.toml`.
    #[serde(default)]
    pub env: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlackConfig {
    pub channel: String,
    pub token: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub exec_line: Vec<String>,
    pub watch_paths: Vec<String>,
    #[serde(default)]
    pub slack_color: Option<String>,
}

/// Per-chart configuration, stored next to the chart as `tripline.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub release_name: String,
    pub namespace: String,
    #[serde(default)]
    pub chart_path_override: Option<String>,
    /// Chart-relative values files.
    #[serde(default)]
    pub value_paths: Vec<String>,
    /// Absolute (or `~`-relative) values files, used only when present.
    #[serde(default)]
    pub optional_value_paths: Vec<String>,
    /// Chart-relative sops-encrypted values files.
    #[serde(default)]
    pub sops_value_paths: Vec<String>,
    /// Names of charts that must be upgraded first.
    #[serde(default)]
    pub dependencies: Vec<String>,
}
