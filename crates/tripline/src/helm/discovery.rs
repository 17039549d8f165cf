//! Finds charts in the mirror by their `tripline.toml` files.

use std::path::Path;

use super::ChartNode;
use crate::config::{ChartConfig, HelmConfig};
use crate::error::ConfigError;

const CHART_CONFIG_STEM: &str = "tripline";

/// File name of the per-chart config, `tripline.toml` or `tripline.<env>.toml`.
pub fn chart_config_name(env: Option<&str>) -> String {
    match env {
        Some(env) if !env.is_empty() => format!("{}.{}.toml", CHART_CONFIG_STEM, env),
        _ => format!("{}.toml", CHART_CONFIG_STEM),
    }
}

/// Loads every chart under `<mirror>/<charts_path>`, sorted by name.
///
/// Sub-directories without a config file are not charts and are skipped.
pub fn discover_charts(mirror: &Path, helm: &HelmConfig) -> Result<Vec<ChartNode>, ConfigError> {
    let charts_dir = mirror.join(&helm.charts_path);
    let config_name = chart_config_name(helm.env.as_deref());

    let entries = std::fs::read_dir(&charts_dir).map_err(|e| ConfigError::ReadDirectory {
        path: charts_dir.clone(),
        source: e,
    })?;

    let mut charts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::ReadDirectory {
            path: charts_dir.clone(),
            source: e,
        })?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        let config_path = entry.path().join(&config_name);
        if !config_path.is_file() {
            log::debug!("Skipping {:?}: no {}", entry.path(), config_name);
            continue;
        }

        let content = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadFile {
            path: config_path.clone(),
            source: e,
        })?;
        let config: ChartConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseToml {
            path: config_path.clone(),
            source: e,
        })?;
        validate_chart_config(&name, &config)?;

        let chart_path = chart_path(&helm.charts_path, &name);
        charts.push(ChartNode::from_config(name, chart_path, config));
    }

    charts.sort_by(|a, b| a.name.cmp(&b.name));
    log::info!("Discovered {} chart(s) in {:?}", charts.len(), charts_dir);
    Ok(charts)
}

fn validate_chart_config(name: &str, config: &ChartConfig) -> Result<(), ConfigError> {
    if config.release_name.is_empty() {
        return Err(ConfigError::Validation {
            message: format!("chart '{}' has no release_name", name),
        });
    }
    if config.namespace.is_empty() {
        return Err(ConfigError::Validation {
            message: format!("chart '{}' has no namespace", name),
        });
    }
    Ok(())
}

/// Repository-relative chart directory, in the form diff paths use.
fn chart_path(charts_path: &str, name: &str) -> String {
    let base = charts_path.trim_start_matches("./").trim_end_matches('/');
    if base.is_empty() || base == "." {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}
