use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::schema::{Config, HelmConfig, TagModel};
use crate::config::substitute::Substitute;
use crate::error::ConfigError;
use crate::snapshot::TagPolicy;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "TRIPLINE_CONFIG";
/// Config file used when `TRIPLINE_CONFIG` is unset. It may be absent.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/tripline.toml";

/// Values given on the command line; each one that is set wins over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub repo_url: Option<String>,
    pub branch: Option<String>,
    pub helm_charts_path: Option<String>,
    pub mirror_dir: Option<String>,
    pub dry_run: bool,
    pub force_rerun: bool,
}

impl CliOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(repo_url) = &self.repo_url {
            config.repo_url = repo_url.clone();
        }
        if let Some(branch) = &self.branch {
            config.branch = branch.clone();
        }
        if let Some(mirror_dir) = &self.mirror_dir {
            config.mirror_dir = mirror_dir.clone();
        }
        if let Some(charts_path) = &self.helm_charts_path {
            match config.helm.as_mut() {
                Some(helm) => helm.charts_path = charts_path.clone(),
                None => {
                    config.helm = Some(HelmConfig {
                        charts_path: charts_path.clone(),
                        env: None,
                    })
                }
            }
        }
        config.dry_run |= self.dry_run;
        config.force_rerun |= self.force_rerun;
    }
}

/// Loads the configuration: file, then flags, then substitution, then validation.
pub fn load_config(cli: &CliOverrides) -> Result<Config, ConfigError> {
    let (path, explicit) = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => (PathBuf::from(path), true),
        Err(_) => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    let mut config = if path.exists() || explicit {
        read_config_file(&path)?
    } else {
        log::debug!("No config file at {:?}, using flags only", path);
        Config::default()
    };

    cli.apply(&mut config);
    config.substitute()?;
    validate_config(&config)?;

    Ok(config)
}

pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, path)
}

pub fn load_config_from_str(content: &str, path: &Path) -> Result<Config, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.repo_url.is_empty() {
        return Err(ConfigError::Validation {
            message: "repo_url is required".to_string(),
        });
    }
    if config.branch.is_empty() {
        return Err(ConfigError::Validation {
            message: "branch is required".to_string(),
        });
    }

    TagPolicy::from_config(&config.tag)?;

    if let Some(helm) = &config.helm {
        if helm.charts_path.is_empty() {
            return Err(ConfigError::Validation {
                message: "helm.charts_path must not be empty".to_string(),
            });
        }
    }

    if let Some(slack) = &config.slack {
        if slack.channel.is_empty() || slack.token.is_empty() {
            return Err(ConfigError::Validation {
                message: "slack.channel and slack.token are required".to_string(),
            });
        }
    }

    for (name, job) in &config.jobs {
        if job.exec_line.is_empty() || job.exec_line[0].is_empty() {
            return Err(ConfigError::Validation {
                message: format!("job '{}' has an empty exec_line", name),
            });
        }
        if job.watch_paths.is_empty() {
            return Err(ConfigError::Validation {
                message: format!("job '{}' has no watch_paths", name),
            });
        }
        if let Some(color) = &job.slack_color {
            if !is_hex_color(color) {
                return Err(ConfigError::InvalidColor {
                    job: name.clone(),
                    color: color.clone(),
                });
            }
        }
    }

    Ok(())
}

fn is_hex_color(value: &str) -> bool {
    // #rgb, #rgba, #rrggbb or #rrggbbaa
    let Some(digits) = value.strip_prefix('#') else {
        return false;
    };
    matches!(digits.len(), 3 | 4 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

impl TagPolicy {
    pub fn from_config(tag: &crate::config::schema::TagConfig) -> Result<Self, ConfigError> {
        let value = tag.value.as_deref().filter(|v| !v.is_empty());
        match tag.model {
            TagModel::Disabled => Ok(TagPolicy::Disabled),
            TagModel::Static => value
                .map(|v| TagPolicy::Static(v.to_string()))
                .ok_or_else(|| ConfigError::InvalidTagPolicy {
                    reason: "model 'static' requires a value".to_string(),
                }),
            TagModel::Semver => Ok(TagPolicy::SemverLatest {
                include_prerelease: tag.include_prerelease,
            }),
            TagModel::Pattern => {
                let pattern = value.ok_or_else(|| ConfigError::InvalidTagPolicy {
                    reason: "model 'pattern' requires a regular expression value".to_string(),
                })?;
                let regex = Regex::new(pattern).map_err(|e| ConfigError::InvalidTagPolicy {
                    reason: format!("invalid pattern '{}': {}", pattern, e),
                })?;
                Ok(TagPolicy::PatternLatest(regex))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TagConfig;

    const MINIMAL: &str = r#"
        repo_url = "https://git.example.com/infra.git"
        branch = "main"
    "#;

    fn parse(content: &str) -> Config {
        load_config_from_str(content, Path::new("tripline.toml")).unwrap()
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = parse(MINIMAL);
        assert_eq!(config.mirror_dir, ".");
        assert_eq!(config.tag.model, TagModel::Disabled);
        assert!(config.helm.is_none());
        assert!(config.jobs.is_empty());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r##"
            repo_url = "https://git.example.com/infra.git"
            branch = "main"
            dry_run = true

            [tag]
            model = "semver"

            [helm]
            charts_path = "charts"
            env = "staging"

            [slack]
            channel = "#deploys"
            token = "%env%:SLACK_TOKEN"

            [jobs.terraform]
            exec_line = ["terraform", "apply", "-auto-approve"]
            watch_paths = ["terraform/"]
            slack_color = "#ffaa00"
        "##,
        );

        assert!(config.dry_run);
        assert_eq!(config.tag.model, TagModel::Semver);
        assert_eq!(
            config.helm.as_ref().unwrap().env.as_deref(),
            Some("staging")
        );
        assert_eq!(config.jobs["terraform"].exec_line.len(), 3);
        assert_eq!(
            config.jobs["terraform"].slack_color.as_deref(),
            Some("#ffaa00")
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let err = load_config_from_str("repo_url = ", Path::new("/etc/tripline.toml")).unwrap_err();
        assert!(err.to_string().contains("/etc/tripline.toml"));
    }

    #[test]
    fn test_validation_failures() {
        let cases: &[(&str, &str)] = &[
            (r#"branch = "main""#, "repo_url is required"),
            (r#"repo_url = "x""#, "branch is required"),
            (
                r#"
                repo_url = "x"
                branch = "main"
                [jobs.empty]
                exec_line = []
                watch_paths = ["a/"]
                "#,
                "empty exec_line",
            ),
            (
                r#"
                repo_url = "x"
                branch = "main"
                [jobs.nowatch]
                exec_line = ["true"]
                watch_paths = []
                "#,
                "no watch_paths",
            ),
            (
                r#"
                repo_url = "x"
                branch = "main"
                [jobs.color]
                exec_line = ["true"]
                watch_paths = ["a/"]
                slack_color = "red"
                "#,
                "Invalid color",
            ),
            (
                r#"
                repo_url = "x"
                branch = "main"
                [tag]
                model = "pattern"
                value = "v(["
                "#,
                "invalid pattern",
            ),
            (
                r#"
                repo_url = "x"
                branch = "main"
                [tag]
                model = "static"
                "#,
                "requires a value",
            ),
            (
                r##"
                repo_url = "x"
                branch = "main"
                [slack]
                channel = "#deploys"
                token = ""
                "##,
                "slack.channel and slack.token",
            ),
        ];

        for (content, expected) in cases {
            let config = parse(content);
            let err = validate_config(&config).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "expected '{}' in '{}'",
                expected, err
            );
        }
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = parse(MINIMAL);
        let cli = CliOverrides {
            branch: Some("release".to_string()),
            helm_charts_path: Some("deploy/charts".to_string()),
            force_rerun: true,
            ..CliOverrides::default()
        };
        cli.apply(&mut config);

        assert_eq!(config.repo_url, "https://git.example.com/infra.git");
        assert_eq!(config.branch, "release");
        assert_eq!(config.helm.unwrap().charts_path, "deploy/charts");
        assert!(config.force_rerun);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_cli_false_flag_keeps_file_value() {
        let mut config = parse(&format!("{}\ndry_run = true", MINIMAL));
        CliOverrides::default().apply(&mut config);
        assert!(config.dry_run);
    }

    #[test]
    fn test_tag_policy_from_config() {
        let policy = TagPolicy::from_config(&TagConfig {
            model: TagModel::Pattern,
            value: Some(r"^prod-\d+$".to_string()),
            include_prerelease: false,
        })
        .unwrap();
        assert!(matches!(policy, TagPolicy::PatternLatest(_)));

        let policy = TagPolicy::from_config(&TagConfig {
            model: TagModel::Semver,
            value: None,
            include_prerelease: true,
        })
        .unwrap();
        assert!(matches!(
            policy,
            TagPolicy::SemverLatest {
                include_prerelease: true,
            }
        ));
    }

    #[test]
    fn test_hex_colors() {
        assert!(is_hex_color("#10148c"));
        assert!(is_hex_color("#FFF"));
        assert!(!is_hex_color("10148c"));
        assert!(!is_hex_color("#12345"));
        assert!(!is_hex_color("#gggggg"));
    }
}
