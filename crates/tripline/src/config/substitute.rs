//! `%env%:` and `%file%:` substitution over the configuration tree.
//!
//! Each configuration type walks its own fields; only `String` values are
//! rewritten. A value of `%env%:SLACK_TOKEN` is replaced by that environment
//! variable, and `%file%:/run/secrets/token` by the trimmed file contents.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::schema::{Config, HelmConfig, JobConfig, SlackConfig, TagConfig};
use crate::error::ConfigError;

const ENV_PREFIX: &str = "%env%:";
const FILE_PREFIX: &str = "%file%:";

pub trait Substitute {
    fn substitute(&mut self) -> Result<(), ConfigError>;
}

impl Substitute for String {
    fn substitute(&mut self) -> Result<(), ConfigError> {
        if let Some(name) = self.strip_prefix(ENV_PREFIX) {
            let value = std::env::var(name).map_err(|_| ConfigError::EnvVarNotSet {
                name: name.to_string(),
            })?;
            *self = value;
        } else if let Some(path) = self.strip_prefix(FILE_PREFIX) {
            let path = PathBuf::from(path);
            let content =
                std::fs::read_to_string(&path).map_err(|e| ConfigError::SubstitutionFile {
                    path,
                    source: e,
                })?;
            *self = content.trim().to_string();
        }
        Ok(())
    }
}

impl<T: Substitute> Substitute for Option<T> {
    fn substitute(&mut self) -> Result<(), ConfigError> {
        match self {
            Some(value) => value.substitute(),
            None => Ok(()),
        }
    }
}

impl<T: Substitute> Substitute for Vec<T> {
    fn substitute(&mut self) -> Result<(), ConfigError> {
        self.iter_mut().try_for_each(Substitute::substitute)
    }
}

impl<T: Substitute> Substitute for BTreeMap<String, T> {
    fn substitute(&mut self) -> Result<(), ConfigError> {
        self.values_mut().try_for_each(Substitute::substitute)
    }
}

impl Substitute for Config {
    fn substitute(&mut self) -> Result<(), ConfigError> {
        self.repo_url.substitute()?;
        self.branch.substitute()?;
        self.mirror_dir.substitute()?;
        self.tag.substitute()?;
        self.helm.substitute()?;
        self.slack.substitute()?;
        self.jobs.substitute()
    }
}

impl Substitute for TagConfig {
    fn substitute(&mut self) -> Result<(), ConfigError> {
        self.value.substitute()
    }
}

impl Substitute for HelmConfig {
    fn substitute(&mut self) -> Result<(), ConfigError> {
        self.charts_path.substitute()?;
        self.env.substitute()
    }
}

impl Substitute for SlackConfig {
    fn substitute(&mut self) -> Result<(), ConfigError> {
        self.channel.substitute()?;
        self.token.substitute()
    }
}

impl Substitute for JobConfig {
    fn substitute(&mut self) -> Result<(), ConfigError> {
        self.exec_line.substitute()?;
        self.watch_paths.substitute()?;
        self.slack_color.substitute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_env_substitution() {
        std::env::set_var("TRIPLINE_TEST_TOKEN", "xoxb-123");
        let mut value = "%env%:TRIPLINE_TEST_TOKEN".to_string();
        value.substitute().unwrap();
        assert_eq!(value, "xoxb-123");
        std::env::remove_var("TRIPLINE_TEST_TOKEN");
    }

    #[test]
    #[serial]
    fn test_missing_env_is_error() {
        std::env::remove_var("TRIPLINE_TEST_MISSING");
        let mut value = "%env%:TRIPLINE_TEST_MISSING".to_string();
        let err = value.substitute().unwrap_err();
        match err {
            ConfigError::EnvVarNotSet { name } => assert_eq!(name, "TRIPLINE_TEST_MISSING"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_substitution_trims() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  secret-token  ").unwrap();
        let mut value = format!("%file%:{}", file.path().display());
        value.substitute().unwrap();
        assert_eq!(value, "secret-token");
    }

    #[test]
    fn test_plain_strings_untouched() {
        let mut value = "https://example.com/%env%:NOPE".to_string();
        value.substitute().unwrap();
        assert_eq!(value, "https://example.com/%env%:NOPE");
    }

    #[test]
    #[serial]
    fn test_walks_nested_config() {
        std::env::set_var("TRIPLINE_TEST_CHANNEL", "#deploys");
        std::env::set_var("TRIPLINE_TEST_KUBECONFIG", "/etc/kube/config");

        let mut config = Config {
            slack: Some(SlackConfig {
                channel: "%env%:TRIPLINE_TEST_CHANNEL".to_string(),
                token: "literal".to_string(),
            }),
            ..Config::default()
        };
        config.jobs.insert(
            "kubectl".to_string(),
            JobConfig {
                exec_line: vec![
                    "kubectl".to_string(),
                    "--kubeconfig".to_string(),
                    "%env%:TRIPLINE_TEST_KUBECONFIG".to_string(),
                ],
                watch_paths: vec!["manifests/".to_string()],
                slack_color: None,
            },
        );

        config.substitute().unwrap();

        let slack = config.slack.as_ref().unwrap();
        assert_eq!(slack.channel, "#deploys");
        assert_eq!(slack.token, "literal");
        assert_eq!(config.jobs["kubectl"].exec_line[2], "/etc/kube/config");

        std::env::remove_var("TRIPLINE_TEST_CHANNEL");
        std::env::remove_var("TRIPLINE_TEST_KUBECONFIG");
    }
}
