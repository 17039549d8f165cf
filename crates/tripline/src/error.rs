use std::path::PathBuf;
use thiserror::Error;

use crate::scheduler::GraphError;
use crate::snapshot::SnapshotError;

#[derive(Error, Debug)]
pub enum TriplineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read chart directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse TOML in '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Environment variable {name} is not set")]
    EnvVarNotSet { name: String },

    #[error("Failed to read substitution file '{path}': {source}")]
    SubstitutionFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid tag policy: {reason}")]
    InvalidTagPolicy { reason: String },

    #[error("Invalid color '{color}' for job '{job}', expected a hex color like #10148c")]
    InvalidColor { job: String, color: String },

    #[error("Invalid chart dependency graph: {0}")]
    Graph(#[from] GraphError),
}

pub type Result<T> = std::result::Result<T, TriplineError>;
