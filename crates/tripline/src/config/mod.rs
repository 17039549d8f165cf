pub mod loader;
pub mod schema;
pub mod substitute;

pub use loader::{
    load_config, load_config_from_str, read_config_file, validate_config, CliOverrides,
    CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH,
};
pub use schema::{
    ChartConfig, Config, HelmConfig, JobConfig, RunOverrides, SlackConfig, TagConfig, TagModel,
};
pub use substitute::Substitute;
