//! tripline - re-run deployment jobs and Helm charts whose watched paths changed

use clap::{Parser, ValueEnum};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::{EnvFilter, Registry};

use tripline::config::CliOverrides;
use tripline::{load_config, Daemon, RunOutcome};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "tripline")]
#[command(version)]
#[command(about = "Change-triggered deployment automation", long_about = None)]
struct Cli {
    /// URL of the repository to track
    #[arg(long = "repo")]
    repo_url: Option<String>,

    /// Branch to track
    #[arg(long)]
    branch: Option<String>,

    /// Repository-relative directory holding one sub-directory per chart
    #[arg(long)]
    helm_charts_path: Option<String>,

    /// Directory for local mirrors
    #[arg(long)]
    mirror_dir: Option<String>,

    /// Report what would run without executing anything
    #[arg(long)]
    dry_run: bool,

    /// Run every job and chart regardless of what changed
    #[arg(long)]
    force_rerun: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value_t = LogFormat::Text,
        env = "TRIPLINE_LOG_FORMAT"
    )]
    log_format: LogFormat,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            repo_url: self.repo_url.clone(),
            branch: self.branch.clone(),
            helm_charts_path: self.helm_charts_path.clone(),
            mirror_dir: self.mirror_dir.clone(),
            dry_run: self.dry_run,
            force_rerun: self.force_rerun,
        }
    }
}

fn init_logging(format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    tracing_log::LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Text => Box::new(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true),
        ),
    };

    let subscriber = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(filter);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let config = match load_config(&cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "Starting tripline v{} for {} ({})",
        env!("CARGO_PKG_VERSION"),
        config.repo_url,
        config.branch
    );

    match Daemon::new(config).run().await {
        Ok(RunOutcome::UpToDate) => {}
        Ok(RunOutcome::Dispatched { charts, jobs }) => {
            log::debug!("Finished: charts {:?}, jobs {:?}", charts, jobs);
        }
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    }
}
