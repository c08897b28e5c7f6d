//! argoqc - ArgoSlide quality control runner
//!
//! Processes the calibration images of one container (a local folder or a
//! repository dataset), publishes per-image results and updates the
//! instrument's summary table.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use argoqc::backends::local::{LocalLayout, LocalSink, LocalSource};
use argoqc::backends::remote::{HttpRepositoryClient, RemoteSink, RemoteSource, RepositoryClient};
use argoqc::backends::{ArtifactSink, WorkItemSource};
use argoqc::services::JsonMeasurementAnalyzer;
use argoqc::{Naming, Pipeline, PipelineConfig, RunReport};
use argoqc_common::config::{load_config, TomlConfig};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Backend {
    Local,
    Remote,
}

/// Command-line arguments for argoqc
#[derive(Parser, Debug)]
#[command(name = "argoqc")]
#[command(about = "Quality control of ArgoSlide calibration images")]
#[command(version)]
struct Args {
    /// TOML config file
    #[arg(short, long, env = "ARGOQC_CONFIG")]
    config: Option<PathBuf>,

    /// Where images are read from and results written to
    #[arg(short, long, value_enum, default_value = "local", env = "ARGOQC_BACKEND")]
    backend: Backend,

    /// Folder of images (local backend)
    #[arg(short, long, env = "ARGOQC_INPUT")]
    input: Option<PathBuf>,

    /// Folder receiving the instrument folder (local backend)
    #[arg(short, long, env = "ARGOQC_OUTPUT")]
    output: Option<PathBuf>,

    /// Repository container id (remote backend)
    #[arg(long, env = "ARGOQC_CONTAINER")]
    container: Option<String>,

    /// Reprocess every item not yet marked processed and start a new summary table
    #[arg(long, env = "ARGOQC_PROCESS_ALL")]
    process_all: bool,

    /// Do not render heatmaps
    #[arg(long, env = "ARGOQC_NO_HEATMAPS")]
    no_heatmaps: bool,

    /// Folder of measurement documents (defaults to the image folder)
    #[arg(short, long, env = "ARGOQC_MEASUREMENTS")]
    measurements: Option<PathBuf>,

    /// Repository gateway URL (remote backend)
    #[arg(long, env = "ARGOQC_URL")]
    url: Option<String>,

    /// Repository access token (remote backend)
    #[arg(long, env = "ARGOQC_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    let mut config = loaded.config;

    // RUST_LOG wins over the config file
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &loaded.source {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("No configuration file, using defaults"),
    }

    apply_overrides(&args, &mut config);
    let naming = Naming::from_markers(&config.markers);
    let pipeline_config = PipelineConfig::from_processing(&config.processing);
    let process_all = config.processing.process_all;
    let analyzer = JsonMeasurementAnalyzer::new(args.measurements.clone());
    let pipeline = Pipeline::new(naming.clone(), pipeline_config, Box::new(analyzer));

    let report = match args.backend {
        Backend::Local => {
            let (Some(input), Some(output)) = (&args.input, &args.output) else {
                bail!("The local backend needs --input and --output");
            };
            let layout = LocalLayout::resolve(input, output)
                .context("Failed to prepare the local folders")?;
            let source = LocalSource::new(&layout, naming.clone(), process_all);
            let mut sink = LocalSink::new(&layout, naming);
            run(&pipeline, &source, &mut sink)?
        }
        Backend::Remote => {
            let Some(container) = args.container.clone() else {
                bail!("The remote backend needs --container");
            };
            let Some(url) = config.remote.base_url.clone() else {
                bail!("The remote backend needs --url or [remote] base_url");
            };
            let client: Rc<dyn RepositoryClient> = Rc::new(
                HttpRepositoryClient::new(
                    &url,
                    config.remote.token.clone(),
                    Duration::from_secs(config.remote.timeout_secs),
                )
                .context("Failed to create the repository client")?,
            );
            let source = RemoteSource::new(client.clone(), container.clone(), naming.clone(), process_all);
            let mut sink = RemoteSink::new(client, container, naming)
                .context("Failed to open the repository container")?;
            run(&pipeline, &source, &mut sink)?
        }
    };

    log_report(&report);
    Ok(())
}

/// CLI and environment values take priority over the config file
fn apply_overrides(args: &Args, config: &mut TomlConfig) {
    if args.process_all {
        config.processing.process_all = true;
    }
    if args.no_heatmaps {
        config.processing.save_heatmaps = false;
    }
    if let Some(url) = &args.url {
        config.remote.base_url = Some(url.clone());
    }
    if let Some(token) = &args.token {
        config.remote.token = Some(token.clone());
    }
}

fn run(
    pipeline: &Pipeline,
    source: &dyn WorkItemSource,
    sink: &mut dyn ArtifactSink,
) -> Result<RunReport> {
    pipeline
        .run(source, sink)
        .with_context(|| format!("Failed to list items of {}", source.container()))
}

fn log_report(report: &RunReport) {
    info!(
        container = %report.container,
        listed = report.listed,
        processed = report.processed.len(),
        failed = report.failed.len(),
        summary_rows = report.summary_rows,
        summary_table = report.summary_table.as_deref().unwrap_or("-"),
        "Run summary"
    );
    for (name, error) in &report.failed {
        warn!(item = %name, error = %error, "Not processed");
    }
}
