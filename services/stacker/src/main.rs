//! Scene stacker service.
//!
//! Turns a tree of analysis-ready scene archives into one stacked
//! multi-band composite per scene using a fixed pool of workers.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use config::RunArgs;
use stacking::{identify_tile, run_pipeline, GdalCli};

#[derive(Parser, Debug)]
#[command(name = "stacker")]
#[command(about = "Stack analysis-ready scene archives into multi-band composites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level
    #[arg(long, global = true, default_value = "info", env = "STACKER_LOG_LEVEL")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stack every archive under the input directory
    Run(RunArgs),

    /// Print the grid tile containing a raster's upper-left corner
    Tile {
        /// Raster file to inspect
        raster: PathBuf,

        /// YAML configuration file (tools and grid)
        #[arg(short, long, env = "STACKER_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Tile { raster, config } => tile(raster, config.as_ref()).await,
    }
}

fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    match format {
        LogFormat::Json => {
            tracing::subscriber::set_global_default(builder.json().finish())?;
        }
        LogFormat::Text => {
            tracing::subscriber::set_global_default(builder.finish())?;
        }
    }
    Ok(())
}

async fn run(args: RunArgs) -> Result<()> {
    let config = args.resolve()?;
    info!(
        input = %config.input_dir.display(),
        output = %config.output_dir.display(),
        work = %config.work_dir.display(),
        product = %config.product,
        workers = config.workers,
        queue_capacity = config.queue_capacity,
        "Loaded configuration"
    );

    let tool = Arc::new(GdalCli::new(config.tools.clone()));
    let summary = run_pipeline(config, tool).await.map_err(|e| {
        error!(error = %e, "Stacking run failed");
        e
    })?;

    info!(
        built = summary.built,
        skipped = summary.skipped,
        failed = summary.failed,
        workers_terminated = summary.terminated,
        abnormal_terminations = summary.abnormal,
        elapsed_secs = summary.elapsed.as_secs_f64(),
        "Run summary"
    );
    Ok(())
}

async fn tile(raster: PathBuf, config_path: Option<&PathBuf>) -> Result<()> {
    let settings = config::raster_settings(config_path)?;
    let tool = GdalCli::new(settings.tools);

    let tile = identify_tile(&tool, &raster, &settings.grid)
        .await
        .with_context(|| format!("Failed to read {}", raster.display()))?;

    info!(raster = %raster.display(), tile = %tile, "Identified tile");
    println!("{}", tile);
    Ok(())
}
