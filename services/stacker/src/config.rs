//! Resolution of the run configuration from file, environment and flags.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use scene_common::ProductCode;
use stacking::{RasterSettings, StackerConfig};

/// Flags of the `run` command. Each one overrides the config file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Root directory containing scene archives
    #[arg(short, long, env = "STACKER_INPUT_DIR")]
    pub input: Option<PathBuf>,

    /// Root directory for stacked composites
    #[arg(short, long, env = "STACKER_OUTPUT_DIR")]
    pub output: Option<PathBuf>,

    /// Product code of the archives to stack (TA, SR, ...)
    #[arg(short, long, env = "STACKER_PRODUCT")]
    pub product: Option<String>,

    /// Directory for per-worker scratch workspaces
    #[arg(short, long, env = "STACKER_WORK_DIR")]
    pub workdir: Option<PathBuf>,

    /// Number of concurrent workers
    #[arg(short = 'n', long, env = "STACKER_WORKERS")]
    pub workers: Option<usize>,

    /// Maximum number of queued archives
    #[arg(long, env = "STACKER_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// YAML configuration file
    #[arg(short, long, env = "STACKER_CONFIG")]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    /// Merge the optional config file with the command-line values and validate.
    pub fn resolve(&self) -> Result<StackerConfig> {
        let mut config = match &self.config {
            Some(path) => StackerConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => self.required_config()?,
        };

        if let Some(input) = &self.input {
            config.input_dir = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(workdir) = &self.workdir {
            config.work_dir = workdir.clone();
        }
        if let Some(product) = &self.product {
            config.product = parse_product(product)?;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn required_config(&self) -> Result<StackerConfig> {
        let (Some(input), Some(output), Some(workdir), Some(product)) =
            (&self.input, &self.output, &self.workdir, &self.product)
        else {
            bail!("--input, --output, --workdir and --product are required without --config");
        };
        Ok(StackerConfig::new(
            input,
            output,
            workdir,
            parse_product(product)?,
        ))
    }
}

fn parse_product(code: &str) -> Result<ProductCode> {
    ProductCode::new(code).with_context(|| format!("Invalid product code '{}'", code))
}

/// Tool and grid settings for the `tile` command.
pub fn raster_settings(config: Option<&PathBuf>) -> Result<RasterSettings> {
    match config {
        Some(path) => RasterSettings::from_yaml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(RasterSettings::default()),
    }
}
