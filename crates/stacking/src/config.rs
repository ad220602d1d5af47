//! Run configuration.
//!
//! Loads an optional YAML file (with `${VAR}` and `${VAR:-default}`
//! substitution) into [`StackerConfig`]. Command-line values are layered on
//! top by the service before [`StackerConfig::validate`] runs.

use std::fs;
use std::path::{Path, PathBuf};

use scene_common::{GridDefinition, ProductCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StackError};

/// Number of workers when none is configured.
pub const DEFAULT_WORKERS: usize = 20;

/// Bounded queue depth between the dispatcher and the workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Top-level stacker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackerConfig {
    /// Root of the archive tree to scan
    pub input_dir: PathBuf,

    /// Root under which `<base>/<base>_<product>stack.tif` is written
    pub output_dir: PathBuf,

    /// Root under which per-worker workspaces `worker<i>` are created
    pub work_dir: PathBuf,

    /// Product tag selecting the band family (TA, SR, ...)
    pub product: ProductCode,

    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the work queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// External raster tool settings
    #[serde(default)]
    pub tools: ToolConfig,

    /// Tiling grid used for tile lookups
    #[serde(default)]
    pub grid: GridDefinition,
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// Commands used to reach the raster library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub buildvrt: String,
    pub translate: String,
    pub info: String,
    /// Driver name passed to the translate step
    pub output_format: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            buildvrt: "gdalbuildvrt".to_string(),
            translate: "gdal_translate".to_string(),
            info: "gdalinfo".to_string(),
            output_format: "GTiff".to_string(),
        }
    }
}

impl StackerConfig {
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
        product: ProductCode,
    ) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            work_dir: work_dir.into(),
            product,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            tools: ToolConfig::default(),
            grid: GridDefinition::default(),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Load a YAML configuration file with environment substitution.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        load_yaml_file(path.as_ref())
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        parse_yaml(content)
    }

    /// The raster-only part of this configuration.
    pub fn raster_settings(&self) -> RasterSettings {
        RasterSettings {
            tools: self.tools.clone(),
            grid: self.grid,
        }
    }

    /// Check values that would otherwise fail only once workers are running.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(StackError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(StackError::InvalidConfig(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if !self.input_dir.is_dir() {
            return Err(StackError::InvalidConfig(format!(
                "input directory {} does not exist",
                self.input_dir.display()
            )));
        }
        if self.tools.output_format.is_empty() {
            return Err(StackError::InvalidConfig(
                "tools.output_format cannot be empty".to_string(),
            ));
        }
        self.grid
            .validate()
            .map_err(|e| StackError::InvalidConfig(e.to_string()))?;
        Ok(())
    }
}

/// Tool and grid settings, enough to inspect single rasters.
///
/// Reads the same YAML file as [`StackerConfig`] and ignores the run fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RasterSettings {
    #[serde(default)]
    pub tools: ToolConfig,
    #[serde(default)]
    pub grid: GridDefinition,
}

impl RasterSettings {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Self = load_yaml_file(path.as_ref())?;
        settings
            .grid
            .validate()
            .map_err(|e| StackError::InvalidConfig(e.to_string()))?;
        Ok(settings)
    }
}

fn load_yaml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        StackError::InvalidConfig(format!("failed to read {}: {}", path.display(), e))
    })?;
    parse_yaml(&content)
}

fn parse_yaml<T: DeserializeOwned>(content: &str) -> Result<T> {
    let expanded = expand_env_vars(content)?;
    serde_yaml::from_str(&expanded)
        .map_err(|e| StackError::InvalidConfig(format!("failed to parse YAML: {}", e)))
}

/// Expand environment variables in YAML content.
/// Supports ${VAR} and ${VAR:-default} syntax.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(c) => var_expr.push(c),
                    None => {
                        return Err(StackError::InvalidConfig(format!(
                            "unclosed variable substitution: ${{{}",
                            var_expr
                        )))
                    }
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).map_err(|_| {
            StackError::InvalidConfig(format!("environment variable {} not set", expr))
        })
    }
}
