//! Scene stacking library.
//!
//! Turns a tree of analysis-ready scene archives into one multi-band
//! composite raster per scene.
//!
//! # Architecture
//!
//! A single dispatcher walks the input tree and feeds a bounded queue; a
//! fixed pool of workers, each with a private scratch workspace, unpacks one
//! archive at a time, resolves the sensor's band set and builds the composite
//! through a [`RasterTool`]. Every step is reported to one progress
//! aggregator, which also acts as the run's completion barrier.
//!
//! - Archive discovery ([`Scanner`])
//! - Safe extraction with path traversal checks ([`extract()`])
//! - Band set resolution per sensor generation ([`BandSet`])
//! - Composite construction with atomic output ([`StackBuilder`])
//! - Worker pool with poison-pill shutdown ([`pipeline`])

pub mod bands;
pub mod config;
pub mod error;
mod extract;
pub mod pipeline;
pub mod raster;
mod scanner;
mod stack;
mod workspace;

// Re-exports
pub use bands::{spectral_band_codes, BandSet, LEGACY_BAND_CODES, OLI_BAND_CODES};
pub use config::{
    RasterSettings, StackerConfig, ToolConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS,
};
pub use error::{Result, StackError};
pub use extract::extract;
pub use pipeline::{
    run_pipeline, Dispatcher, EventKind, ItemOutcome, ProgressAggregator, ProgressEvent,
    RunSummary, WorkItem, WorkerPool,
};
pub use raster::{identify_tile, parse_gdalinfo, GdalCli, RasterInfo, RasterTool};
pub use scanner::{Archives, Scanner};
pub use stack::{output_path, StackBuilder, StackJob, StackPhase};
pub use workspace::Workspace;
