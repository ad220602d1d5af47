//! Shared helpers for stacking integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use scene_common::{GeoTransform, ProductCode};
use stacking::{RasterInfo, RasterTool, StackError, StackerConfig};
use test_utils::RunDirs;

/// In-process raster tool.
///
/// `build_vrt` writes the input file names, one per line, as the descriptor;
/// `translate` copies the descriptor to the output. A composite therefore
/// lists its bands in order.
#[derive(Default)]
pub struct FakeRasterTool {
    pub vrt_calls: AtomicUsize,
    pub translate_calls: AtomicUsize,
}

#[async_trait]
impl RasterTool for FakeRasterTool {
    async fn build_vrt(&self, inputs: &[PathBuf], descriptor: &Path) -> stacking::Result<()> {
        self.vrt_calls.fetch_add(1, Ordering::SeqCst);
        let listing: Vec<String> = inputs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        tokio::fs::write(descriptor, listing.join("\n")).await?;
        Ok(())
    }

    async fn translate(&self, source: &Path, output: &Path) -> stacking::Result<()> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::copy(source, output).await?;
        Ok(())
    }

    async fn info(&self, raster: &Path) -> stacking::Result<RasterInfo> {
        let listing = tokio::fs::read_to_string(raster).await?;
        Ok(RasterInfo {
            width: 5000,
            height: 5000,
            band_count: listing.lines().count(),
            geotransform: GeoTransform([-2_115_585.0, 30.0, 0.0, 2_114_805.0, 0.0, -30.0]),
            projection: String::new(),
        })
    }
}

/// Raster tool that cannot open anything.
pub struct FailingRasterTool;

#[async_trait]
impl RasterTool for FailingRasterTool {
    async fn build_vrt(&self, _inputs: &[PathBuf], _descriptor: &Path) -> stacking::Result<()> {
        Err(StackError::RasterOpen("cannot open inputs".to_string()))
    }

    async fn translate(&self, _source: &Path, _output: &Path) -> stacking::Result<()> {
        Err(StackError::RasterOpen("cannot open descriptor".to_string()))
    }

    async fn info(&self, _raster: &Path) -> stacking::Result<RasterInfo> {
        Err(StackError::RasterOpen("cannot open raster".to_string()))
    }
}

/// Raster tool that panics while building descriptors for one scene.
pub struct PanickingRasterTool {
    pub poisoned_base: String,
    pub inner: FakeRasterTool,
}

#[async_trait]
impl RasterTool for PanickingRasterTool {
    async fn build_vrt(&self, inputs: &[PathBuf], descriptor: &Path) -> stacking::Result<()> {
        let name = descriptor.file_name().unwrap().to_string_lossy();
        if name.starts_with(&self.poisoned_base) {
            panic!("raster library crashed on {}", name);
        }
        self.inner.build_vrt(inputs, descriptor).await
    }

    async fn translate(&self, source: &Path, output: &Path) -> stacking::Result<()> {
        self.inner.translate(source, output).await
    }

    async fn info(&self, raster: &Path) -> stacking::Result<RasterInfo> {
        self.inner.info(raster).await
    }
}

pub fn product() -> ProductCode {
    ProductCode::new(test_utils::bands::PRODUCT).unwrap()
}

pub fn config(dirs: &RunDirs, workers: usize) -> StackerConfig {
    StackerConfig::new(&dirs.input, &dirs.output, &dirs.work, product()).with_workers(workers)
}

pub fn fake_tool() -> Arc<FakeRasterTool> {
    Arc::new(FakeRasterTool::default())
}

/// Expected composite path for a scene base.
pub fn stack_path(output: &Path, base: &str) -> PathBuf {
    output
        .join(base)
        .join(format!("{}_{}stack.tif", base, test_utils::bands::PRODUCT))
}
