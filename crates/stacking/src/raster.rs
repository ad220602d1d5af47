//! Boundary to the external raster library.
//!
//! The pipeline only needs three capabilities: compose ordered single-band
//! files into a virtual multi-band descriptor, materialize a descriptor into
//! a physical file, and report basic raster metadata. [`GdalCli`] provides
//! them through the GDAL command-line tools.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use scene_common::{GeoTransform, GridDefinition, TileId};
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::config::ToolConfig;
use crate::error::{Result, StackError};

/// Basic metadata of an opened raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
    pub band_count: usize,
    pub geotransform: GeoTransform,
    /// Projection as WKT; empty when the raster carries none
    pub projection: String,
}

/// Raster operations consumed by the stacking pipeline.
///
/// Every method must fail loudly: a tool that cannot open its inputs or
/// produce its output returns [`StackError::RasterOpen`].
#[async_trait]
pub trait RasterTool: Send + Sync {
    /// Compose `inputs`, in order, into a band-separated virtual descriptor.
    async fn build_vrt(&self, inputs: &[PathBuf], descriptor: &Path) -> Result<()>;

    /// Materialize `source` into a physical raster at `output`.
    async fn translate(&self, source: &Path, output: &Path) -> Result<()>;

    /// Open `raster` and report its metadata.
    async fn info(&self, raster: &Path) -> Result<RasterInfo>;
}

/// [`RasterTool`] backed by `gdalbuildvrt`, `gdal_translate` and `gdalinfo`.
#[derive(Debug, Clone)]
pub struct GdalCli {
    tools: ToolConfig,
}

impl GdalCli {
    pub fn new(tools: ToolConfig) -> Self {
        Self { tools }
    }

    async fn run(&self, program: &str, args: &[&OsStr]) -> Result<Vec<u8>> {
        debug!(program = %program, args = ?args, "Invoking raster tool");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| StackError::RasterOpen(format!("failed to launch {}: {}", program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StackError::RasterOpen(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl RasterTool for GdalCli {
    async fn build_vrt(&self, inputs: &[PathBuf], descriptor: &Path) -> Result<()> {
        let mut args: Vec<&OsStr> = vec![OsStr::new("-separate"), descriptor.as_os_str()];
        args.extend(inputs.iter().map(|p| p.as_os_str()));

        self.run(&self.tools.buildvrt, &args).await?;
        ensure_written(&self.tools.buildvrt, descriptor)
    }

    async fn translate(&self, source: &Path, output: &Path) -> Result<()> {
        let args: [&OsStr; 4] = [
            OsStr::new("-of"),
            OsStr::new(&self.tools.output_format),
            source.as_os_str(),
            output.as_os_str(),
        ];

        self.run(&self.tools.translate, &args).await?;
        ensure_written(&self.tools.translate, output)
    }

    async fn info(&self, raster: &Path) -> Result<RasterInfo> {
        let args: [&OsStr; 2] = [OsStr::new("-json"), raster.as_os_str()];
        let stdout = self.run(&self.tools.info, &args).await?;
        parse_gdalinfo(&stdout)
    }
}

/// Open `raster` and report the grid cell containing its upper-left corner.
pub async fn identify_tile(
    tool: &dyn RasterTool,
    raster: &Path,
    grid: &GridDefinition,
) -> Result<TileId> {
    let info = tool.info(raster).await?;
    Ok(TileId::from_geotransform(&info.geotransform, grid))
}

fn ensure_written(program: &str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(StackError::RasterOpen(format!(
            "{} reported success but {} was not written",
            program,
            path.display()
        )))
    }
}

#[derive(Debug, Deserialize)]
struct GdalInfoJson {
    size: [u32; 2],
    #[serde(rename = "geoTransform")]
    geo_transform: Option<[f64; 6]>,
    #[serde(rename = "coordinateSystem")]
    coordinate_system: Option<CoordinateSystem>,
    #[serde(default)]
    bands: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CoordinateSystem {
    #[serde(default)]
    wkt: String,
}

/// Parse the output of `gdalinfo -json`.
pub fn parse_gdalinfo(json: &[u8]) -> Result<RasterInfo> {
    let parsed: GdalInfoJson = serde_json::from_slice(json)
        .map_err(|e| StackError::RasterOpen(format!("unreadable gdalinfo output: {}", e)))?;

    let geotransform = parsed
        .geo_transform
        .ok_or_else(|| StackError::RasterOpen("raster has no geotransform".to_string()))?;

    Ok(RasterInfo {
        width: parsed.size[0],
        height: parsed.size[1],
        band_count: parsed.bands.len(),
        geotransform: GeoTransform(geotransform),
        projection: parsed
            .coordinate_system
            .map(|cs| cs.wkt)
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "description": "LC08_CU_003008_20170525_20181121_C01_V01_TAstack.tif",
        "driverShortName": "GTiff",
        "size": [5000, 5000],
        "coordinateSystem": { "wkt": "PROJCS[\"Albers\"]" },
        "geoTransform": [-2115585.0, 30.0, 0.0, 2114805.0, 0.0, -30.0],
        "bands": [{"band": 1}, {"band": 2}, {"band": 3}, {"band": 4},
                  {"band": 5}, {"band": 6}, {"band": 7}]
    }"#;

    #[test]
    fn test_parse_gdalinfo() {
        let info = parse_gdalinfo(SAMPLE.as_bytes()).unwrap();
        assert_eq!(info.width, 5000);
        assert_eq!(info.height, 5000);
        assert_eq!(info.band_count, 7);
        assert_eq!(info.geotransform.upper_left_x(), -2115585.0);
        assert_eq!(info.geotransform.upper_left_y(), 2114805.0);
        assert!(info.projection.starts_with("PROJCS"));
    }

    #[test]
    fn test_parse_gdalinfo_without_geotransform() {
        let json = br#"{"size": [10, 10], "bands": []}"#;
        assert!(matches!(parse_gdalinfo(json), Err(StackError::RasterOpen(_))));
    }

    #[test]
    fn test_parse_gdalinfo_garbage() {
        assert!(matches!(
            parse_gdalinfo(b"ERROR 4: not recognized"),
            Err(StackError::RasterOpen(_))
        ));
    }

    struct InfoOnly(RasterInfo);

    #[async_trait]
    impl RasterTool for InfoOnly {
        async fn build_vrt(&self, _inputs: &[PathBuf], _descriptor: &Path) -> Result<()> {
            unreachable!()
        }

        async fn translate(&self, _source: &Path, _output: &Path) -> Result<()> {
            unreachable!()
        }

        async fn info(&self, _raster: &Path) -> Result<RasterInfo> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_identify_tile() {
        let tool = InfoOnly(parse_gdalinfo(SAMPLE.as_bytes()).unwrap());
        let tile = identify_tile(&tool, Path::new("x.tif"), &GridDefinition::CONUS_ARD)
            .await
            .unwrap();
        assert_eq!(tile, TileId::new(3, 8));
        assert_eq!(tile.to_string(), "h3v8");
    }

    #[tokio::test]
    async fn test_missing_program_is_raster_open_error() {
        let tools = ToolConfig {
            info: "/nonexistent/gdalinfo-for-tests".to_string(),
            ..ToolConfig::default()
        };
        let cli = GdalCli::new(tools);
        let err = cli.info(Path::new("/tmp/none.tif")).await.unwrap_err();
        assert!(matches!(err, StackError::RasterOpen(_)));
    }
}
