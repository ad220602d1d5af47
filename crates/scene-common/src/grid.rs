//! Fixed-origin tiling grid and tile identification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};

/// Affine geotransform in GDAL order:
/// `[ul_x, pixel_width, row_rotation, ul_y, column_rotation, pixel_height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    pub fn upper_left_x(&self) -> f64 {
        self.0[0]
    }

    pub fn upper_left_y(&self) -> f64 {
        self.0[3]
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }
}

impl From<[f64; 6]> for GeoTransform {
    fn from(values: [f64; 6]) -> Self {
        Self(values)
    }
}

/// Origin and cell size of a regular tiling scheme (projected meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDefinition {
    /// X coordinate of the grid's upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the grid's upper-left corner
    pub origin_y: f64,
    /// Edge length of one square cell
    pub cell_size: f64,
}

impl GridDefinition {
    /// CONUS analysis-ready data grid (Albers equal area, 150 km tiles).
    pub const CONUS_ARD: GridDefinition = GridDefinition {
        origin_x: -2_565_585.0,
        origin_y: 3_314_805.0,
        cell_size: 150_000.0,
    };

    pub fn new(origin_x: f64, origin_y: f64, cell_size: f64) -> SceneResult<Self> {
        let grid = Self {
            origin_x,
            origin_y,
            cell_size,
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> SceneResult<()> {
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(SceneError::InvalidGrid(format!(
                "cell size must be positive, got {}",
                self.cell_size
            )));
        }
        if !self.origin_x.is_finite() || !self.origin_y.is_finite() {
            return Err(SceneError::InvalidGrid("origin must be finite".to_string()));
        }
        Ok(())
    }
}

impl Default for GridDefinition {
    fn default() -> Self {
        Self::CONUS_ARD
    }
}

/// Integer grid cell address. `h` grows eastward, `v` grows southward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    pub h: i64,
    pub v: i64,
}

impl TileId {
    pub fn new(h: i64, v: i64) -> Self {
        Self { h, v }
    }

    /// Tile containing the raster whose upper-left corner is `(ul_x, ul_y)`.
    pub fn from_upper_left(ul_x: f64, ul_y: f64, grid: &GridDefinition) -> Self {
        let h = ((ul_x - grid.origin_x) / grid.cell_size).floor() as i64;
        let v = ((grid.origin_y - ul_y) / grid.cell_size).floor() as i64;
        Self { h, v }
    }

    pub fn from_geotransform(transform: &GeoTransform, grid: &GridDefinition) -> Self {
        Self::from_upper_left(transform.upper_left_x(), transform.upper_left_y(), grid)
    }

    /// Upper-left corner of this cell in grid coordinates.
    pub fn upper_left(&self, grid: &GridDefinition) -> (f64, f64) {
        (
            grid.origin_x + self.h as f64 * grid.cell_size,
            grid.origin_y - self.v as f64 * grid.cell_size,
        )
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}v{}", self.h, self.v)
    }
}
