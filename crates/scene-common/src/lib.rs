//! Common types and utilities shared across the scene stacking workspace.

pub mod error;
pub mod grid;
pub mod scene;

pub use error::{SceneError, SceneResult};
pub use grid::{GeoTransform, GridDefinition, TileId};
pub use scene::{ProductCode, SceneId, SensorGeneration};
