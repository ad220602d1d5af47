//! Band set resolution per sensor generation.
//!
//! The order of a [`BandSet`] is the band order of the composite: element `i`
//! becomes band `i + 1` of the stacked raster.

use std::path::{Path, PathBuf};

use scene_common::{ProductCode, SceneId, SensorGeneration};

use crate::error::{Result, StackError};

/// Reflective bands of the newest generation (blue, green, red, NIR, SWIR1, SWIR2).
pub const OLI_BAND_CODES: [&str; 6] = ["B2", "B3", "B4", "B5", "B6", "B7"];

/// Reflective bands of TM/ETM+; the thermal band 6 is not part of the stack.
pub const LEGACY_BAND_CODES: [&str; 6] = ["B1", "B2", "B3", "B4", "B5", "B7"];

/// Spectral band codes for a generation, in stacking order.
pub fn spectral_band_codes(generation: SensorGeneration) -> &'static [&'static str] {
    match generation {
        SensorGeneration::Oli => &OLI_BAND_CODES,
        SensorGeneration::Legacy(_) => &LEGACY_BAND_CODES,
    }
}

/// Ordered band file names for one scene: spectral bands, then pixel QA.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandSet {
    names: Vec<String>,
}

impl BandSet {
    pub fn resolve(scene: &SceneId, product: &ProductCode) -> Self {
        let mut names: Vec<String> = spectral_band_codes(scene.generation())
            .iter()
            .map(|code| scene.band_file_name(product, code))
            .collect();
        names.push(scene.quality_file_name());
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Full paths of every band inside `workspace`, in order.
    ///
    /// Fails with [`StackError::MissingBandFile`] on the first absent file.
    pub fn locate(&self, workspace: &Path) -> Result<Vec<PathBuf>> {
        self.names
            .iter()
            .map(|name| {
                let path = workspace.join(name);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(StackError::MissingBandFile(path))
                }
            })
            .collect()
    }
}
