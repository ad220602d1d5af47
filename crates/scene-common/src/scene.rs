//! Scene identification from archive filenames.
//!
//! Analysis-ready scene archives follow a fixed positional naming convention,
//! for example `LC08_CU_003008_20170525_20181121_C01_V01_TA.tar`:
//!
//! - char 0: platform family (`L`)
//! - char 3: sensor generation digit (`8`, `7`, `5`, `4`)
//! - chars 8..14: grid tile code `HHHVVV`
//! - chars 15..23: acquisition date `YYYYMMDD`
//!
//! The archive name minus its `_<product>.tar` suffix is the scene base
//! identifier, which also prefixes every band file inside the archive.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{SceneError, SceneResult};

const GENERATION_OFFSET: usize = 3;
const TILE_CODE_OFFSET: usize = 8;
const DATE_OFFSET: usize = 15;
const DATE_LEN: usize = 8;

/// Digit identifying the newest supported sensor generation.
pub const NEWEST_GENERATION_DIGIT: char = '8';

/// Two-letter product tag selecting a band family (e.g. `TA`, `SR`, `BT`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductCode(String);

impl ProductCode {
    pub fn new(code: impl Into<String>) -> SceneResult<Self> {
        let code = code.into();
        let valid = code.len() == 2
            && code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !valid {
            return Err(SceneError::InvalidProductCode(code));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Filename suffix that marks an archive of this product.
    pub fn archive_suffix(&self) -> String {
        format!("{}.tar", self.0)
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProductCode {
    type Err = SceneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ProductCode {
    type Error = SceneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductCode> for String {
    fn from(code: ProductCode) -> Self {
        code.0
    }
}

/// Sensor generation, derived from the fourth character of the scene name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorGeneration {
    /// Newest generation (OLI), six reflective bands numbered 2..7.
    Oli,
    /// Older TM/ETM+ generations, carrying the generation digit.
    Legacy(u8),
}

impl SensorGeneration {
    pub fn from_digit(digit: char) -> Option<Self> {
        if digit == NEWEST_GENERATION_DIGIT {
            return Some(Self::Oli);
        }
        digit.to_digit(10).map(|d| Self::Legacy(d as u8))
    }

    pub fn is_newest(&self) -> bool {
        matches!(self, Self::Oli)
    }
}

/// Identity of one scene, parsed from its archive or base name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SceneId {
    base: String,
    platform: char,
    generation: SensorGeneration,
    acquired: NaiveDate,
}

impl SceneId {
    /// Parse a scene base identifier (archive name without product suffix).
    pub fn parse(base: &str) -> SceneResult<Self> {
        let invalid = || SceneError::InvalidArchiveName(base.to_string());

        if !base.is_ascii() || base.len() < DATE_OFFSET + DATE_LEN {
            return Err(invalid());
        }

        let chars: Vec<char> = base.chars().collect();
        let platform = chars[0];
        if !platform.is_ascii_alphabetic() {
            return Err(invalid());
        }

        let generation =
            SensorGeneration::from_digit(chars[GENERATION_OFFSET]).ok_or_else(invalid)?;

        let date = &base[DATE_OFFSET..DATE_OFFSET + DATE_LEN];
        let acquired = NaiveDate::parse_from_str(date, "%Y%m%d")
            .map_err(|_| SceneError::InvalidAcquisitionDate(base.to_string()))?;

        Ok(Self {
            base: base.to_string(),
            platform,
            generation,
            acquired,
        })
    }

    /// Parse the scene from an archive path ending in `<product>.tar`.
    pub fn from_archive_path(path: &Path, product: &ProductCode) -> SceneResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SceneError::InvalidArchiveName(path.display().to_string()))?;

        let stem = name
            .strip_suffix(&product.archive_suffix())
            .ok_or_else(|| SceneError::ProductMismatch {
                archive: name.to_string(),
                product: product.to_string(),
            })?;
        let base = stem.strip_suffix('_').unwrap_or(stem);

        Self::parse(base)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn platform(&self) -> char {
        self.platform
    }

    pub fn generation(&self) -> SensorGeneration {
        self.generation
    }

    pub fn acquired(&self) -> NaiveDate {
        self.acquired
    }

    /// Grid tile embedded in the name as `HHHVVV`, if present.
    pub fn ard_tile(&self) -> Option<(u32, u32)> {
        let code = self.base.get(TILE_CODE_OFFSET..TILE_CODE_OFFSET + 6)?;
        let h = code[..3].parse().ok()?;
        let v = code[3..].parse().ok()?;
        Some((h, v))
    }

    /// `<base>_<product><bandcode>.tif`
    pub fn band_file_name(&self, product: &ProductCode, band_code: &str) -> String {
        format!("{}_{}{}.tif", self.base, product, band_code)
    }

    /// `<base>_PIXELQA.tif`
    pub fn quality_file_name(&self) -> String {
        format!("{}_PIXELQA.tif", self.base)
    }

    /// `<base>_<product>stack.tif`
    pub fn stack_file_name(&self, product: &ProductCode) -> String {
        format!("{}_{}stack.tif", self.base, product)
    }

    /// `<base>.vrt`
    pub fn descriptor_file_name(&self) -> String {
        format!("{}.vrt", self.base)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const L8_BASE: &str = "LC08_CU_003008_20170525_20181121_C01_V01";
    const L5_BASE: &str = "LT05_CU_012004_19990811_20180905_C01_V01";

    #[test]
    fn test_parse_newest_generation() {
        let scene = SceneId::parse(L8_BASE).unwrap();
        assert_eq!(scene.platform(), 'L');
        assert_eq!(scene.generation(), SensorGeneration::Oli);
        assert_eq!(scene.acquired(), NaiveDate::from_ymd_opt(2017, 5, 25).unwrap());
        assert_eq!(scene.ard_tile(), Some((3, 8)));
    }

    #[test]
    fn test_parse_legacy_generation() {
        let scene = SceneId::parse(L5_BASE).unwrap();
        assert_eq!(scene.generation(), SensorGeneration::Legacy(5));
        assert!(!scene.generation().is_newest());
        assert_eq!(scene.ard_tile(), Some((12, 4)));
    }

    #[test]
    fn test_from_archive_path() {
        let product = ProductCode::new("TA").unwrap();
        let path = PathBuf::from(format!("/data/in/{}_TA.tar", L8_BASE));
        let scene = SceneId::from_archive_path(&path, &product).unwrap();
        assert_eq!(scene.base(), L8_BASE);
    }

    #[test]
    fn test_from_archive_path_wrong_product() {
        let product = ProductCode::new("SR").unwrap();
        let path = PathBuf::from(format!("{}_TA.tar", L8_BASE));
        let err = SceneId::from_archive_path(&path, &product).unwrap_err();
        assert!(matches!(err, SceneError::ProductMismatch { .. }));
    }

    #[test]
    fn test_parse_rejects_short_names() {
        assert!(matches!(
            SceneId::parse("LC08_CU"),
            Err(SceneError::InvalidArchiveName(_))
        ));
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let err = SceneId::parse("LC08_CU_003008_20171325_20181121_C01_V01").unwrap_err();
        assert!(matches!(err, SceneError::InvalidAcquisitionDate(_)));
    }

    #[test]
    fn test_file_names() {
        let product = ProductCode::new("TA").unwrap();
        let scene = SceneId::parse(L8_BASE).unwrap();
        assert_eq!(
            scene.band_file_name(&product, "B2"),
            format!("{}_TAB2.tif", L8_BASE)
        );
        assert_eq!(scene.quality_file_name(), format!("{}_PIXELQA.tif", L8_BASE));
        assert_eq!(
            scene.stack_file_name(&product),
            format!("{}_TAstack.tif", L8_BASE)
        );
        assert_eq!(scene.descriptor_file_name(), format!("{}.vrt", L8_BASE));
    }

    #[test]
    fn test_product_code_validation() {
        assert!(ProductCode::new("TA").is_ok());
        assert!(ProductCode::new("SR").is_ok());
        assert!(ProductCode::new("ta").is_err());
        assert!(ProductCode::new("TAB").is_err());
        assert!(ProductCode::new("").is_err());
        assert_eq!(ProductCode::new("BT").unwrap().archive_suffix(), "BT.tar");
    }
}
