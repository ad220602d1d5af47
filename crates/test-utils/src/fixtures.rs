//! Common test fixtures for scene stacking tests.

/// Scene base identifiers following the analysis-ready naming convention.
pub mod scenes {
    /// Newest generation scene, tile h003v008
    pub const OLI_A: &str = "LC08_CU_003008_20170525_20181121_C01_V01";

    /// Newest generation scene, tile h004v009
    pub const OLI_B: &str = "LC08_CU_004009_20170610_20181121_C01_V01";

    /// TM scene, tile h012v004
    pub const TM: &str = "LT05_CU_012004_19990811_20180905_C01_V01";

    /// ETM+ scene, tile h020v010
    pub const ETM: &str = "LE07_CU_020010_20020714_20180822_C01_V01";
}

/// Band code tables as they appear inside archives.
pub mod bands {
    /// Reflective bands shipped for the newest generation, in stacking order
    pub const OLI: [&str; 6] = ["B2", "B3", "B4", "B5", "B6", "B7"];

    /// Reflective bands shipped for TM/ETM+, in stacking order
    pub const LEGACY: [&str; 6] = ["B1", "B2", "B3", "B4", "B5", "B7"];

    /// Product tag used by most tests
    pub const PRODUCT: &str = "TA";
}

/// Archive file name for a scene base and product.
pub fn archive_name(base: &str, product: &str) -> String {
    format!("{}_{}.tar", base, product)
}

/// Band codes shipped for a scene, chosen by its generation digit.
pub fn band_codes_for(base: &str) -> &'static [&'static str] {
    if base.chars().nth(3) == Some('8') {
        &bands::OLI
    } else {
        &bands::LEGACY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_name() {
        assert_eq!(
            archive_name(scenes::TM, "SR"),
            "LT05_CU_012004_19990811_20180905_C01_V01_SR.tar"
        );
    }

    #[test]
    fn test_band_codes_for() {
        assert_eq!(band_codes_for(scenes::OLI_A)[0], "B2");
        assert_eq!(band_codes_for(scenes::TM)[0], "B1");
        assert_eq!(band_codes_for(scenes::ETM)[5], "B7");
    }
}
