//! Common test fixtures for downscaling tests.
//!
//! This module provides pre-defined calendars, model names and grid
//! resolutions that represent common downscaling scenarios.

/// Grid resolutions in degrees.
pub mod resolution {
    /// Coarse source grid
    pub const COARSE: f64 = 0.1;

    /// Fine target grid
    pub const FINE: f64 = 0.01;

    /// Fine grid used by fast synthetic tests
    pub const FINE_TEST: f64 = 0.05;
}

/// CF calendar attribute values seen in model output.
pub mod calendars {
    pub const STANDARD: &str = "standard";
    pub const GREGORIAN: &str = "gregorian";
    pub const NOLEAP: &str = "noleap";
    pub const DAY_365: &str = "365_day";
    pub const DAY_360: &str = "360_day";

    /// Every calendar the pipeline must handle
    pub const ALL: [&str; 5] = [STANDARD, GREGORIAN, NOLEAP, DAY_365, DAY_360];
}

/// Common model identifiers.
pub mod models {
    pub const EC_EARTH: &str = "ICHEC-EC-EARTH_r12i1p1_KNMI-RACMO22E";
    pub const HADGEM: &str = "MOHC-HadGEM2-ES_r1i1p1_SMHI-RCA4";
}
