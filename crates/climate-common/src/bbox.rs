//! Latitude/longitude bounding boxes.

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, ClimateResult};

/// A geographic bounding box in degrees.
///
/// Always satisfies `lat_min < lat_max` and `lon_min < lon_max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    lat_min: f64,
    lat_max: f64,
    lon_min: f64,
    lon_max: f64,
}

impl BoundingBox {
    /// Create a new bounding box, rejecting inverted or empty ranges.
    pub fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> ClimateResult<Self> {
        if !(lat_min < lat_max) {
            return Err(ClimateError::InvalidBbox(format!(
                "lat_min ({}) must be less than lat_max ({})",
                lat_min, lat_max
            )));
        }
        if !(lon_min < lon_max) {
            return Err(ClimateError::InvalidBbox(format!(
                "lon_min ({}) must be less than lon_max ({})",
                lon_min, lon_max
            )));
        }
        Ok(Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        })
    }

    /// Parse a `lat_min,lat_max,lon_min,lon_max` string.
    pub fn from_csv(s: &str) -> ClimateResult<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ClimateError::InvalidBbox(format!(
                "{}. Expected 'lat_min,lat_max,lon_min,lon_max'",
                s
            )));
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| ClimateError::InvalidBbox(format!("invalid number '{}'", part)))?;
        }

        Self::new(values[0], values[1], values[2], values[3])
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    /// Check if a point lies inside the box (edges included).
    pub fn contains_point(&self, lat: f64, lon: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lon >= self.lon_min && lon <= self.lon_max
    }

    /// Check whether any edge lies outside the given coordinate extent.
    ///
    /// Edges equal to the extent do not count as exceeding it.
    pub fn exceeds(&self, extent: &Extent) -> bool {
        self.lat_min < extent.lat_min
            || self.lat_max > extent.lat_max
            || self.lon_min < extent.lon_min
            || self.lon_max > extent.lon_max
    }

    /// Look up a named region preset (case-insensitive).
    pub fn region(name: &str) -> Option<Self> {
        let wanted = name.trim().to_lowercase();
        REGIONS
            .iter()
            .find(|(n, _)| n.to_lowercase() == wanted)
            .map(|&(_, (lat_min, lat_max, lon_min, lon_max))| Self {
                lat_min,
                lat_max,
                lon_min,
                lon_max,
            })
    }
}

/// Named domains as `(lat_min, lat_max, lon_min, lon_max)`.
pub const REGIONS: [(&str, (f64, f64, f64, f64)); 9] = [
    ("Whole Domain", (38.0, 47.0, 13.0, 25.0)),
    ("Albania", (39.583, 42.659, 19.0, 21.05)),
    ("Bosnia and Herzegovina", (42.558, 45.268, 15.746, 19.671)),
    ("Croatia", (42.367, 46.527, 13.484, 19.391)),
    ("Kosovo", (41.8577, 43.2696, 20.0141, 21.7894)),
    ("Macedonia", (40.867, 42.373, 20.405, 23.033)),
    ("Montenegro", (41.864, 43.548, 18.438, 20.345)),
    ("Serbia", (41.844, 46.167, 18.859, 22.967)),
    ("Slovenia", (44.083, 46.933, 13.427, 17.467)),
];

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lat [{}, {}], lon [{}, {}]",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )
    }
}

/// The actual coordinate extent of a grid.
///
/// Unlike [`BoundingBox`] this may be degenerate (a single row or column).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "lat [{}, {}], lon [{}, {}]",
            self.lat_min, self.lat_max, self.lon_min, self.lon_max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_presets() {
        let albania = BoundingBox::region("albania").unwrap();
        assert_eq!(albania.lat_min(), 39.583);
        assert_eq!(albania.lon_max(), 21.05);
        assert!(BoundingBox::region(" Bosnia and Herzegovina ").is_some());
        assert!(BoundingBox::region("Atlantis").is_none());

        let whole = BoundingBox::region("Whole Domain").unwrap();
        for (name, (lat_min, lat_max, lon_min, lon_max)) in REGIONS {
            let bbox = BoundingBox::new(lat_min, lat_max, lon_min, lon_max).unwrap();
            assert!(whole.contains_point(bbox.lat_min(), bbox.lon_min()), "{}", name);
            assert!(whole.contains_point(bbox.lat_max(), bbox.lon_max()), "{}", name);
        }
    }

    #[test]
    fn test_new_rejects_inverted() {
        assert!(BoundingBox::new(40.0, 35.0, 10.0, 20.0).is_err());
        assert!(BoundingBox::new(35.0, 40.0, 20.0, 10.0).is_err());
        assert!(BoundingBox::new(35.0, 35.0, 10.0, 20.0).is_err());
        assert!(BoundingBox::new(f64::NAN, 35.0, 10.0, 20.0).is_err());
    }

    #[test]
    fn test_exceeds() {
        let extent = Extent {
            lat_min: 30.0,
            lat_max: 50.0,
            lon_min: 10.0,
            lon_max: 25.0,
        };

        let inside = BoundingBox::new(35.0, 40.0, 12.0, 20.0).unwrap();
        assert!(!inside.exceeds(&extent));

        let equal = BoundingBox::new(30.0, 50.0, 10.0, 25.0).unwrap();
        assert!(!equal.exceeds(&extent));

        let north = BoundingBox::new(35.0, 50.5, 12.0, 20.0).unwrap();
        assert!(north.exceeds(&extent));

        let west = BoundingBox::new(35.0, 40.0, 9.99, 20.0).unwrap();
        assert!(west.exceeds(&extent));
    }
}
