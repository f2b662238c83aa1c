//! Horizontal regridding from a coarse to a fine lat/lon grid.
//!
//! The pipeline only talks to the [`RegridBackend`] and [`RegridOperator`]
//! traits. [`WeightRegridder`] is the built-in backend: it precomputes a
//! sparse weight list per destination cell and can persist it as JSON.

mod cache;
mod weights;

pub use cache::WeightCache;
pub use weights::{bilinear_weights, patch_weights, RegridWeights};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use climate_common::{LatLonGrid, RasterField};

use crate::error::{DownscaleError, Result};

/// Interpolation method used to build regrid weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegridMethod {
    /// Local least-squares patch fit (a + bx + cy + dxy over up to 4x4 cells).
    #[default]
    Patch,
    /// Bilinear interpolation between the four surrounding cells.
    Bilinear,
}

impl RegridMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patch => "patch",
            Self::Bilinear => "bilinear",
        }
    }
}

impl std::str::FromStr for RegridMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "patch" => Ok(Self::Patch),
            "bilinear" => Ok(Self::Bilinear),
            other => Err(format!(
                "unknown regrid method '{}', expected 'patch' or 'bilinear'",
                other
            )),
        }
    }
}

impl std::fmt::Display for RegridMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A regrid operator bound to one source and one destination grid.
pub trait RegridOperator {
    /// Interpolate every time step of `field` onto the destination grid.
    ///
    /// The result keeps the time axis and has the destination shape.
    fn apply(&self, field: &RasterField) -> Result<RasterField>;

    /// The grid results are produced on.
    fn destination(&self) -> &LatLonGrid;

    /// Drop any persisted weights.
    fn release(&mut self) -> Result<()>;
}

/// Builds regrid operators from grids and a method.
pub trait RegridBackend {
    fn build(
        &self,
        src: &LatLonGrid,
        dst: &LatLonGrid,
        method: RegridMethod,
    ) -> Result<Box<dyn RegridOperator>>;
}

/// Sparse-weight regridding backend.
#[derive(Debug, Clone, Default)]
pub struct WeightRegridder {
    cache: Option<WeightCache>,
}

impl WeightRegridder {
    /// Backend that keeps weights in memory only.
    pub fn new() -> Self {
        Self { cache: None }
    }

    /// Backend that stores weights as JSON files in `dir`.
    pub fn with_cache_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            cache: Some(WeightCache::new(dir)),
        }
    }
}

impl RegridBackend for WeightRegridder {
    fn build(
        &self,
        src: &LatLonGrid,
        dst: &LatLonGrid,
        method: RegridMethod,
    ) -> Result<Box<dyn RegridOperator>> {
        if src.is_empty() || dst.is_empty() {
            return Err(DownscaleError::interpolation("cannot regrid an empty grid"));
        }

        let cached = match &self.cache {
            Some(cache) => cache.load(src, dst, method)?,
            None => None,
        };

        let (weights, cache_file) = match (cached, &self.cache) {
            (Some(weights), Some(cache)) => {
                debug!(method = %method, "Using cached regrid weights");
                (weights, Some(cache.path_for(src, dst, method)))
            }
            (_, cache) => {
                let weights = match method {
                    RegridMethod::Bilinear => bilinear_weights(src, dst),
                    RegridMethod::Patch => patch_weights(src, dst),
                };
                let cache_file = match cache {
                    Some(cache) => Some(cache.store(src, dst, &weights)?),
                    None => None,
                };
                (weights, cache_file)
            }
        };

        info!(
            method = %method,
            src_shape = ?src.shape(),
            dst_shape = ?dst.shape(),
            covered = weights.covered_cells(),
            "Built regrid operator"
        );

        Ok(Box::new(WeightOperator {
            weights,
            dst: dst.clone(),
            cache_file,
        }))
    }
}

/// Operator applying precomputed sparse weights.
#[derive(Debug)]
pub struct WeightOperator {
    weights: RegridWeights,
    dst: LatLonGrid,
    cache_file: Option<PathBuf>,
}

impl RegridOperator for WeightOperator {
    fn apply(&self, field: &RasterField) -> Result<RasterField> {
        if field.grid.shape() != self.weights.src_shape {
            return Err(DownscaleError::interpolation(format!(
                "field grid {:?} does not match operator source grid {:?}",
                field.grid.shape(),
                self.weights.src_shape
            )));
        }

        let n_dst = self.dst.len();
        let mut data = Vec::with_capacity(field.n_time() * n_dst);
        for t in 0..field.n_time() {
            let slice = field.slice(t);
            data.extend(self.weights.entries.iter().map(|entry| apply_entry(entry, slice)));
        }

        Ok(RasterField::new(self.dst.clone(), field.time.clone(), data)?)
    }

    fn destination(&self) -> &LatLonGrid {
        &self.dst
    }

    fn release(&mut self) -> Result<()> {
        if let Some(path) = self.cache_file.take() {
            if path.exists() {
                std::fs::remove_file(&path)?;
                debug!(path = %path.display(), "Removed weight file");
            }
        }
        Ok(())
    }
}

/// Weighted sum for one destination cell; NaN if uncovered or any contributor is NaN.
fn apply_entry(entry: &[(u32, f64)], slice: &[f32]) -> f32 {
    if entry.is_empty() {
        return f32::NAN;
    }
    let mut sum = 0.0f64;
    for &(idx, w) in entry {
        let v = slice[idx as usize];
        if v.is_nan() {
            return f32::NAN;
        }
        sum += w * v as f64;
    }
    sum as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::{Calendar, CalendarDate, TimeAxis};

    fn grid(lat0: f64, lon0: f64, step: f64, n_lat: usize, n_lon: usize) -> LatLonGrid {
        LatLonGrid::new(
            (0..n_lat).map(|i| lat0 + i as f64 * step).collect(),
            (0..n_lon).map(|j| lon0 + j as f64 * step).collect(),
        )
        .unwrap()
    }

    fn field_from<F: Fn(f64, f64) -> f32>(g: &LatLonGrid, n_time: usize, f: F) -> RasterField {
        let mut data = Vec::new();
        for t in 0..n_time {
            for &lat in g.lat() {
                for &lon in g.lon() {
                    data.push(f(lat, lon) + t as f32);
                }
            }
        }
        let time = TimeAxis::daily(
            CalendarDate { year: 2000, month: 1, day: 1 },
            n_time,
            Calendar::standard(),
        );
        RasterField::new(g.clone(), time, data).unwrap()
    }

    fn linear(lat: f64, lon: f64) -> f32 {
        (3.0 + 2.0 * lon - lat + 0.5 * lon * lat) as f32
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("patch".parse::<RegridMethod>(), Ok(RegridMethod::Patch));
        assert_eq!("BILINEAR".parse::<RegridMethod>(), Ok(RegridMethod::Bilinear));
        assert!("conservative".parse::<RegridMethod>().is_err());
        assert_eq!(RegridMethod::default(), RegridMethod::Patch);
    }

    #[test]
    fn test_both_methods_reproduce_bilinear_field() {
        let src = grid(40.0, 19.0, 0.1, 6, 7);
        let dst = grid(40.0, 19.0, 0.02, 26, 31);
        let field = field_from(&src, 2, linear);

        for method in [RegridMethod::Bilinear, RegridMethod::Patch] {
            let op = WeightRegridder::new().build(&src, &dst, method).unwrap();
            let out = op.apply(&field).unwrap();
            assert_eq!(out.shape(), (2, 26, 31));
            let expected = field_from(&dst, 2, linear);
            for (i, (&a, &b)) in out.data.iter().zip(&expected.data).enumerate() {
                assert!((a - b).abs() < 1e-3, "{} cell {}: {} vs {}", method, i, a, b);
            }
        }
    }

    #[test]
    fn test_outside_source_extent_is_nan() {
        let src = grid(40.0, 19.0, 0.1, 3, 3);
        let dst = grid(39.95, 19.0, 0.05, 3, 3);
        let field = field_from(&src, 1, |_, _| 1.0);

        let op = WeightRegridder::new().build(&src, &dst, RegridMethod::Bilinear).unwrap();
        let out = op.apply(&field).unwrap();
        // First destination row (39.95) lies south of the source grid
        assert!(out.slice(0)[..3].iter().all(|v| v.is_nan()));
        assert!(out.slice(0)[3..].iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_nan_source_propagates() {
        let src = grid(40.0, 19.0, 0.1, 2, 2);
        let dst = grid(40.0, 19.0, 0.05, 3, 3);
        let mut field = field_from(&src, 1, |_, _| 5.0);
        field.data[0] = f32::NAN;

        let op = WeightRegridder::new().build(&src, &dst, RegridMethod::Bilinear).unwrap();
        let out = op.apply(&field).unwrap();
        assert!(out.data[0].is_nan());
        assert!(out.data[4].is_nan());
        // Exactly on an unaffected source point
        assert_eq!(out.data[8], 5.0);
    }

    #[test]
    fn test_apply_rejects_wrong_grid() {
        let src = grid(40.0, 19.0, 0.1, 3, 3);
        let dst = grid(40.0, 19.0, 0.05, 3, 3);
        let op = WeightRegridder::new().build(&src, &dst, RegridMethod::Bilinear).unwrap();
        let other = field_from(&grid(40.0, 19.0, 0.1, 2, 3), 1, |_, _| 0.0);
        assert!(matches!(op.apply(&other), Err(DownscaleError::Interpolation(_))));
    }

    #[test]
    fn test_weight_cache_released() {
        let dir = tempfile::tempdir().unwrap();
        let src = grid(40.0, 19.0, 0.1, 3, 3);
        let dst = grid(40.0, 19.0, 0.05, 5, 5);

        let backend = WeightRegridder::with_cache_dir(dir.path());
        let mut op = backend.build(&src, &dst, RegridMethod::Patch).unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        op.release().unwrap();
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        // Releasing twice is harmless
        op.release().unwrap();
    }
}
