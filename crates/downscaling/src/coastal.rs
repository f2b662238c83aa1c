//! Coastal gap filling on the fine grid.
//!
//! Regridding leaves land cells near the coast undefined when their source
//! neighbours are sea. Each undefined cell takes the value of its nearest
//! defined cell (exact Euclidean distance in index space), then everything
//! outside the fine land mask is set to the fill sentinel.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use climate_common::{ClimateError, RasterField, FILL_VALUE};

use crate::error::Result;

/// Extent of the nearest-neighbour search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillScope {
    /// Search the whole `(time, lat, lon)` array; the nearest cell may lie
    /// in a neighbouring time step.
    #[default]
    WholeArray,
    /// Search each time slice on its own.
    PerTimeSlice,
}

impl FillScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WholeArray => "whole_array",
            Self::PerTimeSlice => "per_time_slice",
        }
    }
}

impl std::str::FromStr for FillScope {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "whole_array" | "whole" => Ok(Self::WholeArray),
            "per_time_slice" | "per_slice" => Ok(Self::PerTimeSlice),
            other => Err(format!(
                "unknown fill scope '{}', expected 'whole_array' or 'per_time_slice'",
                other
            )),
        }
    }
}

impl std::fmt::Display for FillScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fill undefined cells from their nearest defined neighbour and mask to land.
///
/// After this, cells inside `land_mask` hold finite values (provided the
/// field had at least one defined cell in the search scope) and cells
/// outside hold exactly [`FILL_VALUE`].
pub fn fill(mut field: RasterField, land_mask: &[bool], scope: FillScope) -> Result<RasterField> {
    let (n_time, n_lat, n_lon) = field.shape();
    if land_mask.len() != n_lat * n_lon {
        return Err(ClimateError::ShapeMismatch {
            shape: vec![n_lat, n_lon],
            expected: n_lat * n_lon,
            actual: land_mask.len(),
        }
        .into());
    }

    let missing = field.data.iter().filter(|v| v.is_nan()).count();
    if missing > 0 {
        match scope {
            FillScope::WholeArray => {
                nearest_fill(&mut field.data, &[n_time, n_lat, n_lon]);
            }
            FillScope::PerTimeSlice => {
                for t in 0..n_time {
                    nearest_fill(field.slice_mut(t), &[n_lat, n_lon]);
                }
            }
        }
    }

    for t in 0..n_time {
        for (v, &land) in field.slice_mut(t).iter_mut().zip(land_mask) {
            if !land {
                *v = FILL_VALUE;
            }
        }
    }

    info!(
        scope = %scope,
        filled = missing,
        land_cells = land_mask.iter().filter(|&&l| l).count(),
        "Coastal correction applied"
    );

    Ok(field)
}

/// Replace every NaN with the value of its nearest non-NaN cell.
fn nearest_fill(data: &mut [f32], shape: &[usize]) {
    let valid: Vec<bool> = data.iter().map(|v| !v.is_nan()).collect();
    let Some(features) = feature_transform(&valid, shape) else {
        debug!(shape = ?shape, "No defined cells to fill from");
        return;
    };
    let source = data.to_vec();
    for (v, &f) in data.iter_mut().zip(&features) {
        *v = source[f];
    }
}

/// Exact Euclidean feature transform on a row-major N-D array.
///
/// For every cell, returns the flat index of the nearest cell where
/// `feature` is true. Dimensions are processed one at a time; along each
/// line the lower envelope of parabolas `(q - p)² + g(p)` picks the
/// nearest candidate, carrying its feature index. Returns `None` when
/// there is no feature cell at all.
pub fn feature_transform(feature: &[bool], shape: &[usize]) -> Option<Vec<usize>> {
    let total: usize = shape.iter().product();
    debug_assert_eq!(feature.len(), total);
    if !feature.iter().any(|&f| f) {
        return None;
    }

    let mut dist: Vec<f64> = feature
        .iter()
        .map(|&f| if f { 0.0 } else { f64::INFINITY })
        .collect();
    let mut nearest: Vec<usize> = (0..total).collect();

    let mut envelope = Envelope::default();
    for axis in 0..shape.len() {
        let n = shape[axis];
        let stride: usize = shape[axis + 1..].iter().product();
        let outer = total / (n * stride);

        let mut line_dist = vec![0.0; n];
        let mut line_feat = vec![0usize; n];
        for o in 0..outer {
            for s in 0..stride {
                let base = o * n * stride + s;
                for k in 0..n {
                    line_dist[k] = dist[base + k * stride];
                    line_feat[k] = nearest[base + k * stride];
                }
                envelope.solve(&mut line_dist, &mut line_feat);
                for k in 0..n {
                    dist[base + k * stride] = line_dist[k];
                    nearest[base + k * stride] = line_feat[k];
                }
            }
        }
    }

    Some(nearest)
}

/// Scratch space for the 1-D lower-envelope pass.
#[derive(Default)]
struct Envelope {
    vertices: Vec<usize>,
    bounds: Vec<f64>,
    out_dist: Vec<f64>,
    out_feat: Vec<usize>,
}

impl Envelope {
    /// Replace `dist`/`feat` along one line with the envelope minimum.
    fn solve(&mut self, dist: &mut [f64], feat: &mut [usize]) {
        let n = dist.len();
        self.vertices.clear();
        self.bounds.clear();

        for q in 0..n {
            if !dist[q].is_finite() {
                continue;
            }
            let qf = q as f64;
            loop {
                let Some(&p) = self.vertices.last() else {
                    self.vertices.push(q);
                    self.bounds.push(f64::NEG_INFINITY);
                    break;
                };
                let pf = p as f64;
                let s = ((dist[q] + qf * qf) - (dist[p] + pf * pf)) / (2.0 * (qf - pf));
                if s <= *self.bounds.last().unwrap_or(&f64::NEG_INFINITY) {
                    self.vertices.pop();
                    self.bounds.pop();
                } else {
                    self.vertices.push(q);
                    self.bounds.push(s);
                    break;
                }
            }
        }

        if self.vertices.is_empty() {
            return;
        }

        self.out_dist.clear();
        self.out_feat.clear();
        let mut k = 0;
        for q in 0..n {
            let qf = q as f64;
            while k + 1 < self.vertices.len() && self.bounds[k + 1] < qf {
                k += 1;
            }
            let p = self.vertices[k];
            let d = qf - p as f64;
            self.out_dist.push(d * d + dist[p]);
            self.out_feat.push(feat[p]);
        }
        dist.copy_from_slice(&self.out_dist);
        feat.copy_from_slice(&self.out_feat);
    }
}
