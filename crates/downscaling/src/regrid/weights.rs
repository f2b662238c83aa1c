//! Weight generation for the built-in regrid methods.
//!
//! Weights depend on grid geometry only. Destination points outside the
//! source coordinate extent get an empty weight list.

use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

use climate_common::LatLonGrid;

use super::RegridMethod;

/// Sparse weights: for each destination cell, `(source_cell, weight)` pairs.
///
/// Cells are flat row-major indices into one `(lat, lon)` slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegridWeights {
    pub method: RegridMethod,
    pub src_shape: (usize, usize),
    pub dst_shape: (usize, usize),
    pub entries: Vec<Vec<(u32, f64)>>,
}

impl RegridWeights {
    /// Number of destination cells with at least one contributor.
    pub fn covered_cells(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_empty()).count()
    }
}

/// Position of `v` along a monotonic axis.
///
/// Returns the lower bracketing index and the fraction towards the next
/// index. Values within a tiny tolerance of the ends are clamped onto them.
fn locate(coords: &[f64], v: f64) -> Option<(usize, f64)> {
    let n = coords.len();
    if n == 0 || !v.is_finite() {
        return None;
    }
    if n == 1 {
        return ((v - coords[0]).abs() <= 1e-9).then_some((0, 0.0));
    }

    let ascending = coords[1] > coords[0];
    let first = coords[0];
    let last = coords[n - 1];
    let tol = 1e-9 * ((last - first).abs() / (n - 1) as f64);
    let (lo, hi) = if ascending { (first, last) } else { (last, first) };
    if v < lo - tol || v > hi + tol {
        return None;
    }
    let v = v.clamp(lo, hi);

    // Index of the first coordinate past v in the axis direction
    let upper = if ascending {
        coords.partition_point(|&c| c <= v)
    } else {
        coords.partition_point(|&c| c >= v)
    };
    let i0 = upper.saturating_sub(1).min(n - 2);
    let t = (v - coords[i0]) / (coords[i0 + 1] - coords[i0]);
    Some((i0, t.clamp(0.0, 1.0)))
}

/// Bilinear weights from the (up to) four source cells around each point.
pub fn bilinear_weights(src: &LatLonGrid, dst: &LatLonGrid) -> RegridWeights {
    let n_lon = src.lon().len();
    let mut entries = Vec::with_capacity(dst.len());

    for &lat in dst.lat() {
        let row = locate(src.lat(), lat);
        for &lon in dst.lon() {
            let col = locate(src.lon(), lon);
            entries.push(match (row, col) {
                (Some(r), Some(c)) => bilinear_entry(r, c, n_lon, src.shape()),
                _ => Vec::new(),
            });
        }
    }

    RegridWeights {
        method: RegridMethod::Bilinear,
        src_shape: src.shape(),
        dst_shape: dst.shape(),
        entries,
    }
}

fn bilinear_entry(
    (i0, ty): (usize, f64),
    (j0, tx): (usize, f64),
    n_lon: usize,
    (n_lat_src, n_lon_src): (usize, usize),
) -> Vec<(u32, f64)> {
    let i1 = (i0 + 1).min(n_lat_src - 1);
    let j1 = (j0 + 1).min(n_lon_src - 1);

    let corners = [
        (i0, j0, (1.0 - ty) * (1.0 - tx)),
        (i0, j1, (1.0 - ty) * tx),
        (i1, j0, ty * (1.0 - tx)),
        (i1, j1, ty * tx),
    ];

    let mut entry: Vec<(u32, f64)> = Vec::with_capacity(4);
    for (i, j, w) in corners {
        if w == 0.0 {
            continue;
        }
        let idx = (i * n_lon + j) as u32;
        // Single-row or single-column grids repeat corners
        match entry.iter_mut().find(|(k, _)| *k == idx) {
            Some((_, acc)) => *acc += w,
            None => entry.push((idx, w)),
        }
    }
    entry
}

/// Patch weights: least-squares fit of `a + b·x + c·y + d·x·y` over the
/// up-to-4×4 block of source cells around each point, evaluated at the point.
///
/// The fit is linear in the source values, so each cell's weight is the
/// first row of `(AᵀA)⁻¹Aᵀ` in coordinates centred on the destination point.
/// Points whose block cannot support the fit fall back to bilinear weights.
pub fn patch_weights(src: &LatLonGrid, dst: &LatLonGrid) -> RegridWeights {
    let (n_lat, n_lon) = src.shape();
    let (d_lat, d_lon) = src.resolution();
    let scale_lat = if d_lat > 0.0 { d_lat } else { 1.0 };
    let scale_lon = if d_lon > 0.0 { d_lon } else { 1.0 };

    let mut entries = Vec::with_capacity(dst.len());

    for &lat in dst.lat() {
        let row = locate(src.lat(), lat);
        for &lon in dst.lon() {
            let col = locate(src.lon(), lon);
            let (r, c) = match (row, col) {
                (Some(r), Some(c)) => (r, c),
                _ => {
                    entries.push(Vec::new());
                    continue;
                }
            };

            let rows = block_range(r.0, n_lat);
            let cols = block_range(c.0, n_lon);

            let mut cells = Vec::with_capacity(16);
            let mut ata = Matrix4::<f64>::zeros();
            for i in rows.clone() {
                let y = (src.lat()[i] - lat) / scale_lat;
                for j in cols.clone() {
                    let x = (src.lon()[j] - lon) / scale_lon;
                    let a = Vector4::new(1.0, x, y, x * y);
                    ata += a * a.transpose();
                    cells.push(((i * n_lon + j) as u32, a));
                }
            }

            let entry = match ata.try_inverse() {
                Some(inv) if rows.len() >= 2 && cols.len() >= 2 => {
                    let first_row = inv.row(0).transpose();
                    cells
                        .into_iter()
                        .map(|(idx, a)| (idx, first_row.dot(&a)))
                        .filter(|(_, w)| *w != 0.0)
                        .collect()
                }
                _ => bilinear_entry(r, c, n_lon, (n_lat, n_lon)),
            };
            entries.push(entry);
        }
    }

    RegridWeights {
        method: RegridMethod::Patch,
        src_shape: src.shape(),
        dst_shape: dst.shape(),
        entries,
    }
}

/// Indices `i0-1 ..= i0+2`, clipped to the axis.
fn block_range(i0: usize, n: usize) -> std::ops::Range<usize> {
    i0.saturating_sub(1)..(i0 + 3).min(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(lat: Vec<f64>, lon: Vec<f64>) -> LatLonGrid {
        LatLonGrid::new(lat, lon).unwrap()
    }

    #[test]
    fn test_locate_ascending_and_descending() {
        assert_eq!(locate(&[0.0, 1.0, 2.0], 0.5), Some((0, 0.5)));
        assert_eq!(locate(&[0.0, 1.0, 2.0], 2.0), Some((1, 1.0)));
        assert_eq!(locate(&[0.0, 1.0, 2.0], 2.5), None);
        assert_eq!(locate(&[2.0, 1.0, 0.0], 1.5), Some((0, 0.5)));
        assert_eq!(locate(&[2.0, 1.0, 0.0], 0.0), Some((1, 1.0)));
        assert_eq!(locate(&[5.0], 5.0), Some((0, 0.0)));
        assert_eq!(locate(&[5.0], 5.1), None);
    }

    #[test]
    fn test_locate_tolerates_float_noise() {
        let coords = [40.0, 40.1, 40.2];
        assert!(locate(&coords, 40.2 + 1e-13).is_some());
        assert!(locate(&coords, 40.0 - 1e-13).is_some());
    }

    #[test]
    fn test_bilinear_weights_sum_to_one() {
        let src = grid(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 2.0]);
        let dst = grid(vec![0.25, 1.5], vec![0.5, 1.75]);
        let weights = bilinear_weights(&src, &dst);
        assert_eq!(weights.covered_cells(), 4);
        for entry in &weights.entries {
            let sum: f64 = entry.iter().map(|(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-12);
            assert!(entry.len() <= 4);
        }
    }

    #[test]
    fn test_bilinear_on_source_point_is_identity() {
        let src = grid(vec![0.0, 1.0], vec![0.0, 1.0]);
        let dst = grid(vec![1.0], vec![0.0]);
        let weights = bilinear_weights(&src, &dst);
        assert_eq!(weights.entries[0], vec![(2, 1.0)]);
    }

    #[test]
    fn test_patch_weights_sum_to_one() {
        let src = grid(
            (0..5).map(|i| i as f64 * 0.1).collect(),
            (0..5).map(|j| j as f64 * 0.1).collect(),
        );
        let dst = grid(vec![0.05, 0.23, 0.4], vec![0.0, 0.17, 0.39]);
        let weights = patch_weights(&src, &dst);
        for entry in &weights.entries {
            let sum: f64 = entry.iter().map(|(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-9, "sum {}", sum);
            assert!(entry.len() <= 16);
        }
    }

    #[test]
    fn test_patch_single_row_falls_back() {
        let src = grid(vec![10.0], vec![0.0, 1.0, 2.0]);
        let dst = grid(vec![10.0], vec![0.5]);
        let weights = patch_weights(&src, &dst);
        assert_eq!(weights.entries[0], vec![(0, 0.5), (1, 0.5)]);
    }
}
