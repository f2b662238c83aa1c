//! Rectilinear lat/lon grids and the fields that live on them.

use serde::{Deserialize, Serialize};

use crate::bbox::{BoundingBox, Extent};
use crate::error::{ClimateError, ClimateResult};
use crate::time::TimeAxis;

/// A rectilinear grid defined by monotonic 1-D coordinate arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLonGrid {
    lat: Vec<f64>,
    lon: Vec<f64>,
}

impl LatLonGrid {
    /// Create a grid, checking that both coordinates are strictly monotonic.
    pub fn new(lat: Vec<f64>, lon: Vec<f64>) -> ClimateResult<Self> {
        if !is_monotonic(&lat) {
            return Err(ClimateError::NonMonotonic("lat"));
        }
        if !is_monotonic(&lon) {
            return Err(ClimateError::NonMonotonic("lon"));
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn lon(&self) -> &[f64] {
        &self.lon
    }

    /// Spatial shape as `(n_lat, n_lon)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Number of cells in one horizontal slice.
    pub fn len(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty() || self.lon.is_empty()
    }

    /// Min/max of the coordinate values, or `None` for an empty grid.
    pub fn extent(&self) -> Option<Extent> {
        if self.is_empty() {
            return None;
        }
        let (lat_min, lat_max) = min_max(&self.lat);
        let (lon_min, lon_max) = min_max(&self.lon);
        Some(Extent {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        })
    }

    /// Mean absolute coordinate step `(d_lat, d_lon)` in degrees.
    pub fn resolution(&self) -> (f64, f64) {
        (mean_step(&self.lat), mean_step(&self.lon))
    }

    /// Indices of the rows and columns whose coordinates fall inside `bbox`.
    pub fn indices_within(&self, bbox: &BoundingBox) -> (Vec<usize>, Vec<usize>) {
        let lat_idx = self
            .lat
            .iter()
            .enumerate()
            .filter(|(_, &v)| v >= bbox.lat_min() && v <= bbox.lat_max())
            .map(|(i, _)| i)
            .collect();
        let lon_idx = self
            .lon
            .iter()
            .enumerate()
            .filter(|(_, &v)| v >= bbox.lon_min() && v <= bbox.lon_max())
            .map(|(i, _)| i)
            .collect();
        (lat_idx, lon_idx)
    }

    /// Sub-grid made of the given rows and columns.
    pub fn select(&self, lat_idx: &[usize], lon_idx: &[usize]) -> Self {
        Self {
            lat: lat_idx.iter().map(|&i| self.lat[i]).collect(),
            lon: lon_idx.iter().map(|&j| self.lon[j]).collect(),
        }
    }
}

fn is_monotonic(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1]) || values.windows(2).all(|w| w[0] > w[1])
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn mean_step(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    (values[values.len() - 1] - values[0]).abs() / (values.len() - 1) as f64
}

/// Copy the selected rows/columns of one `(lat, lon)` slice into `out`.
fn gather_slice(slice: &[f32], n_lon: usize, lat_idx: &[usize], lon_idx: &[usize], out: &mut Vec<f32>) {
    for &i in lat_idx {
        let row = &slice[i * n_lon..(i + 1) * n_lon];
        out.extend(lon_idx.iter().map(|&j| row[j]));
    }
}

/// A gridded time series indexed `(time, lat, lon)`, row-major, NaN for missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterField {
    pub grid: LatLonGrid,
    pub time: TimeAxis,
    pub data: Vec<f32>,
}

impl RasterField {
    /// Create a field, checking `data.len() == len(time) * len(lat) * len(lon)`.
    pub fn new(grid: LatLonGrid, time: TimeAxis, data: Vec<f32>) -> ClimateResult<Self> {
        let (n_lat, n_lon) = grid.shape();
        let expected = time.len() * n_lat * n_lon;
        if data.len() != expected {
            return Err(ClimateError::ShapeMismatch {
                shape: vec![time.len(), n_lat, n_lon],
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { grid, time, data })
    }

    /// Shape as `(n_time, n_lat, n_lon)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        let (n_lat, n_lon) = self.grid.shape();
        (self.time.len(), n_lat, n_lon)
    }

    pub fn n_time(&self) -> usize {
        self.time.len()
    }

    /// The `(lat, lon)` slice at time step `t`.
    pub fn slice(&self, t: usize) -> &[f32] {
        let n = self.grid.len();
        &self.data[t * n..(t + 1) * n]
    }

    pub fn slice_mut(&mut self, t: usize) -> &mut [f32] {
        let n = self.grid.len();
        &mut self.data[t * n..(t + 1) * n]
    }

    /// Structural subset of rows and columns, all time steps kept.
    pub fn select_cells(&self, lat_idx: &[usize], lon_idx: &[usize]) -> Self {
        let n_lon = self.grid.shape().1;
        let mut data = Vec::with_capacity(self.n_time() * lat_idx.len() * lon_idx.len());
        for t in 0..self.n_time() {
            gather_slice(self.slice(t), n_lon, lat_idx, lon_idx, &mut data);
        }
        Self {
            grid: self.grid.select(lat_idx, lon_idx),
            time: self.time.clone(),
            data,
        }
    }

    /// Keep only the time steps at `indices`.
    pub fn select_times(&self, indices: &[usize]) -> Self {
        let mut data = Vec::with_capacity(indices.len() * self.grid.len());
        for &t in indices {
            data.extend_from_slice(self.slice(t));
        }
        Self {
            grid: self.grid.clone(),
            time: self.time.select(indices),
            data,
        }
    }
}

/// A 2-D elevation field (`height`) in metres, NaN over sea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopographyGrid {
    pub grid: LatLonGrid,
    pub height: Vec<f32>,
}

impl TopographyGrid {
    pub fn new(grid: LatLonGrid, height: Vec<f32>) -> ClimateResult<Self> {
        let (n_lat, n_lon) = grid.shape();
        if height.len() != n_lat * n_lon {
            return Err(ClimateError::ShapeMismatch {
                shape: vec![n_lat, n_lon],
                expected: n_lat * n_lon,
                actual: height.len(),
            });
        }
        Ok(Self { grid, height })
    }

    /// `true` wherever the elevation is defined.
    pub fn land_mask(&self) -> Vec<bool> {
        self.height.iter().map(|h| !h.is_nan()).collect()
    }

    pub fn select_cells(&self, lat_idx: &[usize], lon_idx: &[usize]) -> Self {
        let mut height = Vec::with_capacity(lat_idx.len() * lon_idx.len());
        gather_slice(&self.height, self.grid.shape().1, lat_idx, lon_idx, &mut height);
        Self {
            grid: self.grid.select(lat_idx, lon_idx),
            height,
        }
    }
}
