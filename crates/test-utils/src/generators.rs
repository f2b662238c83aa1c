//! Test data generators for creating synthetic climate fields.
//!
//! These generators create predictable, verifiable grids, elevation fields
//! and daily time series that can be used across the test suite.

use climate_common::{Calendar, CalendarDate, LatLonGrid, RasterField, TimeAxis, TopographyGrid};

/// Creates a regular ascending lat/lon grid.
///
/// # Arguments
///
/// * `lat0`, `lon0` - Coordinates of the first row/column
/// * `step` - Spacing in degrees, shared by both axes
/// * `n_lat`, `n_lon` - Number of rows and columns
///
/// # Example
///
/// ```
/// use test_utils::create_lat_lon_grid;
///
/// let grid = create_lat_lon_grid(40.0, 19.0, 0.5, 3, 4);
/// assert_eq!(grid.shape(), (3, 4));
/// assert_eq!(grid.lat(), &[40.0, 40.5, 41.0]);
/// ```
pub fn create_lat_lon_grid(lat0: f64, lon0: f64, step: f64, n_lat: usize, n_lon: usize) -> LatLonGrid {
    let lat = (0..n_lat).map(|i| lat0 + i as f64 * step).collect();
    let lon = (0..n_lon).map(|j| lon0 + j as f64 * step).collect();
    LatLonGrid::new(lat, lon).expect("generated coordinates are monotonic")
}

/// Creates a daily field where every value comes from `f(t, row, col)`.
///
/// # Arguments
///
/// * `grid` - Horizontal grid
/// * `start` - Date of the first step
/// * `n_days` - Number of daily steps
/// * `calendar` - Calendar of the time axis
/// * `f` - Value generator
pub fn create_daily_field<F>(
    grid: &LatLonGrid,
    start: CalendarDate,
    n_days: usize,
    calendar: Calendar,
    f: F,
) -> RasterField
where
    F: Fn(usize, usize, usize) -> f32,
{
    let (n_lat, n_lon) = grid.shape();
    let mut data = Vec::with_capacity(n_days * n_lat * n_lon);
    for t in 0..n_days {
        for row in 0..n_lat {
            for col in 0..n_lon {
                data.push(f(t, row, col));
            }
        }
    }
    RasterField::new(grid.clone(), TimeAxis::daily(start, n_days, calendar), data)
        .expect("generated data matches the grid")
}

/// Creates an elevation field rising linearly with row and column.
///
/// Each cell value is `base + row * per_row + col * per_col` metres.
pub fn create_elevation_ramp(grid: &LatLonGrid, base: f32, per_row: f32, per_col: f32) -> TopographyGrid {
    let (n_lat, n_lon) = grid.shape();
    let mut height = Vec::with_capacity(n_lat * n_lon);
    for row in 0..n_lat {
        for col in 0..n_lon {
            height.push(base + row as f32 * per_row + col as f32 * per_col);
        }
    }
    TopographyGrid::new(grid.clone(), height).expect("generated height matches the grid")
}

/// Marks the given `(row, col)` cells of a topography as sea (NaN).
pub fn with_sea_cells(mut topo: TopographyGrid, sea: &[(usize, usize)]) -> TopographyGrid {
    let n_lon = topo.grid.shape().1;
    for &(row, col) in sea {
        topo.height[row * n_lon + col] = f32::NAN;
    }
    topo
}

/// Creates a daily precipitation field, mostly dry with scattered showers.
///
/// Values are deterministic for a given `seed`; wet cells get up to 50 mm.
pub fn create_precipitation_field(
    grid: &LatLonGrid,
    start: CalendarDate,
    n_days: usize,
    calendar: Calendar,
    seed: u32,
) -> RasterField {
    create_daily_field(grid, start, n_days, calendar, |t, row, col| {
        let hash = simple_hash(col as u32, (row + t * 1000) as u32, seed);
        if hash % 4 == 0 {
            (hash % 5000) as f32 / 100.0
        } else {
            0.0
        }
    })
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_lat_lon_grid() {
        let grid = create_lat_lon_grid(40.0, 19.0, 0.1, 5, 7);
        assert_eq!(grid.shape(), (5, 7));
        assert!((grid.lon()[6] - 19.6).abs() < 1e-9);
    }

    #[test]
    fn test_create_daily_field_layout() {
        let grid = create_lat_lon_grid(0.0, 0.0, 1.0, 2, 3);
        let start = CalendarDate { year: 2000, month: 1, day: 1 };
        let field = create_daily_field(&grid, start, 2, Calendar::standard(), |t, r, c| {
            (t * 100 + r * 10 + c) as f32
        });
        assert_eq!(field.shape(), (2, 2, 3));
        assert_eq!(field.data[0], 0.0);
        assert_eq!(field.data[5], 12.0);
        assert_eq!(field.data[6], 100.0);
    }

    #[test]
    fn test_elevation_ramp_and_sea() {
        let grid = create_lat_lon_grid(0.0, 0.0, 1.0, 2, 2);
        let topo = with_sea_cells(create_elevation_ramp(&grid, 100.0, 50.0, 10.0), &[(0, 0)]);
        assert!(topo.height[0].is_nan());
        assert_eq!(topo.height[3], 160.0);
        assert_eq!(topo.land_mask(), vec![false, true, true, true]);
    }

    #[test]
    fn test_precipitation_deterministic() {
        let grid = create_lat_lon_grid(0.0, 0.0, 1.0, 10, 10);
        let start = CalendarDate { year: 2000, month: 1, day: 1 };
        let field1 = create_precipitation_field(&grid, start, 3, Calendar::standard(), 42);
        let field2 = create_precipitation_field(&grid, start, 3, Calendar::standard(), 42);
        assert_eq!(field1.data, field2.data, "Same seed should produce same data");

        let field3 = create_precipitation_field(&grid, start, 3, Calendar::standard(), 43);
        assert_ne!(field1.data, field3.data, "Different seed should produce different data");
        assert!(field1.data.iter().all(|&v| v >= 0.0));
        assert!(field1.data.iter().any(|&v| v > 0.0));
    }
}
