//! Monthly elevation regression.
//!
//! For each calendar month the temporal mean of every coarse cell is
//! regressed against the coarse elevation. The elevation signal is removed
//! before regridding and re-added on the fine topography afterwards, so
//! the fine field follows the fine terrain instead of smoothed coarse
//! terrain.

use tracing::debug;

use climate_common::{ClimateError, RasterField, TopographyGrid};

use crate::error::Result;

/// Result of `y ≈ gradient · x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub gradient: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub const UNDEFINED: LinearFit = LinearFit {
        gradient: f64::NAN,
        intercept: f64::NAN,
    };
}

/// Ordinary least squares over the pairs where both samples are defined.
///
/// No pairs gives [`LinearFit::UNDEFINED`]. With constant `x` the system
/// is rank deficient and the minimum-norm solution is returned.
pub fn linreg(x: &[f64], y: &[f64]) -> LinearFit {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .map(|(&a, &b)| (a, b))
        .collect();

    if pairs.is_empty() {
        return LinearFit::UNDEFINED;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let sxx: f64 = pairs.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    let sxy: f64 = pairs.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();

    // Relative to the magnitude of x, so large elevations with tiny spread still count
    let scale = pairs.iter().map(|p| p.0 * p.0).sum::<f64>().max(1.0);
    if sxx <= scale * 1e-12 {
        let denom = mean_x * mean_x + 1.0;
        return LinearFit {
            gradient: mean_x * mean_y / denom,
            intercept: mean_y / denom,
        };
    }

    let gradient = sxy / sxx;
    LinearFit {
        gradient,
        intercept: mean_y - gradient * mean_x,
    }
}

/// One fit per calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTrend {
    pub fits: [LinearFit; 12],
}

impl MonthlyTrend {
    /// Gradient for a month in 1..=12.
    pub fn gradient(&self, month: u32) -> f64 {
        self.fits[(month as usize).saturating_sub(1).min(11)].gradient
    }

    pub fn intercept(&self, month: u32) -> f64 {
        self.fits[(month as usize).saturating_sub(1).min(11)].intercept
    }
}

/// Remove the elevation signal from a coarse field, in place.
///
/// Sea cells (undefined elevation) become NaN in every step.
pub fn detrend(field: &mut RasterField, topo: &TopographyGrid) -> Result<MonthlyTrend> {
    check_grid(field, topo)?;

    let n_cells = field.grid.len();
    let months = field.time.months();
    let elevation: Vec<f64> = topo.height.iter().map(|&h| h as f64).collect();

    let mut fits = [LinearFit::UNDEFINED; 12];
    for (m, fit) in fits.iter_mut().enumerate() {
        let month = m as u32 + 1;
        let steps: Vec<usize> = months
            .iter()
            .enumerate()
            .filter(|(_, &mo)| mo == month)
            .map(|(t, _)| t)
            .collect();
        if steps.is_empty() {
            continue;
        }

        let means = monthly_mean(field, &steps, n_cells);
        *fit = linreg(&elevation, &means);

        debug!(
            month,
            steps = steps.len(),
            gradient = fit.gradient,
            intercept = fit.intercept,
            "Elevation regression"
        );

        for &t in &steps {
            for (v, &h) in field.slice_mut(t).iter_mut().zip(&topo.height) {
                *v = (*v as f64 - fit.gradient * h as f64) as f32;
            }
        }
    }

    Ok(MonthlyTrend { fits })
}

/// Add `gradient[month] · elevation` back onto a fine field, in place.
///
/// Cells without elevation are left untouched.
pub fn retrend(field: &mut RasterField, trend: &MonthlyTrend, topo: &TopographyGrid) -> Result<()> {
    check_grid(field, topo)?;

    let months = field.time.months();
    for (t, month) in months.into_iter().enumerate() {
        let gradient = trend.gradient(month);
        for (v, &h) in field.slice_mut(t).iter_mut().zip(&topo.height) {
            if !h.is_nan() {
                *v = (*v as f64 + gradient * h as f64) as f32;
            }
        }
    }
    Ok(())
}

/// Per-cell mean over `steps`, skipping NaN; all-NaN cells give NaN.
fn monthly_mean(field: &RasterField, steps: &[usize], n_cells: usize) -> Vec<f64> {
    let mut sum = vec![0.0f64; n_cells];
    let mut count = vec![0u32; n_cells];
    for &t in steps {
        for (i, &v) in field.slice(t).iter().enumerate() {
            if !v.is_nan() {
                sum[i] += v as f64;
                count[i] += 1;
            }
        }
    }
    sum.into_iter()
        .zip(count)
        .map(|(s, c)| if c == 0 { f64::NAN } else { s / c as f64 })
        .collect()
}

fn check_grid(field: &RasterField, topo: &TopographyGrid) -> Result<()> {
    if field.grid.shape() != topo.grid.shape() {
        let (n_lat, n_lon) = field.grid.shape();
        return Err(ClimateError::ShapeMismatch {
            shape: vec![n_lat, n_lon],
            expected: n_lat * n_lon,
            actual: topo.height.len(),
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::{Calendar, CalendarDate, LatLonGrid, TimeAxis};

    fn grid() -> LatLonGrid {
        LatLonGrid::new(vec![40.0, 40.1, 40.2], vec![19.0, 19.1, 19.2]).unwrap()
    }

    fn topo(height: Vec<f32>) -> TopographyGrid {
        TopographyGrid::new(grid(), height).unwrap()
    }

    fn year_field<F: Fn(u32, usize) -> f32>(f: F) -> RasterField {
        let calendar = Calendar::parse("noleap");
        let time = TimeAxis::daily(CalendarDate { year: 2001, month: 1, day: 1 }, 365, calendar);
        let months = time.months();
        let mut data = Vec::with_capacity(365 * 9);
        for month in months {
            for cell in 0..9 {
                data.push(f(month, cell));
            }
        }
        RasterField::new(grid(), time, data).unwrap()
    }

    #[test]
    fn test_linreg_exact_line() {
        let x = [0.0, 100.0, 250.0, 900.0];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 5.0).collect();
        let fit = linreg(&x, &y);
        assert!((fit.gradient - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_linreg_drops_undefined_pairs() {
        let x = [0.0, 1.0, f64::NAN, 3.0];
        let y = [1.0, f64::NAN, 100.0, 7.0];
        let fit = linreg(&x, &y);
        assert!((fit.gradient - 2.0).abs() < 1e-12);
        assert!((fit.intercept - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_linreg_no_samples() {
        let fit = linreg(&[1.0, 2.0], &[f64::NAN, f64::NAN]);
        assert!(fit.gradient.is_nan());
        assert!(fit.intercept.is_nan());
    }

    #[test]
    fn test_linreg_constant_elevation_minimum_norm() {
        let fit = linreg(&[2.0, 2.0, 2.0], &[10.0, 10.0, 10.0]);
        // minimise g² + c² subject to 2g + c = 10
        assert!((fit.gradient - 4.0).abs() < 1e-12);
        assert!((fit.intercept - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_detrend_recovers_gradient_every_month() {
        let height: Vec<f32> = (0..9).map(|i| i as f32 * 150.0).collect();
        let topo = topo(height.clone());
        let mut field = year_field(|_, cell| 2.0 * height[cell] + 5.0);

        let trend = detrend(&mut field, &topo).unwrap();
        for month in 1..=12 {
            assert!((trend.gradient(month) - 2.0).abs() < 1e-6, "month {}", month);
            assert!((trend.intercept(month) - 5.0).abs() < 1e-3, "month {}", month);
        }
        // What is left is the intercept
        assert!(field.data.iter().all(|&v| (v - 5.0).abs() < 1e-3));
    }

    #[test]
    fn test_detrend_month_specific_gradients() {
        let height: Vec<f32> = (0..9).map(|i| i as f32 * 100.0).collect();
        let topo = topo(height.clone());
        let mut field = year_field(|month, cell| -0.001 * month as f32 * height[cell] + 20.0);

        let trend = detrend(&mut field, &topo).unwrap();
        assert!((trend.gradient(1) + 0.001).abs() < 1e-6);
        assert!((trend.gradient(12) + 0.012).abs() < 1e-6);
    }

    #[test]
    fn test_sea_cells_become_nan() {
        let mut height: Vec<f32> = (0..9).map(|i| i as f32 * 100.0).collect();
        height[4] = f32::NAN;
        let topo = topo(height);
        let mut field = year_field(|_, _| 1.0);

        detrend(&mut field, &topo).unwrap();
        for t in 0..field.n_time() {
            assert!(field.slice(t)[4].is_nan());
            assert!(!field.slice(t)[0].is_nan());
        }
    }

    #[test]
    fn test_month_without_data_stays_undefined() {
        let height: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let topo = topo(height);
        let mut field = year_field(|month, _| if month == 3 { f32::NAN } else { 1.0 });

        let trend = detrend(&mut field, &topo).unwrap();
        assert!(trend.gradient(3).is_nan());
        assert!(!trend.gradient(4).is_nan());
    }

    #[test]
    fn test_retrend_adds_fine_elevation() {
        let trend = MonthlyTrend {
            fits: [LinearFit { gradient: 0.5, intercept: 0.0 }; 12],
        };
        let mut height = vec![10.0f32; 9];
        height[0] = f32::NAN;
        let topo = topo(height);
        let mut field = year_field(|_, _| 1.0);

        retrend(&mut field, &trend, &topo).unwrap();
        assert_eq!(field.slice(0)[0], 1.0);
        assert_eq!(field.slice(0)[1], 6.0);
        assert_eq!(field.slice(364)[8], 6.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let other = LatLonGrid::new(vec![40.0, 40.1], vec![19.0, 19.1]).unwrap();
        let topo = TopographyGrid::new(other, vec![0.0; 4]).unwrap();
        let mut field = year_field(|_, _| 0.0);
        assert!(detrend(&mut field, &topo).is_err());
    }
}
