//! Test support for the downscaling workspace.
//!
//! - [`generators`]: synthetic grids, daily fields and elevation ramps
//! - [`netcdf_files`]: small NetCDF inputs in the layout the readers expect
//! - [`fixtures`]: resolutions, calendar names and model identifiers
//! - [`paths`]: lookup of optional real-data files
//!
//! Real topography and observation files are large and not checked in.
//! Tests that need them use [`require_test_files!`] and are skipped when
//! the files are missing.
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod fixtures;
pub mod generators;
pub mod netcdf_files;
pub mod paths;

pub use fixtures::*;
pub use generators::*;
pub use netcdf_files::*;
pub use paths::*;

/// Message printed when a data-dependent test is skipped.
#[doc(hidden)]
pub fn report_skipped(name: &str) {
    eprintln!(
        "SKIPPED: '{}' not found (set TEST_DATA_DIR or copy it to crates/downscaling/testdata)",
        name
    );
}

/// Difference between two values if it exceeds `epsilon`, compared as f64.
#[doc(hidden)]
pub fn exceeds_tolerance(left: f64, right: f64, epsilon: f64) -> Option<f64> {
    let diff = (left - right).abs();
    (diff > epsilon).then_some(diff)
}

/// Resolve every named test file or return early from the test.
///
/// ```ignore
/// #[test]
/// fn test_real_run() {
///     let paths = require_test_files!("topo_coarse.nc", "topo_fine.nc");
///     let coarse = read_topography(&paths[0]).unwrap();
/// }
/// ```
#[macro_export]
macro_rules! require_test_files {
    ($($name:expr),+ $(,)?) => {{
        let mut paths: Vec<std::path::PathBuf> = Vec::new();
        $(
            match $crate::find_test_file($name) {
                Some(path) => paths.push(path),
                None => {
                    $crate::report_skipped($name);
                    return;
                }
            }
        )+
        paths
    }};
}

/// Single-file form of [`require_test_files!`].
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                $crate::report_skipped($name);
                return;
            }
        }
    }};
}

/// Assert two numbers are within `epsilon` of each other.
///
/// ```ignore
/// assert_approx_eq!(downscaled, 20.0 - 0.0065 * height, 1e-2);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right) = ($left as f64, $right as f64);
        if let Some(diff) = $crate::exceeds_tolerance(left, right, $epsilon as f64) {
            panic!(
                "assertion failed: {} ≈ {}\n  diff {} exceeds {}",
                left, right, diff, $epsilon
            );
        }
    }};
}

/// Assert two field slices match cell by cell; NaN only matches NaN.
#[macro_export]
macro_rules! assert_slice_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right) = ($left, $right);
        assert_eq!(left.len(), right.len(), "slice lengths differ");
        for (i, (&l, &r)) in left.iter().zip(right.iter()).enumerate() {
            let (l, r) = (l as f64, r as f64);
            if l.is_nan() || r.is_nan() {
                assert!(l.is_nan() && r.is_nan(), "cell {}: {} vs {}", i, l, r);
            } else if let Some(diff) = $crate::exceeds_tolerance(l, r, $epsilon as f64) {
                panic!("cell {}: {} vs {}, diff {} exceeds {}", i, l, r, diff, $epsilon);
            }
        }
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_assert_approx_eq_passes() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
        assert_approx_eq!(-5.5f32, -5.500001f32, 0.0001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn test_assert_approx_eq_fails() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn test_assert_slice_approx_eq_passes() {
        assert_slice_approx_eq!(&[1.0001f32, f32::NAN], &[1.0f32, f32::NAN], 0.001);
    }

    #[test]
    #[should_panic(expected = "cell 1")]
    fn test_assert_slice_approx_eq_nan_mismatch() {
        assert_slice_approx_eq!(&[1.0f32, f32::NAN], &[1.0f32, 2.0f32], 0.001);
    }

    #[test]
    fn test_require_skips_missing_file() {
        let mut reached = false;
        let mut probe = || {
            let _path = require_test_file!("no_such_topography_5821.nc");
            reached = true;
        };
        probe();
        assert!(!reached);
    }
}
