//! Spatial and temporal subsetting.

use tracing::{debug, info, warn};

use climate_common::{
    BoundingBox, Calendar, CalendarDate, ClimateResult, LatLonGrid, RasterField, TimeAxis,
    TopographyGrid,
};

use crate::error::{DownscaleError, Result};

/// Data on a lat/lon grid that can be cut to a bounding box.
pub trait Subsettable: Sized {
    fn grid(&self) -> &LatLonGrid;

    /// Structural subset of rows and columns.
    fn select_cells(&self, lat_idx: &[usize], lon_idx: &[usize]) -> Self;

    /// Time coordinate, for data that has one.
    fn time_axis(&self) -> Option<&TimeAxis> {
        None
    }

    /// Keep the time steps at `indices`; only called when [`time_axis`] is `Some`.
    ///
    /// [`time_axis`]: Subsettable::time_axis
    fn select_times(self, _indices: &[usize]) -> Self {
        self
    }
}

impl Subsettable for RasterField {
    fn grid(&self) -> &LatLonGrid {
        &self.grid
    }

    fn select_cells(&self, lat_idx: &[usize], lon_idx: &[usize]) -> Self {
        RasterField::select_cells(self, lat_idx, lon_idx)
    }

    fn time_axis(&self) -> Option<&TimeAxis> {
        Some(&self.time)
    }

    fn select_times(self, indices: &[usize]) -> Self {
        RasterField::select_times(&self, indices)
    }
}

impl Subsettable for TopographyGrid {
    fn grid(&self) -> &LatLonGrid {
        &self.grid
    }

    fn select_cells(&self, lat_idx: &[usize], lon_idx: &[usize]) -> Self {
        TopographyGrid::select_cells(self, lat_idx, lon_idx)
    }
}

/// Inclusive year range; a zero on either side means "all time steps".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// No time filtering.
    pub const ALL: YearRange = YearRange { start: 0, end: 0 };

    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn is_unbounded(&self) -> bool {
        self.start == 0 || self.end == 0
    }

    /// First and last day of the range in `calendar`.
    ///
    /// Falls back to December 30 when the calendar has no December 31.
    pub fn window(&self, calendar: &Calendar) -> ClimateResult<(CalendarDate, CalendarDate)> {
        let first = CalendarDate::new(self.start, 1, 1, calendar)?;
        let last = match CalendarDate::new(self.end, 12, 31, calendar) {
            Ok(date) => date,
            Err(_) => {
                debug!(calendar = %calendar, year = self.end, "No Dec 31 in calendar, ending on Dec 30");
                CalendarDate::new(self.end, 12, 30, calendar)?
            }
        };
        Ok((first, last))
    }
}

/// Whether `bbox` reaches outside the data's coordinate extent.
///
/// Edges equal to the extent are inside. An empty grid always fails.
pub fn check_domain<T: Subsettable>(data: &T, bbox: &BoundingBox) -> bool {
    match data.grid().extent() {
        Some(extent) => bbox.exceeds(&extent),
        None => true,
    }
}

/// Cut `data` to `bbox` and, for time series, to `years`.
pub fn cut_domain<T: Subsettable>(data: &T, bbox: &BoundingBox, years: YearRange) -> Result<T> {
    if check_domain(data, bbox) {
        let extent = data
            .grid()
            .extent()
            .ok_or_else(|| DownscaleError::empty_selection("data grid has no cells"))?;
        warn!(requested = %bbox, extent = %extent, "Requested domain is outside the data");
        return Err(DownscaleError::DomainOutOfBounds {
            requested: *bbox,
            extent,
        });
    }

    let (lat_idx, lon_idx) = data.grid().indices_within(bbox);
    if lat_idx.is_empty() || lon_idx.is_empty() {
        return Err(DownscaleError::empty_selection(format!(
            "no grid points inside {}",
            bbox
        )));
    }

    let subset = data.select_cells(&lat_idx, &lon_idx);

    let subset = match subset.time_axis() {
        Some(axis) if !years.is_unbounded() => {
            let indices = steps_within(axis, years)?;
            if indices.is_empty() {
                return Err(DownscaleError::empty_selection(format!(
                    "no time steps between {} and {}",
                    years.start, years.end
                )));
            }
            subset.select_times(&indices)
        }
        _ => subset,
    };

    info!(
        bbox = %bbox,
        rows = lat_idx.len(),
        cols = lon_idx.len(),
        "Cut domain"
    );

    Ok(subset)
}

/// Indices of the steps whose date falls inside `years`, compared by calendar day.
fn steps_within(axis: &TimeAxis, years: YearRange) -> Result<Vec<usize>> {
    let (first, last) = years.window(&axis.calendar)?;
    Ok(axis
        .dates()
        .iter()
        .enumerate()
        .filter(|(_, d)| **d >= first && **d <= last)
        .map(|(i, _)| i)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use climate_common::TimeUnits;

    fn grid() -> LatLonGrid {
        LatLonGrid::new(
            (0..11).map(|i| 30.0 + i as f64 * 2.0).collect(),
            (0..11).map(|j| 10.0 + j as f64 * 2.0).collect(),
        )
        .unwrap()
    }

    fn topo() -> TopographyGrid {
        TopographyGrid::new(grid(), (0..121).map(|v| v as f32).collect()).unwrap()
    }

    fn daily_field(calendar: &str, start_year: i32, n_days: usize) -> RasterField {
        let grid = LatLonGrid::new(vec![40.0, 41.0], vec![19.0, 20.0]).unwrap();
        let time = TimeAxis::daily(
            CalendarDate { year: start_year, month: 1, day: 1 },
            n_days,
            Calendar::parse(calendar),
        );
        RasterField::new(grid, time, vec![1.0; n_days * 4]).unwrap()
    }

    #[test]
    fn test_check_domain() {
        let t = topo();
        // extent: lat [30, 50], lon [10, 30]
        let inside = BoundingBox::new(35.0, 40.0, 15.0, 20.0).unwrap();
        let equal = BoundingBox::new(30.0, 50.0, 10.0, 30.0).unwrap();
        let one_out = BoundingBox::new(35.0, 50.5, 15.0, 20.0).unwrap();
        assert!(!check_domain(&t, &inside));
        assert!(!check_domain(&t, &equal));
        assert!(check_domain(&t, &one_out));
    }

    #[test]
    fn test_cut_domain_shrinks_coordinates() {
        let bbox = BoundingBox::new(35.0, 40.0, 15.0, 20.0).unwrap();
        let subset = cut_domain(&topo(), &bbox, YearRange::ALL).unwrap();
        assert_eq!(subset.grid.lat(), &[36.0, 38.0, 40.0]);
        assert_eq!(subset.grid.lon(), &[16.0, 18.0, 20.0]);
        // row 3, col 3 of the 11x11 ramp
        assert_eq!(subset.height[0], 36.0);
    }

    #[test]
    fn test_cut_domain_out_of_bounds() {
        let bbox = BoundingBox::new(25.0, 40.0, 15.0, 20.0).unwrap();
        match cut_domain(&topo(), &bbox, YearRange::ALL) {
            Err(DownscaleError::DomainOutOfBounds { requested, extent }) => {
                assert_eq!(requested, bbox);
                assert_eq!(extent.lat_min, 30.0);
            }
            other => panic!("expected DomainOutOfBounds, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_cut_domain_between_grid_points_is_empty() {
        let bbox = BoundingBox::new(30.5, 31.5, 15.0, 20.0).unwrap();
        assert!(matches!(
            cut_domain(&topo(), &bbox, YearRange::ALL),
            Err(DownscaleError::EmptySelection(_))
        ));
    }

    #[test]
    fn test_360_day_calendar_ends_on_dec_30() {
        let field = daily_field("360_day", 1999, 3 * 360);
        let bbox = BoundingBox::new(40.0, 41.0, 19.0, 20.0).unwrap();
        let subset = cut_domain(&field, &bbox, YearRange::new(2000, 2000)).unwrap();

        let dates = subset.time.dates();
        assert_eq!(subset.n_time(), 360);
        assert_eq!(dates[0], CalendarDate { year: 2000, month: 1, day: 1 });
        assert_eq!(*dates.last().unwrap(), CalendarDate { year: 2000, month: 12, day: 30 });
    }

    #[test]
    fn test_standard_calendar_year_slice() {
        let field = daily_field("standard", 1999, 365 + 366 + 365);
        let bbox = BoundingBox::new(40.0, 41.0, 19.0, 20.0).unwrap();
        let subset = cut_domain(&field, &bbox, YearRange::new(2000, 2000)).unwrap();
        assert_eq!(subset.n_time(), 366);
        assert_eq!(
            *subset.time.dates().last().unwrap(),
            CalendarDate { year: 2000, month: 12, day: 31 }
        );
    }

    #[test]
    fn test_zero_year_sentinel_keeps_time() {
        let field = daily_field("noleap", 1999, 400);
        let bbox = BoundingBox::new(40.0, 41.0, 19.0, 20.0).unwrap();
        assert_eq!(cut_domain(&field, &bbox, YearRange::new(0, 2000)).unwrap().n_time(), 400);
        assert_eq!(cut_domain(&field, &bbox, YearRange::new(1999, 0)).unwrap().n_time(), 400);
    }

    #[test]
    fn test_hourly_units_compare_by_day() {
        let grid = LatLonGrid::new(vec![40.0, 41.0], vec![19.0, 20.0]).unwrap();
        let units = TimeUnits::parse("hours since 1999-12-31 00:00:00").unwrap();
        let time = TimeAxis::new(vec![12.0, 36.0, 8796.0, 8808.0], units, Calendar::standard());
        let field = RasterField::new(grid, time, vec![0.0; 16]).unwrap();
        let bbox = BoundingBox::new(40.0, 41.0, 19.0, 20.0).unwrap();

        let subset = cut_domain(&field, &bbox, YearRange::new(2000, 2000)).unwrap();
        // 1999-12-31T12, 2000-01-01T12, 2000-12-31T12, 2001-01-01T00
        assert_eq!(subset.time.values, vec![36.0, 8796.0]);
    }

    #[test]
    fn test_no_steps_in_range() {
        let field = daily_field("standard", 1999, 10);
        let bbox = BoundingBox::new(40.0, 41.0, 19.0, 20.0).unwrap();
        assert!(matches!(
            cut_domain(&field, &bbox, YearRange::new(2005, 2006)),
            Err(DownscaleError::EmptySelection(_))
        ));
    }
}
