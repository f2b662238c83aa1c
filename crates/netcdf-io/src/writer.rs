//! CF-1.6 NetCDF output for downscaled fields.
//!
//! One file holds a single variable's daily time series on a lat/lon grid.
//! The model writer records the source model name and calendar; the
//! observation writer always uses the `gregorian` calendar and accepts the
//! short observation aliases (`rr`, `tmax`, `tmin`).

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use climate_common::{
    Calendar, CalendarDate, CalendarKind, ClimateError, ClimateVariable, LatLonGrid,
    WriterFlavor, FILL_VALUE,
};

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::silence_hdf5_errors;

/// Units of the output `time` variable.
pub const TIME_UNITS: &str = "days since 1950-01-01T00:00:00Z";

/// Conventions recorded in the global `conventions` attribute.
pub const CONVENTIONS: &str = "CF-1.6";

const EPOCH: CalendarDate = CalendarDate {
    year: 1950,
    month: 1,
    day: 1,
};

/// Global provenance attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    pub project: String,
    pub source: String,
    pub comment: String,
}

impl Provenance {
    /// Provenance describing a change from `coarse` to `fine` degrees.
    pub fn for_resolutions(coarse: f64, fine: f64) -> Self {
        Self {
            project: "Climaproof, funded by the Austrian Development Agency (ADA) and \
                      co-funded by the United Nations Environmental Programme (UNEP)"
                .to_string(),
            source: "Climaproof Downscaling Tool (Institute of Meteorology, University of \
                     Natural Resources and Life Sciences, Vienna, Austria)"
                .to_string(),
            comment: format!(
                "Data downscaled from {}° to {}° resolution with elevation-aware \
                 interpolation (monthly elevation trend removed before regridding \
                 and re-added on the fine topography)",
                format_degrees(coarse),
                format_degrees(fine)
            ),
        }
    }
}

impl Default for Provenance {
    fn default() -> Self {
        Self::for_resolutions(0.1, 0.01)
    }
}

fn format_degrees(value: f64) -> String {
    // Trim float noise from mean grid spacing, e.g. 0.010000000000002
    let rounded = (value * 1e6).round() / 1e6;
    format!("{}", rounded)
}

/// Everything a write needs besides the data itself.
#[derive(Debug, Clone)]
pub struct WriteRequest<'a> {
    pub variable: &'a str,
    pub grid: &'a LatLonGrid,
    pub start_year: i32,
    pub end_year: i32,
    pub destination: &'a Path,
    pub filename: &'a str,
}

/// Writer for one flavor of output file.
#[derive(Debug, Clone)]
pub struct GriddedWriter {
    flavor: WriterFlavor,
    model_name: Option<String>,
    calendar: Calendar,
    provenance: Provenance,
}

impl GriddedWriter {
    /// Writer for downscaled model output, keeping the source calendar.
    pub fn model(model_name: impl Into<String>, calendar: Calendar) -> Self {
        Self {
            flavor: WriterFlavor::Model,
            model_name: Some(model_name.into()),
            calendar,
            provenance: Provenance::default(),
        }
    }

    /// Writer for downscaled observations.
    pub fn observation() -> Self {
        Self {
            flavor: WriterFlavor::Observation,
            model_name: None,
            calendar: Calendar::gregorian(),
            provenance: Provenance::default(),
        }
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn flavor(&self) -> WriterFlavor {
        self.flavor
    }

    pub fn calendar(&self) -> &Calendar {
        &self.calendar
    }

    /// Write `data` (`time × lat × lon`, row-major) and return the file path.
    ///
    /// Any file already at the target path is removed first. Unknown
    /// variables and failed writes leave no file behind.
    pub fn write(&self, mut data: Vec<f32>, request: &WriteRequest<'_>) -> NetCdfResult<PathBuf> {
        let path = output_path(
            request.destination,
            request.filename,
            request.start_year,
            request.end_year,
        );
        remove_existing(&path)?;

        let variable = ClimateVariable::from_name(request.variable, self.flavor)
            .ok_or_else(|| NetCdfError::UnrecognizedVariable(request.variable.to_string()))?;

        let (n_lat, n_lon) = request.grid.shape();
        let cells = n_lat * n_lon;
        if cells == 0 || data.len() % cells != 0 {
            return Err(ClimateError::ShapeMismatch {
                shape: vec![n_lat, n_lon],
                expected: cells,
                actual: data.len(),
            }
            .into());
        }
        let n_time = data.len() / cells;

        for v in data.iter_mut().filter(|v| !v.is_finite()) {
            *v = FILL_VALUE;
        }

        let times = encode_time_axis(&self.calendar, request.start_year, request.end_year, n_time);

        let mut file = create_with_retry(&path)?;
        let result = self.populate(&mut file, request, variable, &data, &times, n_time);
        drop(file);

        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Write failed, removing partial file");
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        info!(
            path = %path.display(),
            variable = variable.name(),
            shape = ?(n_time, n_lat, n_lon),
            calendar = %self.calendar,
            "Wrote NetCDF output"
        );

        Ok(path)
    }

    fn populate(
        &self,
        file: &mut netcdf::FileMut,
        request: &WriteRequest<'_>,
        variable: ClimateVariable,
        data: &[f32],
        times: &[f64],
        n_time: usize,
    ) -> NetCdfResult<()> {
        let grid = request.grid;
        let meta = variable.metadata();

        file.add_unlimited_dimension("time")?;
        file.add_dimension("lat", grid.lat().len())?;
        file.add_dimension("lon", grid.lon().len())?;

        {
            let mut time = file.add_variable::<f64>("time", &["time"])?;
            time.put_attribute("units", TIME_UNITS)?;
            time.put_attribute("calendar", self.calendar.name())?;
            time.put_attribute("long_name", "time")?;
            time.put_attribute("axis", "T")?;
            time.put_attribute("standard_name", "time")?;
            time.put_values(times, [0..n_time])?;
        }

        {
            let lat: Vec<f32> = grid.lat().iter().map(|&v| v as f32).collect();
            let mut var = file.add_variable::<f32>("lat", &["lat"])?;
            var.put_attribute("units", "degrees_north")?;
            var.put_attribute("long_name", "latitude")?;
            var.put_attribute("standard_name", "latitude")?;
            var.put_values(&lat, ..)?;
        }

        {
            let lon: Vec<f32> = grid.lon().iter().map(|&v| v as f32).collect();
            let mut var = file.add_variable::<f32>("lon", &["lon"])?;
            var.put_attribute("units", "degrees_east")?;
            var.put_attribute("long_name", "longitude")?;
            var.put_attribute("standard_name", "longitude")?;
            var.put_values(&lon, ..)?;
        }

        {
            let mut crs = file.add_variable::<i32>("crs", &[])?;
            crs.put_attribute("grid_mapping_name", "latitude_longitude")?;
            crs.put_attribute("longitude_of_prime_meridian", 0.0f64)?;
            crs.put_attribute("semi_major_axis", 6378137.0f64)?;
            crs.put_attribute("inverse_flattening", 298.257223563f64)?;
            crs.put_attribute("comment", "Latitude and longitude on the WGS 1984 datum")?;
        }

        {
            let mut var = file.add_variable::<f32>(request.variable, &["time", "lat", "lon"])?;
            var.set_fill_value(FILL_VALUE)?;
            var.put_attribute("units", meta.units)?;
            var.put_attribute("long_name", meta.long_name)?;
            var.put_attribute("standard_name", meta.standard_name)?;
            var.put_attribute("grid_mapping", "crs")?;
            var.put_values(data, (0..n_time, .., ..))?;
        }

        file.add_attribute("title", meta.title)?;
        if let Some(model_name) = &self.model_name {
            file.add_attribute("modelname", model_name.as_str())?;
        }
        file.add_attribute("project", self.provenance.project.as_str())?;
        file.add_attribute("source", self.provenance.source.as_str())?;
        file.add_attribute("comment", self.provenance.comment.as_str())?;
        file.add_attribute("conventions", CONVENTIONS)?;
        file.add_attribute(
            "history",
            format!("{} created", Utc::now().format("%Y-%m-%dT%H:%M:%SZ")).as_str(),
        )?;

        debug!(variable = variable.name(), n_time, "Populated output file");
        Ok(())
    }
}

/// `destination/filename_START-END.nc`
pub fn output_path(destination: &Path, filename: &str, start_year: i32, end_year: i32) -> PathBuf {
    destination.join(format!("{}_{}-{}.nc", filename, start_year, end_year))
}

/// Day offsets since 1950-01-01 for `n_steps` daily steps from `start_year`.
///
/// Fixed-length calendars count arithmetically from the start of
/// `start_year`. Other calendars walk real daily dates from
/// `start_year-01-01` and encode each in the target calendar.
pub fn encode_time_axis(calendar: &Calendar, start_year: i32, end_year: i32, n_steps: usize) -> Vec<f64> {
    let year_len = match calendar.kind() {
        CalendarKind::NoLeap => Some(365),
        CalendarKind::Day360 => Some(360),
        _ => None,
    };

    if let Some(year_len) = year_len {
        let expected = (end_year - start_year + 1).max(0) as usize * year_len as usize;
        if expected != n_steps {
            warn!(
                calendar = %calendar,
                start_year,
                end_year,
                expected,
                actual = n_steps,
                "Time steps do not cover whole years"
            );
        }
        let first = (start_year as i64 - EPOCH.year as i64) * year_len;
        return (0..n_steps as i64).map(|k| (first + k) as f64).collect();
    }

    let gregorian = Calendar::standard();
    let start = CalendarDate {
        year: start_year,
        month: 1,
        day: 1,
    };
    let first = gregorian.day_number(&start);
    (0..n_steps as i64)
        .map(|k| {
            let date = gregorian.date_from_day_number(first + k);
            calendar.days_between(&EPOCH, &date) as f64
        })
        .collect()
}

fn remove_existing(path: &Path) -> NetCdfResult<()> {
    if path.exists() {
        debug!(path = %path.display(), "Removing existing output file");
        std::fs::remove_file(path)?;
    }
    Ok(())
}

/// Create the file, force-deleting and retrying once on failure.
fn create_with_retry(path: &Path) -> NetCdfResult<netcdf::FileMut> {
    silence_hdf5_errors();
    match netcdf::create(path) {
        Ok(file) => Ok(file),
        Err(first) => {
            warn!(path = %path.display(), error = %first, "Create failed, retrying after forced delete");
            let _ = std::fs::remove_file(path);
            netcdf::create(path).map_err(|e| NetCdfError::FileCollision {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let path = output_path(Path::new("/tmp/out"), "tasmax_model", 1981, 2010);
        assert_eq!(path, PathBuf::from("/tmp/out/tasmax_model_1981-2010.nc"));
    }

    #[test]
    fn test_encode_360_day() {
        let cal = Calendar::parse("360_day");
        let times = encode_time_axis(&cal, 2000, 2000, 360);
        assert_eq!(times.len(), 360);
        assert_eq!(times[0], 50.0 * 360.0);
        assert_eq!(times[359], 50.0 * 360.0 + 359.0);
    }

    #[test]
    fn test_encode_noleap() {
        let cal = Calendar::parse("noleap");
        let times = encode_time_axis(&cal, 1951, 1951, 365);
        assert_eq!(times[0], 365.0);
        assert_eq!(times[364], 729.0);
    }

    #[test]
    fn test_encode_gregorian_crosses_leap_day() {
        let cal = Calendar::gregorian();
        let times = encode_time_axis(&cal, 2000, 2000, 61);
        // 1950..2000 holds 12 leap years
        let first = (50 * 365 + 12) as f64;
        assert_eq!(times[0], first);
        assert_eq!(times[60], first + 60.0);
    }

    #[test]
    fn test_encode_all_leap_uses_real_dates() {
        let cal = Calendar::parse("all_leap");
        let times = encode_time_axis(&cal, 1951, 1951, 60);
        // Jan 1 1951 is day 366 in a 366-day calendar; the walk skips Feb 29
        assert_eq!(times[0], 366.0);
        assert_eq!(times[58], 366.0 + 58.0);
        assert_eq!(times[59], 366.0 + 60.0);
    }

    #[test]
    fn test_provenance_comment_uses_resolutions() {
        let p = Provenance::for_resolutions(0.1, 0.010000000000002);
        assert!(p.comment.contains("from 0.1° to 0.01°"), "{}", p.comment);
        assert_eq!(Provenance::default().comment, p.comment);
    }

    #[test]
    fn test_flavors() {
        let model = GriddedWriter::model("EC-EARTH", Calendar::parse("noleap"));
        assert_eq!(model.flavor(), WriterFlavor::Model);
        assert_eq!(model.calendar().name(), "noleap");

        let obs = GriddedWriter::observation();
        assert_eq!(obs.flavor(), WriterFlavor::Observation);
        assert_eq!(obs.calendar().name(), "gregorian");
    }
}
