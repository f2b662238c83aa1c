//! Loading of gridded source data and topography.
//!
//! Values equal to `_FillValue` or `missing_value` become NaN and packed
//! data is unpacked with `scale_factor`/`add_offset`.

use std::path::Path;

use tracing::{debug, info};

use climate_common::{Calendar, LatLonGrid, RasterField, TimeAxis, TimeUnits, TopographyGrid};

use crate::error::{NetCdfError, NetCdfResult};
use crate::native::{
    dimension_names, get_f64_attr, get_global_string_attr, get_string_attr, open, require_variable,
};

/// Name of the elevation variable in topography files.
pub const HEIGHT_VARIABLE: &str = "height";

/// Calendar used when a `time` variable carries no `calendar` attribute.
pub const DEFAULT_CALENDAR: &str = "standard";

/// Model identity read from a model output file.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelAttributes {
    pub model_name: String,
    pub calendar: Calendar,
}

/// Load a `(time, lat, lon)` variable together with its coordinates.
pub fn read_raster(path: &Path, variable: &str) -> NetCdfResult<RasterField> {
    let file = open(path)?;
    let grid = read_grid(&file)?;
    let time = read_time_axis(&file)?;

    let var = require_variable(&file, variable)?;
    let dims = dimension_names(&var);
    if dims != ["time", "lat", "lon"] {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} must be laid out (time, lat, lon), found {:?}",
            variable, dims
        )));
    }

    let data = read_unpacked(&var)?;
    let field = RasterField::new(grid, time, data)?;

    info!(
        path = %path.display(),
        variable = variable,
        shape = ?field.shape(),
        calendar = %field.time.calendar,
        "Loaded raster"
    );

    Ok(field)
}

/// Load the `height` variable of a topography file.
///
/// A leading length-1 dimension (e.g. a single time step) is accepted.
pub fn read_topography(path: &Path) -> NetCdfResult<TopographyGrid> {
    let file = open(path)?;
    let grid = read_grid(&file)?;

    let var = require_variable(&file, HEIGHT_VARIABLE)?;
    let dims = dimension_names(&var);
    let spatial_ok = dims.len() >= 2 && dims[dims.len() - 2..] == ["lat", "lon"];
    let leading_ok = var.dimensions()[..dims.len().saturating_sub(2)]
        .iter()
        .all(|d| d.len() == 1);
    if !spatial_ok || !leading_ok {
        return Err(NetCdfError::InvalidFormat(format!(
            "{} must be laid out (lat, lon), found {:?}",
            HEIGHT_VARIABLE, dims
        )));
    }

    let height = read_unpacked(&var)?;
    let topo = TopographyGrid::new(grid, height)?;

    info!(
        path = %path.display(),
        shape = ?topo.grid.shape(),
        "Loaded topography"
    );

    Ok(topo)
}

/// Read the model name and calendar of a model output file.
pub fn read_model_attributes(path: &Path) -> NetCdfResult<ModelAttributes> {
    let file = open(path)?;

    let time = require_variable(&file, "time")?;
    let calendar = Calendar::parse(
        &get_string_attr(&time, "calendar").unwrap_or_else(|| DEFAULT_CALENDAR.to_string()),
    );

    let model_name = get_global_string_attr(&file, "modelname")
        .ok_or_else(|| NetCdfError::MissingData("modelname global attribute".to_string()))?;

    debug!(model = %model_name, calendar = %calendar, "Read model attributes");

    Ok(ModelAttributes {
        model_name,
        calendar,
    })
}

fn read_grid(file: &netcdf::File) -> NetCdfResult<LatLonGrid> {
    let lat: Vec<f64> = require_variable(file, "lat")?.get_values(..)?;
    let lon: Vec<f64> = require_variable(file, "lon")?.get_values(..)?;
    Ok(LatLonGrid::new(lat, lon)?)
}

fn read_time_axis(file: &netcdf::File) -> NetCdfResult<TimeAxis> {
    let var = require_variable(file, "time")?;
    let values: Vec<f64> = var.get_values(..)?;

    let units = get_string_attr(&var, "units")
        .ok_or_else(|| NetCdfError::MissingData("units attribute on time".to_string()))?;
    let units = TimeUnits::parse(&units)?;

    let calendar = get_string_attr(&var, "calendar").unwrap_or_else(|| DEFAULT_CALENDAR.to_string());

    Ok(TimeAxis::new(values, units, Calendar::parse(&calendar)))
}

/// Read a variable as f32, masking fill values and applying packing attributes.
fn read_unpacked(var: &netcdf::Variable) -> NetCdfResult<Vec<f32>> {
    let raw: Vec<f64> = var.get_values(..)?;

    let fill_value = get_f64_attr(var, "_FillValue");
    let missing_value = get_f64_attr(var, "missing_value");
    let scale_factor = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);

    Ok(raw
        .into_iter()
        .map(|v| {
            if Some(v) == fill_value || Some(v) == missing_value || v.is_nan() {
                f32::NAN
            } else {
                (v * scale_factor + add_offset) as f32
            }
        })
        .collect())
}
