//! Writers for small synthetic NetCDF inputs.
//!
//! The files mimic the layout of real source data: `lat`/`lon`
//! coordinate variables, a `time` variable with `units` and `calendar`,
//! data laid out `(time, lat, lon)` and topography stored as `height`.

use std::path::Path;

use climate_common::{RasterField, TopographyGrid};

/// Fill value used in generated input files.
pub const INPUT_FILL_VALUE: f32 = 1.0e20;

fn add_coordinates(file: &mut netcdf::FileMut, lat: &[f64], lon: &[f64]) -> Result<(), netcdf::Error> {
    file.add_dimension("lat", lat.len())?;
    file.add_dimension("lon", lon.len())?;

    let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
    lat_var.put_attribute("units", "degrees_north")?;
    lat_var.put_values(lat, ..)?;

    let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
    lon_var.put_attribute("units", "degrees_east")?;
    lon_var.put_values(lon, ..)?;
    Ok(())
}

/// Writes `field` as `variable`, NaN stored as the input fill value.
///
/// When `model_name` is given a `modelname` global attribute is added.
pub fn write_raster_nc(
    path: &Path,
    field: &RasterField,
    variable: &str,
    model_name: Option<&str>,
) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;
    add_coordinates(&mut file, field.grid.lat(), field.grid.lon())?;

    let n_time = field.n_time();
    file.add_unlimited_dimension("time")?;
    {
        let mut time = file.add_variable::<f64>("time", &["time"])?;
        time.put_attribute("units", field.time.units.to_string().as_str())?;
        time.put_attribute("calendar", field.time.calendar.name())?;
        time.put_values(&field.time.values, [0..n_time])?;
    }

    {
        let data: Vec<f32> = field
            .data
            .iter()
            .map(|&v| if v.is_nan() { INPUT_FILL_VALUE } else { v })
            .collect();
        let mut var = file.add_variable::<f32>(variable, &["time", "lat", "lon"])?;
        var.set_fill_value(INPUT_FILL_VALUE)?;
        var.put_values(&data, (0..n_time, .., ..))?;
    }

    if let Some(name) = model_name {
        file.add_attribute("modelname", name)?;
    }
    Ok(())
}

/// Writes a topography file with a `height` variable on `(lat, lon)`.
pub fn write_topography_nc(path: &Path, topo: &TopographyGrid) -> Result<(), netcdf::Error> {
    let mut file = netcdf::create(path)?;
    add_coordinates(&mut file, topo.grid.lat(), topo.grid.lon())?;

    let height: Vec<f32> = topo
        .height
        .iter()
        .map(|&v| if v.is_nan() { INPUT_FILL_VALUE } else { v })
        .collect();
    let mut var = file.add_variable::<f32>("height", &["lat", "lon"])?;
    var.set_fill_value(INPUT_FILL_VALUE)?;
    var.put_attribute("units", "m")?;
    var.put_values(&height, ..)?;
    Ok(())
}
