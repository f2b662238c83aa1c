//! End-to-end downscaling of one variable.
//!
//! ```text
//! source data ─┐
//! coarse topo ─┼─ cut ─ detrend ─ regrid ─ fill ─ retrend ─ clip ─ write
//! fine topo ───┘
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use climate_common::{
    BoundingBox, ClimateError, ClimateVariable, RasterField, TopographyGrid, WriterFlavor,
};
use netcdf_io::{
    read_model_attributes, read_raster, read_topography, GriddedWriter, Provenance, WriteRequest,
};

use crate::clip::{cut_domain, YearRange};
use crate::coastal::{self, FillScope};
use crate::config::DownscaleConfig;
use crate::detrend::{detrend, retrend};
use crate::error::{DownscaleError, Result};
use crate::regrid::{RegridBackend, RegridMethod};

/// Whether the source dataset is model output or gridded observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Model,
    #[default]
    #[serde(alias = "obs")]
    Observation,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Observation => "obs",
        }
    }

    pub fn flavor(&self) -> WriterFlavor {
        match self {
            Self::Model => WriterFlavor::Model,
            Self::Observation => WriterFlavor::Observation,
        }
    }
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "model" => Ok(Self::Model),
            "obs" | "observation" | "observations" => Ok(Self::Observation),
            other => Err(format!(
                "unknown data type '{}', expected 'model' or 'obs'",
                other
            )),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One downscaling job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownscaleRequest {
    /// Variable name as stored in the source file (e.g. `tasmax`, `rr`).
    pub variable: String,
    pub data_type: DataType,
    pub source_data_path: PathBuf,
    pub fine_topo_path: PathBuf,
    pub coarse_topo_path: PathBuf,
    pub output_dir: PathBuf,
    pub bbox: BoundingBox,
    /// First year to keep; 0 keeps every time step.
    pub start_year: i32,
    /// Last year to keep; 0 keeps every time step.
    pub end_year: i32,
    /// Overrides the configured regrid method.
    pub regrid_method: Option<RegridMethod>,
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct DownscaleOutput {
    /// Path of the written NetCDF file.
    pub path: PathBuf,
    /// Source data cut to the requested area and years, before any correction.
    pub coarse_subset: RasterField,
}

/// Run a request with the backend described by `config`.
pub fn run(request: &DownscaleRequest, config: &DownscaleConfig) -> Result<DownscaleOutput> {
    let backend = config.backend();
    run_with_backend(request, config, &backend)
}

/// Run a request with an explicit regrid backend.
pub fn run_with_backend<B: RegridBackend + ?Sized>(
    request: &DownscaleRequest,
    config: &DownscaleConfig,
    backend: &B,
) -> Result<DownscaleOutput> {
    config.validate().map_err(DownscaleError::Config)?;

    let variable = ClimateVariable::from_name(&request.variable, request.data_type.flavor())
        .ok_or_else(|| DownscaleError::UnrecognizedVariable(request.variable.clone()))?;
    let method = request.regrid_method.unwrap_or(config.regrid_method);

    info!(
        variable = %request.variable,
        data_type = %request.data_type,
        bbox = %request.bbox,
        start_year = request.start_year,
        end_year = request.end_year,
        method = %method,
        "Starting downscaling run"
    );

    let source = read_raster(&request.source_data_path, &request.variable)?;
    let fine_topo = read_topography(&request.fine_topo_path)?;
    let coarse_topo = read_topography(&request.coarse_topo_path)?;

    let years = YearRange::new(request.start_year, request.end_year);
    let coarse = cut_domain(&source, &request.bbox, years)?;
    drop(source);
    let coarse_topo = cut_domain(&coarse_topo, &request.bbox, YearRange::ALL)?;

    let fine_bbox = covering_bbox(&coarse)?;
    let fine_topo = cut_domain(&fine_topo, &fine_bbox, YearRange::ALL)?;

    let fine = downscale_field(
        &coarse,
        &coarse_topo,
        &fine_topo,
        variable,
        method,
        config.fill_scope,
        backend,
    )?;

    let (start_year, end_year) = output_years(&coarse, years);
    let provenance = Provenance::for_resolutions(coarse.grid.resolution().0, fine.grid.resolution().0);

    let (writer, filename) = match request.data_type {
        DataType::Model => {
            let attrs = read_model_attributes(&request.source_data_path)?;
            let filename = format!("{}_downscaled_{}", request.variable, attrs.model_name);
            (GriddedWriter::model(attrs.model_name, attrs.calendar), filename)
        }
        DataType::Observation => (
            GriddedWriter::observation(),
            format!("{}_observations", request.variable),
        ),
    };

    let grid = fine.grid.clone();
    let path = writer.with_provenance(provenance).write(
        fine.data,
        &WriteRequest {
            variable: &request.variable,
            grid: &grid,
            start_year,
            end_year,
            destination: &request.output_dir,
            filename: &filename,
        },
    )?;

    info!(path = %path.display(), "Downscaling run complete");

    Ok(DownscaleOutput {
        path,
        coarse_subset: coarse,
    })
}

/// Detrend, regrid, fill, retrend and clip one coarse field onto the fine topography.
///
/// `coarse_topo` must share the grid of `coarse`. The regrid operator is
/// released before returning, whether or not it succeeded.
pub fn downscale_field<B: RegridBackend + ?Sized>(
    coarse: &RasterField,
    coarse_topo: &TopographyGrid,
    fine_topo: &TopographyGrid,
    variable: ClimateVariable,
    method: RegridMethod,
    scope: FillScope,
    backend: &B,
) -> Result<RasterField> {
    if coarse_topo.grid.shape() != coarse.grid.shape() {
        let (n_lat, n_lon) = coarse.grid.shape();
        return Err(ClimateError::ShapeMismatch {
            shape: vec![n_lat, n_lon],
            expected: n_lat * n_lon,
            actual: coarse_topo.height.len(),
        }
        .into());
    }

    let mut work = coarse.clone();

    let trend = if variable.is_elevation_dependent() {
        let trend = detrend(&mut work, coarse_topo)?;
        debug!(variable = %variable, "Removed elevation trend");
        Some(trend)
    } else {
        None
    };

    let mut operator = backend.build(&work.grid, &fine_topo.grid, method)?;
    let applied = operator.apply(&work);
    operator.release()?;
    let regridded = applied?;
    drop(work);

    info!(
        shape = ?regridded.shape(),
        method = %method,
        "Regridded field"
    );

    let mut fine = coastal::fill(regridded, &fine_topo.land_mask(), scope)?;

    if let Some(trend) = &trend {
        retrend(&mut fine, trend, fine_topo)?;
        debug!(variable = %variable, "Re-added elevation trend on fine topography");
    }

    if variable.is_non_negative_flux() {
        let mut clipped = 0usize;
        for v in fine.data.iter_mut().filter(|v| **v < 0.0) {
            *v = 0.0;
            clipped += 1;
        }
        debug!(clipped, "Clipped negative values to zero");
    }

    Ok(fine)
}

/// The box spanned by a field's coordinates.
fn covering_bbox(field: &RasterField) -> Result<BoundingBox> {
    let (n_lat, n_lon) = field.grid.shape();
    if n_lat < 2 || n_lon < 2 {
        return Err(DownscaleError::empty_selection(format!(
            "area covers {}x{} source cells, at least 2x2 are needed",
            n_lat, n_lon
        )));
    }
    let extent = field
        .grid
        .extent()
        .ok_or_else(|| DownscaleError::empty_selection("source grid has no cells"))?;
    Ok(BoundingBox::new(
        extent.lat_min,
        extent.lat_max,
        extent.lon_min,
        extent.lon_max,
    )?)
}

/// Years for the output filename; taken from the data when no range was requested.
fn output_years(field: &RasterField, years: YearRange) -> (i32, i32) {
    if !years.is_unbounded() {
        return (years.start, years.end);
    }
    let dates = field.time.dates();
    match (dates.first(), dates.last()) {
        (Some(first), Some(last)) => (first.year, last.year),
        _ => (years.start, years.end),
    }
}
