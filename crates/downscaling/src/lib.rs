//! Elevation-aware downscaling of coarse climate fields
//!
//! Takes a daily coarse-grid field, a coarse topography and a fine
//! topography and produces the field on the fine grid, written as a CF
//! NetCDF file.
//!
//! - **Clipping**: cut the source to a bounding box and year range
//! - **Detrending**: remove a monthly elevation gradient before regridding
//! - **Regridding**: patch or bilinear weights, optionally cached on disk
//! - **Coastal fill**: nearest-neighbour fill of cells the regrid left undefined
//!
//! # Architecture
//!
//! ```text
//! DownscaleRequest
//!      │
//!      ▼
//! run(request, config)
//!      │
//!      ├─► read source, coarse and fine topography
//!      │
//!      ├─► cut_domain (area + years), fine topography to covered area
//!      │
//!      ├─► downscale_field
//!      │         ├─► detrend (temperature, radiation, wind, humidity)
//!      │         ├─► RegridBackend::build ─► apply ─► release
//!      │         ├─► coastal::fill
//!      │         ├─► retrend on fine topography
//!      │         └─► floor precipitation at zero
//!      │
//!      └─► GriddedWriter::write ─► DownscaleOutput
//! ```
//!
//! # Example
//!
//! ```ignore
//! use downscaling::{run, DataType, DownscaleConfig, DownscaleRequest};
//!
//! let request = DownscaleRequest {
//!     variable: "tasmax".to_string(),
//!     data_type: DataType::Model,
//!     source_data_path: "tasmax_EC-EARTH.nc".into(),
//!     fine_topo_path: "topo_0.01.nc".into(),
//!     coarse_topo_path: "topo_0.1.nc".into(),
//!     output_dir: "out".into(),
//!     bbox: BoundingBox::region("Montenegro").unwrap(),
//!     start_year: 2011,
//!     end_year: 2040,
//!     regrid_method: None,
//! };
//! let output = run(&request, &DownscaleConfig::from_env())?;
//! println!("wrote {}", output.path.display());
//! ```

pub mod clip;
pub mod coastal;
pub mod config;
pub mod detrend;
pub mod error;
pub mod pipeline;
pub mod regrid;

// Re-export commonly used types at crate root
pub use clip::{check_domain, cut_domain, Subsettable, YearRange};
pub use coastal::{feature_transform, fill, FillScope};
pub use config::DownscaleConfig;
pub use detrend::{detrend, linreg, retrend, LinearFit, MonthlyTrend};
pub use error::{DownscaleError, Result};
pub use pipeline::{
    downscale_field, run, run_with_backend, DataType, DownscaleOutput, DownscaleRequest,
};
pub use regrid::{
    RegridBackend, RegridMethod, RegridOperator, RegridWeights, WeightCache, WeightRegridder,
};
