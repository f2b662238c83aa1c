//! NetCDF input and output for the downscaling workspace.
//!
//! Reading covers the coarse source dataset, coarse and fine topography and
//! model attribute probing. Writing produces CF-1.6 files through
//! [`GriddedWriter`].

pub mod error;
pub mod native;
pub mod reader;
pub mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use native::silence_hdf5_errors;
pub use reader::{read_model_attributes, read_raster, read_topography, ModelAttributes};
pub use writer::{encode_time_axis, output_path, GriddedWriter, Provenance, WriteRequest};
