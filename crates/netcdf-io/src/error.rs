//! Error types for NetCDF reading and writing.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for NetCDF operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF I/O.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reported by libnetcdf
    #[error("NetCDF library error: {0}")]
    Library(#[from] netcdf::Error),

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// No metadata mapping exists for the requested variable
    #[error("Unrecognized variable '{0}': no output metadata is defined for it")]
    UnrecognizedVariable(String),

    /// Output path could not be freed or recreated, even after a forced delete
    #[error("Could not create output file {path}: {message}")]
    FileCollision { path: PathBuf, message: String },

    /// Shared type construction failed
    #[error(transparent)]
    Climate(#[from] climate_common::ClimateError),
}
