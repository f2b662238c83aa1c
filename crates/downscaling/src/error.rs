//! Error types for downscaling.

use std::path::PathBuf;

use thiserror::Error;

use climate_common::{BoundingBox, ClimateError, Extent};
use netcdf_io::NetCdfError;

/// Errors that can occur during a downscaling run.
#[derive(Error, Debug)]
pub enum DownscaleError {
    /// The requested bounding box is not covered by the data.
    #[error("requested domain {requested} is outside data extent {extent}")]
    DomainOutOfBounds {
        requested: BoundingBox,
        extent: Extent,
    },

    /// A subset selected no grid cells or no time steps.
    #[error("empty selection: {0}")]
    EmptySelection(String),

    /// No metadata or processing rule exists for the variable.
    #[error("unrecognized variable '{0}'")]
    UnrecognizedVariable(String),

    /// The output file could not be created, even after a forced delete.
    #[error("could not create output file {path}: {message}")]
    FileCollision { path: PathBuf, message: String },

    /// Building or applying the regrid operator failed.
    #[error("interpolation error: {0}")]
    Interpolation(String),

    /// Weight cache could not be read or written.
    #[error("weight cache error: {0}")]
    WeightCache(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading or writing NetCDF failed.
    #[error(transparent)]
    NetCdf(NetCdfError),

    /// Inconsistent grids, shapes or dates.
    #[error(transparent)]
    Climate(#[from] ClimateError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownscaleError {
    /// Create an Interpolation error.
    pub fn interpolation(msg: impl Into<String>) -> Self {
        Self::Interpolation(msg.into())
    }

    /// Create an EmptySelection error.
    pub fn empty_selection(msg: impl Into<String>) -> Self {
        Self::EmptySelection(msg.into())
    }

    /// A message for the person running the tool, saying what to change.
    pub fn user_message(&self) -> String {
        match self {
            Self::DomainOutOfBounds { requested, extent } => format!(
                "The chosen area {} lies outside the data, which covers {}. \
                 Choose lat/lon values inside that range.",
                requested, extent
            ),
            Self::EmptySelection(what) => format!(
                "Nothing to downscale: {}. Widen the area or check the start and end years.",
                what
            ),
            Self::UnrecognizedVariable(name) => format!(
                "'{}' is not a supported variable. Use one of pr, tasmax, tasmin, rsds, sfcWind, hurs \
                 (observations also accept rr, tmax, tmin).",
                name
            ),
            Self::FileCollision { path, .. } => format!(
                "The output file {} could not be replaced. Close any program using it or choose \
                 another output folder.",
                path.display()
            ),
            Self::Interpolation(msg) => format!(
                "Regridding failed ({}). Try the other regridding method.",
                msg
            ),
            Self::WeightCache(msg) => format!(
                "The regridding weight cache could not be used ({}). Clear the cache directory \
                 or run without one.",
                msg
            ),
            Self::Config(msg) => format!("Invalid configuration: {}.", msg),
            Self::NetCdf(e) => format!(
                "An input or output file could not be processed ({}). Check that the paths point \
                 to the right NetCDF files.",
                e
            ),
            Self::Climate(e) => format!(
                "The input files do not fit together ({}). Check that the topography matches \
                 the source data grid.",
                e
            ),
            Self::Io(e) => format!("A file system operation failed ({}).", e),
        }
    }
}

impl From<NetCdfError> for DownscaleError {
    fn from(err: NetCdfError) -> Self {
        match err {
            NetCdfError::UnrecognizedVariable(name) => Self::UnrecognizedVariable(name),
            NetCdfError::FileCollision { path, message } => Self::FileCollision { path, message },
            NetCdfError::Climate(e) => Self::Climate(e),
            other => Self::NetCdf(other),
        }
    }
}

impl From<serde_json::Error> for DownscaleError {
    fn from(err: serde_json::Error) -> Self {
        Self::WeightCache(err.to_string())
    }
}

/// Result type for downscaling operations.
pub type Result<T> = std::result::Result<T, DownscaleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netcdf_errors_are_lifted() {
        let err: DownscaleError = NetCdfError::UnrecognizedVariable("snow".into()).into();
        assert!(matches!(err, DownscaleError::UnrecognizedVariable(ref v) if v == "snow"));

        let err: DownscaleError = NetCdfError::MissingData("lat variable".into()).into();
        assert!(matches!(err, DownscaleError::NetCdf(_)));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let bbox = BoundingBox::new(30.0, 40.0, 10.0, 20.0).unwrap();
        let extent = Extent {
            lat_min: 35.0,
            lat_max: 45.0,
            lon_min: 10.0,
            lon_max: 20.0,
        };
        let messages = [
            DownscaleError::DomainOutOfBounds { requested: bbox, extent }.user_message(),
            DownscaleError::UnrecognizedVariable("snow".into()).user_message(),
            DownscaleError::interpolation("singular patch").user_message(),
            DownscaleError::empty_selection("no time steps").user_message(),
        ];
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(messages[1].contains("snow"));
    }
}
