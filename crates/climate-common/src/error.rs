//! Error types for the shared climate types.

use thiserror::Error;

/// Result type alias using ClimateError.
pub type ClimateResult<T> = Result<T, ClimateError>;

/// Errors raised while constructing or decoding shared types.
#[derive(Debug, Error)]
pub enum ClimateError {
    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),

    #[error("Coordinate '{0}' is not monotonic")]
    NonMonotonic(&'static str),

    #[error("Data length {actual} does not match shape {shape:?} (expected {expected})")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("Date {year:04}-{month:02}-{day:02} does not exist in the '{calendar}' calendar")]
    InvalidDate {
        year: i32,
        month: u32,
        day: u32,
        calendar: String,
    },

    #[error("Invalid time units: {0}")]
    InvalidTimeUnits(String),
}
