//! Common types shared across the downscaling workspace.

pub mod bbox;
pub mod error;
pub mod grid;
pub mod time;
pub mod variable;

pub use bbox::{BoundingBox, Extent, REGIONS};
pub use error::{ClimateError, ClimateResult};
pub use grid::{LatLonGrid, RasterField, TopographyGrid};
pub use time::{Calendar, CalendarDate, CalendarKind, TimeAxis, TimeUnit, TimeUnits};
pub use variable::{ClimateVariable, VariableMetadata, WriterFlavor};

/// Fill sentinel written for cells without meaningful data.
pub const FILL_VALUE: f32 = -9999.0;
