//! Physical quantities handled by the downscaling tool and their CF metadata.

use serde::{Deserialize, Serialize};

/// Which naming convention a variable name is resolved under.
///
/// Observation datasets use short aliases (`rr`, `tmax`, `tmin`) that model
/// output never carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterFlavor {
    Model,
    Observation,
}

/// A supported physical quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClimateVariable {
    Precipitation,
    MaxTemperature,
    MinTemperature,
    ShortwaveRadiation,
    WindSpeed,
    RelativeHumidity,
}

/// CF attributes written for a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableMetadata {
    pub units: &'static str,
    pub standard_name: &'static str,
    pub long_name: &'static str,
    /// Global `title` of the output file.
    pub title: &'static str,
}

impl ClimateVariable {
    pub const ALL: [ClimateVariable; 6] = [
        Self::Precipitation,
        Self::MaxTemperature,
        Self::MinTemperature,
        Self::ShortwaveRadiation,
        Self::WindSpeed,
        Self::RelativeHumidity,
    ];

    /// Resolve a variable name; aliases are only accepted for observations.
    pub fn from_name(name: &str, flavor: WriterFlavor) -> Option<Self> {
        let canonical = match name {
            "pr" => Some(Self::Precipitation),
            "tasmax" => Some(Self::MaxTemperature),
            "tasmin" => Some(Self::MinTemperature),
            "rsds" => Some(Self::ShortwaveRadiation),
            "sfcWind" => Some(Self::WindSpeed),
            "hurs" => Some(Self::RelativeHumidity),
            _ => None,
        };
        if canonical.is_some() || flavor == WriterFlavor::Model {
            return canonical;
        }
        match name {
            "rr" => Some(Self::Precipitation),
            "tmax" => Some(Self::MaxTemperature),
            "tmin" => Some(Self::MinTemperature),
            _ => None,
        }
    }

    /// CMIP-style short name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Precipitation => "pr",
            Self::MaxTemperature => "tasmax",
            Self::MinTemperature => "tasmin",
            Self::ShortwaveRadiation => "rsds",
            Self::WindSpeed => "sfcWind",
            Self::RelativeHumidity => "hurs",
        }
    }

    /// Quantities with a systematic sub-grid dependence on elevation.
    pub fn is_elevation_dependent(&self) -> bool {
        !matches!(self, Self::Precipitation)
    }

    /// Quantities that cannot be negative and are floored at zero after regridding.
    pub fn is_non_negative_flux(&self) -> bool {
        matches!(self, Self::Precipitation)
    }

    pub fn metadata(&self) -> VariableMetadata {
        match self {
            Self::Precipitation => VariableMetadata {
                units: "mm",
                standard_name: "precipitation_amount",
                long_name: "total daily precipitation",
                title: "daily precipitation amount",
            },
            Self::MaxTemperature => VariableMetadata {
                units: "degree_Celsius",
                standard_name: "air_temperature",
                long_name: "daily maximum near-surface air temperature",
                title: "daily maximum temperature",
            },
            Self::MinTemperature => VariableMetadata {
                units: "degree_Celsius",
                standard_name: "air_temperature",
                long_name: "daily minimum near-surface air temperature",
                title: "daily minimum temperature",
            },
            Self::ShortwaveRadiation => VariableMetadata {
                units: "W m-2",
                standard_name: "surface_downwelling_shortwave_flux_in_air",
                long_name: "surface downwelling shortwave flux",
                title: "daily mean global radiation",
            },
            Self::WindSpeed => VariableMetadata {
                units: "m s-1",
                standard_name: "wind_speed",
                long_name: "daily mean 10-m wind speed",
                title: "daily mean 10-m wind speed",
            },
            Self::RelativeHumidity => VariableMetadata {
                units: "percent",
                standard_name: "relative_humidity",
                long_name: "daily mean relative humidity",
                title: "daily mean relative humidity",
            },
        }
    }
}

impl std::fmt::Display for ClimateVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
