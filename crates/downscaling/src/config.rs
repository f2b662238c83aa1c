//! Configuration for downscaling runs.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coastal::FillScope;
use crate::regrid::{RegridMethod, WeightRegridder};

/// Settings shared by every run, independent of the requested variable and area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownscaleConfig {
    /// Regrid method used when a request does not name one.
    pub regrid_method: RegridMethod,

    /// Search extent of the coastal nearest-neighbour fill.
    pub fill_scope: FillScope,

    /// Directory for persisted regrid weights. Weights stay in memory when unset.
    pub weight_cache_dir: Option<PathBuf>,
}

impl Default for DownscaleConfig {
    fn default() -> Self {
        Self {
            regrid_method: RegridMethod::Patch,
            fill_scope: FillScope::WholeArray,
            weight_cache_dir: None,
        }
    }
}

impl DownscaleConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values are logged and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("DOWNSCALE_REGRID_METHOD") {
            match val.parse() {
                Ok(method) => config.regrid_method = method,
                Err(e) => warn!(error = %e, "Ignoring DOWNSCALE_REGRID_METHOD"),
            }
        }

        if let Ok(val) = std::env::var("DOWNSCALE_FILL_SCOPE") {
            match val.parse() {
                Ok(scope) => config.fill_scope = scope,
                Err(e) => warn!(error = %e, "Ignoring DOWNSCALE_FILL_SCOPE"),
            }
        }

        if let Ok(val) = std::env::var("DOWNSCALE_WEIGHT_CACHE_DIR") {
            if !val.trim().is_empty() {
                config.weight_cache_dir = Some(PathBuf::from(val));
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(dir) = &self.weight_cache_dir {
            if dir.as_os_str().is_empty() {
                return Err("weight_cache_dir must not be empty".to_string());
            }
            if dir.exists() && !dir.is_dir() {
                return Err(format!(
                    "weight_cache_dir {} is not a directory",
                    dir.display()
                ));
            }
        }
        Ok(())
    }

    /// The regrid backend these settings describe.
    pub fn backend(&self) -> WeightRegridder {
        match &self.weight_cache_dir {
            Some(dir) => WeightRegridder::with_cache_dir(dir),
            None => WeightRegridder::new(),
        }
    }
}
