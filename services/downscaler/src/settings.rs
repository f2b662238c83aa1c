//! Run settings assembled from the command line, a YAML file and the environment.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use climate_common::{BoundingBox, REGIONS};
use downscaling::{DownscaleConfig, FillScope};
use tracing::info;

/// Region used when neither a box nor a region name is given.
pub const DEFAULT_REGION: &str = "Whole Domain";

/// Load engine settings from a YAML file, or from the environment when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<DownscaleConfig> {
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: DownscaleConfig = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            info!(path = %path.display(), "Loaded settings file");
            config
        }
        None => DownscaleConfig::from_env(),
    };
    Ok(config)
}

/// Command-line values that take precedence over loaded settings.
#[derive(Debug, Default)]
pub struct Overrides {
    pub fill_scope: Option<FillScope>,
    pub weight_cache_dir: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, mut config: DownscaleConfig) -> Result<DownscaleConfig> {
        if let Some(scope) = self.fill_scope {
            config.fill_scope = scope;
        }
        if let Some(dir) = self.weight_cache_dir {
            config.weight_cache_dir = Some(dir);
        }
        if let Err(e) = config.validate() {
            bail!("Invalid settings: {}", e);
        }
        Ok(config)
    }
}

/// Bounding box from a `lat_min,lat_max,lon_min,lon_max` string or a region name.
pub fn resolve_bbox(bbox: Option<&str>, region: Option<&str>) -> Result<BoundingBox> {
    match (bbox, region) {
        (Some(_), Some(_)) => bail!("Use either --bbox or --region, not both"),
        (Some(csv), None) => Ok(BoundingBox::from_csv(csv)?),
        (None, Some(name)) => BoundingBox::region(name).with_context(|| {
            format!(
                "Unknown region '{}'. Known regions: {}",
                name,
                region_names().join(", ")
            )
        }),
        (None, None) => {
            info!(region = DEFAULT_REGION, "No area given, using default region");
            BoundingBox::region(DEFAULT_REGION).context("default region missing")
        }
    }
}

pub fn region_names() -> Vec<&'static str> {
    REGIONS.iter().map(|(name, _)| *name).collect()
}
