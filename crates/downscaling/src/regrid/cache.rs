//! On-disk JSON store for regrid weights.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use climate_common::LatLonGrid;

use super::{RegridMethod, RegridWeights};
use crate::error::Result;

/// Directory holding one weight file per method and grid pair.
#[derive(Debug, Clone)]
pub struct WeightCache {
    dir: PathBuf,
}

impl WeightCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name encoding method, shapes and a fingerprint of the coordinates.
    pub fn path_for(&self, src: &LatLonGrid, dst: &LatLonGrid, method: RegridMethod) -> PathBuf {
        let (sn, sm) = src.shape();
        let (dn, dm) = dst.shape();
        self.dir.join(format!(
            "{}_{}x{}_{}x{}_{:016x}.json",
            method,
            sn,
            sm,
            dn,
            dm,
            fingerprint(src, dst)
        ))
    }

    /// Load weights for this grid pair, if a matching file exists.
    ///
    /// Unreadable or mismatched files are ignored and rebuilt.
    pub fn load(
        &self,
        src: &LatLonGrid,
        dst: &LatLonGrid,
        method: RegridMethod,
    ) -> Result<Option<RegridWeights>> {
        let path = self.path_for(src, dst, method);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = std::fs::read(&path)?;
        match serde_json::from_slice::<RegridWeights>(&bytes) {
            Ok(w) if w.method == method && w.src_shape == src.shape() && w.dst_shape == dst.shape() => {
                debug!(path = %path.display(), "Loaded regrid weights");
                Ok(Some(w))
            }
            Ok(_) => {
                warn!(path = %path.display(), "Weight file does not match grids, rebuilding");
                Ok(None)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable weight file, rebuilding");
                Ok(None)
            }
        }
    }

    /// Write weights and return the file path.
    pub fn store(&self, src: &LatLonGrid, dst: &LatLonGrid, weights: &RegridWeights) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(src, dst, weights.method);
        let json = serde_json::to_vec(weights)?;
        std::fs::write(&path, json)?;
        debug!(path = %path.display(), "Stored regrid weights");
        Ok(path)
    }
}

fn fingerprint(src: &LatLonGrid, dst: &LatLonGrid) -> u64 {
    let mut hasher = DefaultHasher::new();
    for axis in [src.lat(), src.lon(), dst.lat(), dst.lon()] {
        axis.len().hash(&mut hasher);
        for v in axis {
            v.to_bits().hash(&mut hasher);
        }
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regrid::bilinear_weights;

    fn grids() -> (LatLonGrid, LatLonGrid) {
        (
            LatLonGrid::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap(),
            LatLonGrid::new(vec![0.0, 0.5, 1.0], vec![0.0, 0.5, 1.0]).unwrap(),
        )
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WeightCache::new(dir.path().join("weights"));
        let (src, dst) = grids();

        assert!(cache.load(&src, &dst, RegridMethod::Bilinear).unwrap().is_none());

        let weights = bilinear_weights(&src, &dst);
        let path = cache.store(&src, &dst, &weights).unwrap();
        assert!(path.starts_with(cache.dir()));

        let loaded = cache.load(&src, &dst, RegridMethod::Bilinear).unwrap();
        assert_eq!(loaded, Some(weights));
        assert!(cache.load(&src, &dst, RegridMethod::Patch).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = WeightCache::new(dir.path());
        let (src, dst) = grids();
        std::fs::write(cache.path_for(&src, &dst, RegridMethod::Patch), b"{not json").unwrap();

        assert!(cache.load(&src, &dst, RegridMethod::Patch).unwrap().is_none());
    }

    #[test]
    fn test_path_depends_on_coordinates() {
        let cache = WeightCache::new("/tmp/w");
        let (src, dst) = grids();
        let shifted = LatLonGrid::new(vec![0.1, 0.6, 1.1], vec![0.0, 0.5, 1.0]).unwrap();
        assert_ne!(
            cache.path_for(&src, &dst, RegridMethod::Patch),
            cache.path_for(&src, &shifted, RegridMethod::Patch)
        );
    }
}
