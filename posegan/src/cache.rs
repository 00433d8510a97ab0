//! On-disk cache of pose heat-maps.
//!
//! Rasterizing 18 Gaussians per image is the most expensive step of building
//! a batch, so each map is written once as `<name>.npy` and reused.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use ndarray::Array3;
use ndarray_npy::{read_npy, write_npy};
use pose_ops::NUM_JOINTS;

use crate::error::{DatasetError, DatasetResult};

/// Directory of cached `[H, W, 18]` pose maps keyed by image id.
#[derive(Debug, Clone)]
pub struct PoseMapCache {
    dir: PathBuf,
}

impl PoseMapCache {
    /// Open the cache, creating its directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> DatasetResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| DatasetError::DirectoryCreateFailed {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.npy"))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// Read the cached map of `name`, if any.
    pub fn load(&self, name: &str) -> DatasetResult<Option<Array3<f32>>> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Ok(None);
        }
        let pose = read_npy(&path).map_err(|source| DatasetError::CacheReadFailed {
            path: path.clone(),
            source,
        })?;
        Ok(Some(pose))
    }

    /// Write the map of `name`.
    ///
    /// The array goes to a sibling `.tmp` file first and is renamed into
    /// place, so a cache file is never left half-written.
    pub fn store(&self, name: &str, pose: &Array3<f32>) -> DatasetResult<()> {
        let path = self.path_for(name);
        let partial = path.with_extension("npy.tmp");

        if let Err(source) = write_npy(&partial, pose) {
            let _ = fs::remove_file(&partial);
            return Err(DatasetError::CacheWriteFailed { path, source });
        }
        fs::rename(&partial, &path).map_err(|source| {
            let _ = fs::remove_file(&partial);
            DatasetError::CachePublishFailed {
                path: path.clone(),
                source,
            }
        })?;

        debug!("Cached pose map {}", path.display());
        Ok(())
    }

    /// Return the cached map of `name`, computing and storing it on a miss.
    ///
    /// A cached map that cannot be read, or whose shape is not `[H, W, 18]`
    /// for `image_size`, is stale and gets replaced.
    pub fn get_or_compute<F>(
        &self,
        name: &str,
        image_size: [usize; 2],
        compute: F,
    ) -> DatasetResult<Array3<f32>>
    where
        F: FnOnce() -> DatasetResult<Array3<f32>>,
    {
        let [height, width] = image_size;
        let expected = (height, width, NUM_JOINTS);

        match self.load(name) {
            Ok(Some(pose)) if pose.dim() == expected => return Ok(pose),
            Ok(Some(pose)) => warn!(
                "Cached pose map for {name} has shape {:?}, expected {expected:?}; recomputing",
                pose.dim()
            ),
            Ok(None) => {}
            Err(e) => warn!("{e}; recomputing"),
        }

        let pose = compute()?;
        self.store(name, &pose)?;
        Ok(pose)
    }
}
