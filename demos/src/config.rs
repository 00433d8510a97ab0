//! Configuration for the dataset tools.
//!
//! Both tools read a JSON file that embeds a `PoseDatasetConfig` under the
//! `dataset` key; command-line flags override individual fields.

use std::path::PathBuf;

use posegan::PoseDatasetConfig;
use serde::{Deserialize, Serialize};

fn default_dataset() -> PoseDatasetConfig {
    PoseDatasetConfig::new(
        PathBuf::from("data/images"),
        PathBuf::from("data/pairs.csv"),
        PathBuf::from("data/annotations.csv"),
        PathBuf::from("data/poses"),
    )
}

/// Configuration for `dataset_test`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetTestConfig {
    /// Dataset to inspect.
    pub dataset: PoseDatasetConfig,
    /// Number of items to inspect individually.
    pub num_samples: usize,
    /// Number of sampler batches to draw per network.
    pub num_batches: usize,
    /// Where to write de-processed images of the first batch, if anywhere.
    pub dump_dir: Option<PathBuf>,
}

impl Default for DatasetTestConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            num_samples: 10,
            num_batches: 3,
            dump_dir: None,
        }
    }
}

/// Configuration for `precompute_poses`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecomputeConfig {
    pub dataset: PoseDatasetConfig,
    /// Recompute maps that are already cached.
    pub overwrite: bool,
}

impl Default for PrecomputeConfig {
    fn default() -> Self {
        Self {
            dataset: default_dataset(),
            overwrite: false,
        }
    }
}
