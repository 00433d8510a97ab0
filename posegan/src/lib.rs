//! Paired-image dataset for pose-guided person image generation.
//!
//! Reads `(from, to)` image pairs and COCO-18 keypoint annotations, turns
//! them into normalized images, pose heat-maps and per-part warps, and
//! serves them as Burn batches either through [`PosePairDataset`] or the
//! endless [`PairSampler`].

pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod preprocess;
pub mod sampler;
pub mod tables;

// Re-export commonly used types
pub use cache::PoseMapCache;
pub use config::{DiscriminatorType, PoseDatasetConfig, WarpSkip};
pub use dataset::{
    Direction, PosePairBatch, PosePairBatcher, PosePairDataset, PosePairItem, WarpBatch, WarpItem,
    TRANSFORM_PARAMS,
};
pub use error::{DatasetError, DatasetResult};
pub use preprocess::{deprocess_image, load_image, preprocess_image};
pub use sampler::PairSampler;
pub use tables::{AnnotationRecord, AnnotationTable, PairRecord, PairTable};
