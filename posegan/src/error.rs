//! Error types for the pose dataset.
//!
//! Every variant that touches the filesystem carries the offending path so a
//! failed batch can be traced back to the file that broke it.

use std::path::PathBuf;

use pose_ops::PoseError;
use thiserror::Error;

/// Error type for loading pose pairs and assembling batches.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// Error when the configuration is logically inconsistent.
    #[error("Invalid dataset configuration: {reason}")]
    InvalidConfiguration {
        /// Why the configuration was rejected.
        reason: String,
    },

    /// Error when a pair or annotation table cannot be read or parsed.
    #[error("Failed to read table: {path}")]
    TableReadFailed {
        /// The table file.
        path: PathBuf,
        /// The underlying CSV error.
        #[source]
        source: csv::Error,
    },

    /// Error when the pose cache directory cannot be created.
    #[error("Failed to create directory: {path}")]
    DirectoryCreateFailed {
        /// The directory path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Error when a pair references an image with no annotation row.
    #[error("No keypoint annotation for image: {name}")]
    UnknownImage {
        /// The image id.
        name: String,
    },

    /// Error when an annotation row holds unusable keypoints.
    #[error("Invalid keypoints for image: {name}")]
    InvalidKeypoints {
        /// The image id.
        name: String,
        /// The underlying parse error.
        #[source]
        source: PoseError,
    },

    /// Error when opening or decoding an image file fails.
    #[error("Failed to open image: {path}")]
    ImageOpenFailed {
        /// The image file path.
        path: PathBuf,
        /// The underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Error when an image does not have the configured size.
    #[error("Image {path} is {actual:?} (height, width), expected {expected:?}")]
    ImageSizeMismatch {
        path: PathBuf,
        expected: [usize; 2],
        actual: [usize; 2],
    },

    /// Error when a cached pose map cannot be read.
    #[error("Failed to read cached pose map: {path}")]
    CacheReadFailed {
        /// The cache file path.
        path: PathBuf,
        /// The underlying npy error.
        #[source]
        source: ndarray_npy::ReadNpyError,
    },

    /// Error when a pose map cannot be written to the cache.
    #[error("Failed to write cached pose map: {path}")]
    CacheWriteFailed {
        /// The cache file path.
        path: PathBuf,
        /// The underlying npy error.
        #[source]
        source: ndarray_npy::WriteNpyError,
    },

    /// Error when a written pose map cannot be moved into place.
    #[error("Failed to publish cached pose map: {path}")]
    CachePublishFailed {
        /// The cache file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Error when a pair index is past the end of the pair table.
    #[error("Pair index {index} out of range for {len} pairs")]
    IndexOutOfRange { index: usize, len: usize },

    /// Error when a batch is requested for no pairs.
    #[error("Cannot build a batch from an empty index list")]
    EmptyBatch,

    /// Error when the pair table cannot fill a single batch.
    #[error("{pairs} pairs cannot fill a batch of {batch_size}")]
    NotEnoughPairs { pairs: usize, batch_size: usize },

    /// Error when a tensor has an unexpected shape.
    #[error("Invalid tensor shape: expected {expected}, got {actual}")]
    InvalidTensorShape {
        /// The expected tensor shape.
        expected: String,
        /// The actual tensor shape.
        actual: String,
    },
}

/// A specialized `Result` type for dataset operations.
pub type DatasetResult<T> = Result<T, DatasetError>;
