use thiserror::Error;

/// Errors raised while reading keypoint annotations.
#[derive(Error, Debug)]
pub enum PoseError {
    /// A keypoint coordinate list is not a JSON array of numbers.
    #[error("Malformed keypoint list: {text}")]
    MalformedCoordinates {
        /// The text that failed to parse.
        text: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The y and x lists do not both hold one entry per joint.
    #[error("Expected {expected} keypoints, got {actual_y} y and {actual_x} x coordinates")]
    WrongKeypointCount {
        expected: usize,
        actual_y: usize,
        actual_x: usize,
    },
}

/// A specialized `Result` type for pose operations.
pub type PoseResult<T> = Result<T, PoseError>;
