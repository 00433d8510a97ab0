//! Pose operations for pose-guided person image generation
//!
//! This crate provides the numeric building blocks a pose-conditioned GAN
//! dataset needs: parsing COCO-18 keypoint annotations, rasterizing them into
//! Gaussian heat-maps, and estimating the per-body-part affine warps and masks
//! used by deformable skip connections.

mod affine;
mod error;
mod heatmap;
mod keypoints;
mod masks;

// Convenient re-exports
pub use affine::{
    affine_transforms, estimate_polygon, AffineTransform, PartTransforms, LIMBS, NUM_PARTS,
};
pub use error::{PoseError, PoseResult};
pub use heatmap::{cords_to_map, map_to_cords, DEFAULT_SIGMA, DEFAULT_THRESHOLD};
pub use keypoints::{Joint, Keypoint, PoseKeypoints, MISSING_VALUE, NUM_JOINTS};
pub use masks::pose_masks;
