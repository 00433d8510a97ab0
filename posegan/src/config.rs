use std::path::PathBuf;

use burn::prelude::*;

use crate::error::{DatasetError, DatasetResult};

/// Which warp tensors accompany a generator batch.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum WarpSkip {
    /// No warps; the generator uses plain skip connections.
    None,
    /// Affine part transforms only.
    Full,
    /// Affine part transforms plus the target's part masks.
    Mask,
}

impl WarpSkip {
    pub fn is_enabled(&self) -> bool {
        *self != Self::None
    }
}

/// The discriminator variant being trained.
#[derive(Config, Debug, PartialEq, Eq)]
pub enum DiscriminatorType {
    /// Conditioned on the source image and both poses.
    Call,
    /// Conditioned on the target pose only.
    Sim,
    /// Conditioned through the warped source; receives warp tensors.
    Warp,
}

/// Dataset configuration.
///
/// `image_size` is `[height, width]`; every image on disk must already have
/// that size.
#[derive(Config, Debug)]
pub struct PoseDatasetConfig {
    /// Directory holding the images named in the pair table.
    pub images_dir: PathBuf,
    /// CSV with header `from,to`.
    pub pairs_file: PathBuf,
    /// Colon-separated table with header `name:keypoints_y:keypoints_x`.
    pub annotations_file: PathBuf,
    /// Directory for cached `<name>.npy` pose maps.
    pub pose_cache_dir: PathBuf,
    #[config(default = "4")]
    pub batch_size: usize,
    #[config(default = "[128, 64]")]
    pub image_size: [usize; 2],
    /// Include the source pose map in each batch.
    #[config(default = "true")]
    pub use_input_pose: bool,
    #[config(default = "WarpSkip::Mask")]
    pub warp_skip: WarpSkip,
    #[config(default = "DiscriminatorType::Call")]
    pub disc_type: DiscriminatorType,
    /// Reshuffle the pair order every pass over the pairs.
    #[config(default = "true")]
    pub shuffle: bool,
    #[config(default = "42")]
    pub seed: u64,
    #[config(default = "1000")]
    pub batches_per_epoch: usize,
    /// Gaussian standard deviation of the pose heat-maps, in pixels.
    #[config(default = "6.0")]
    pub sigma: f32,
}

impl PoseDatasetConfig {
    /// Validate the configuration.
    ///
    /// # Returns
    ///
    /// `Ok(())` if valid, or a `DatasetError::InvalidConfiguration` describing
    /// the first problem found.
    pub fn validate(&self) -> DatasetResult<()> {
        if self.batch_size == 0 {
            return Err(DatasetError::InvalidConfiguration {
                reason: "Batch size must be greater than 0".to_string(),
            });
        }
        if self.image_size.contains(&0) {
            return Err(DatasetError::InvalidConfiguration {
                reason: format!("Image size must be non-zero, got {:?}", self.image_size),
            });
        }
        if self.sigma.is_nan() || self.sigma <= 0.0 {
            return Err(DatasetError::InvalidConfiguration {
                reason: format!("Sigma must be positive, got {}", self.sigma),
            });
        }
        Ok(())
    }

    /// Whether a batch built for the given network carries warp tensors.
    pub fn wants_warp(&self, for_discriminator: bool) -> bool {
        self.warp_skip.is_enabled()
            && (!for_discriminator || self.disc_type == DiscriminatorType::Warp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PoseDatasetConfig {
        PoseDatasetConfig::new(
            "images".into(),
            "pairs.csv".into(),
            "annotations.csv".into(),
            "poses".into(),
        )
    }

    #[test]
    fn defaults_describe_market_sized_images() {
        let config = config();

        assert_eq!(config.batch_size, 4);
        assert_eq!(config.image_size, [128, 64]);
        assert_eq!(config.warp_skip, WarpSkip::Mask);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = config().with_batch_size(0);

        match config.validate() {
            Err(DatasetError::InvalidConfiguration { reason }) => {
                assert!(reason.contains("Batch size"));
            }
            other => panic!("Expected InvalidConfiguration error, got {other:?}"),
        }
    }

    #[test]
    fn zero_image_dimension_is_rejected() {
        let config = config().with_image_size([0, 64]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn discriminator_gets_warps_only_when_warp_conditioned() {
        let config = config();
        assert!(config.wants_warp(false));
        assert!(!config.wants_warp(true));

        let config = config.with_disc_type(DiscriminatorType::Warp);
        assert!(config.wants_warp(true));

        let config = config.with_warp_skip(WarpSkip::None);
        assert!(!config.wants_warp(false));
        assert!(!config.wants_warp(true));
    }

    #[test]
    fn round_trips_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        let config = config().with_warp_skip(WarpSkip::Full).with_seed(7);

        config.save(&path).unwrap();
        let loaded = PoseDatasetConfig::load(&path).unwrap();

        assert_eq!(loaded.warp_skip, WarpSkip::Full);
        assert_eq!(loaded.seed, 7);
        assert_eq!(loaded.images_dir, PathBuf::from("images"));
    }
}
