//! Dataset implementation for pose-guided GAN training.
//!
//! Each pair `(from, to)` becomes one sample: the source image, optionally its
//! pose heat-map, the target image, the target heat-map and, when warping is
//! enabled, the affine part transforms (and optionally part masks) that move
//! source features into the target pose.
//!
//! Following Burn's convention the dataset returns raw HWC buffers and the
//! batcher handles tensor creation and device placement.

use std::marker::PhantomData;

use burn::{
    data::{dataloader::batcher::Batcher, dataset::Dataset},
    tensor::{backend::Backend, Tensor, TensorData},
};
use log::{debug, info, warn};
use ndarray::Array3;
use pose_ops::{affine_transforms, cords_to_map, pose_masks, NUM_JOINTS, NUM_PARTS};

use crate::{
    cache::PoseMapCache,
    config::{PoseDatasetConfig, WarpSkip},
    error::{DatasetError, DatasetResult},
    preprocess::{load_image, preprocess_image},
    tables::{AnnotationTable, PairRecord, PairTable},
};

/// Values per part transform: a 3x3 affine matrix without its constant entry.
pub const TRANSFORM_PARAMS: usize = 8;

/// Which side of a pair to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    From,
    To,
}

impl Direction {
    pub fn select(self, pair: &PairRecord) -> &str {
        match self {
            Self::From => &pair.from,
            Self::To => &pair.to,
        }
    }
}

/// Warp data for one pair.
#[derive(Debug, Clone)]
pub struct WarpItem {
    /// `[10, 8]` part transforms, row-major.
    pub transforms: Vec<f32>,
    /// `[10, H, W]` target part masks, present when warping with masks.
    pub masks: Option<Vec<f32>>,
}

/// A single preprocessed training pair.
///
/// Images are `[H, W, 3]` in `[-1, 1]`, pose maps `[H, W, 18]`.
#[derive(Debug, Clone)]
pub struct PosePairItem {
    pub from_image: Vec<f32>,
    pub from_pose: Option<Vec<f32>>,
    pub to_image: Vec<f32>,
    pub to_pose: Vec<f32>,
    pub warp: Option<WarpItem>,
    pub height: usize,
    pub width: usize,
}

/// Batched warp tensors.
#[derive(Debug, Clone)]
pub struct WarpBatch<B: Backend> {
    /// `[B, 10, 8]`
    pub transforms: Tensor<B, 3>,
    /// `[B, 10, H, W]`
    pub masks: Option<Tensor<B, 4>>,
}

/// A batch of training pairs in channel-first layout.
#[derive(Debug, Clone)]
pub struct PosePairBatch<B: Backend> {
    /// `[B, 3, H, W]`
    pub from_images: Tensor<B, 4>,
    /// `[B, 18, H, W]`
    pub from_poses: Option<Tensor<B, 4>>,
    /// `[B, 3, H, W]`
    pub to_images: Tensor<B, 4>,
    /// `[B, 18, H, W]`
    pub to_poses: Tensor<B, 4>,
    pub warp: Option<WarpBatch<B>>,
}

impl<B: Backend> PosePairBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.from_images.dims()[0]
    }

    /// Number of tensors a consumer receives, in the order source image,
    /// source pose, target image, target pose, transforms, masks.
    pub fn tensor_count(&self) -> usize {
        let warp = self
            .warp
            .as_ref()
            .map_or(0, |warp| 1 + usize::from(warp.masks.is_some()));
        3 + usize::from(self.from_poses.is_some()) + warp
    }
}

/// Stack `[H, W, C]` buffers into a `[B, C, H, W]` tensor.
fn stack_channels_last<B: Backend>(
    buffers: Vec<Vec<f32>>,
    shape: [usize; 3],
    device: &B::Device,
) -> Tensor<B, 4> {
    let tensors = buffers
        .into_iter()
        .map(|buffer| Tensor::<B, 3>::from_data(TensorData::new(buffer, shape), device).permute([2, 0, 1]))
        .collect();
    Tensor::stack(tensors, 0)
}

/// Stack buffers that are already in their final per-item layout.
fn stack_as_is<B: Backend, const D: usize, const D2: usize>(
    buffers: Vec<Vec<f32>>,
    shape: [usize; D],
    device: &B::Device,
) -> Tensor<B, D2> {
    let tensors = buffers
        .into_iter()
        .map(|buffer| Tensor::<B, D>::from_data(TensorData::new(buffer, shape), device))
        .collect();
    Tensor::stack(tensors, 0)
}

fn stack_warps<B: Backend>(
    warps: Vec<WarpItem>,
    image_size: [usize; 2],
    device: &B::Device,
) -> WarpBatch<B> {
    let [height, width] = image_size;
    let (transforms, masks): (Vec<_>, Vec<_>) = warps
        .into_iter()
        .map(|warp| (warp.transforms, warp.masks))
        .unzip();

    let transforms = stack_as_is::<B, 2, 3>(transforms, [NUM_PARTS, TRANSFORM_PARAMS], device);
    let masks = masks
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .map(|masks| stack_as_is::<B, 3, 4>(masks, [NUM_PARTS, height, width], device));

    WarpBatch { transforms, masks }
}

/// Batcher converting [`PosePairItem`]s into a [`PosePairBatch`].
///
/// Optional parts are kept only if every item in the batch has them.
/// `items` must not be empty; the dataset's batch builders reject empty
/// index lists before reaching the batcher.
#[derive(Clone, Default)]
pub struct PosePairBatcher<B: Backend> {
    _phantom: PhantomData<B>,
}

impl<B: Backend> PosePairBatcher<B> {
    pub const fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<B: Backend> Batcher<B, PosePairItem, PosePairBatch<B>> for PosePairBatcher<B> {
    fn batch(&self, items: Vec<PosePairItem>, device: &B::Device) -> PosePairBatch<B> {
        let batch_size = items.len();
        let (height, width) = items
            .first()
            .map_or((0, 0), |item| (item.height, item.width));

        let mut from_images = Vec::with_capacity(batch_size);
        let mut from_poses = Vec::with_capacity(batch_size);
        let mut to_images = Vec::with_capacity(batch_size);
        let mut to_poses = Vec::with_capacity(batch_size);
        let mut warps = Vec::with_capacity(batch_size);

        for item in items {
            from_images.push(item.from_image);
            from_poses.push(item.from_pose);
            to_images.push(item.to_image);
            to_poses.push(item.to_pose);
            warps.push(item.warp);
        }

        let image_shape = [height, width, 3];
        let pose_shape = [height, width, NUM_JOINTS];

        PosePairBatch {
            from_images: stack_channels_last(from_images, image_shape, device),
            from_poses: from_poses
                .into_iter()
                .collect::<Option<Vec<_>>>()
                .map(|poses| stack_channels_last(poses, pose_shape, device)),
            to_images: stack_channels_last(to_images, image_shape, device),
            to_poses: stack_channels_last(to_poses, pose_shape, device),
            warp: warps
                .into_iter()
                .collect::<Option<Vec<_>>>()
                .map(|warps| stack_warps(warps, [height, width], device)),
        }
    }
}

/// Pose-pair dataset backed by a pair table, an annotation table, an image
/// directory and a pose-map cache.
pub struct PosePairDataset {
    config: PoseDatasetConfig,
    pairs: PairTable,
    annotations: AnnotationTable,
    cache: PoseMapCache,
}

impl PosePairDataset {
    /// Create a new dataset.
    ///
    /// # Arguments
    ///
    /// * `config` - Dataset configuration naming the tables, image directory and cache
    ///
    /// # Returns
    ///
    /// A new dataset instance or an error if a table cannot be read or the
    /// cache directory cannot be created.
    pub fn new(config: PoseDatasetConfig) -> DatasetResult<Self> {
        let pairs = PairTable::load(&config.pairs_file)?;
        let annotations = AnnotationTable::load(&config.annotations_file)?;
        Self::from_tables(config, pairs, annotations)
    }

    /// Create a dataset from tables already in memory.
    pub fn from_tables(
        config: PoseDatasetConfig,
        pairs: PairTable,
        annotations: AnnotationTable,
    ) -> DatasetResult<Self> {
        config.validate()?;
        let cache = PoseMapCache::new(&config.pose_cache_dir)?;

        info!(
            "Number of images: {} ({} distinct)",
            annotations.row_count(),
            annotations.len()
        );
        info!("Number of pairs: {}", pairs.len());

        Ok(Self {
            config,
            pairs,
            annotations,
            cache,
        })
    }

    pub fn config(&self) -> &PoseDatasetConfig {
        &self.config
    }

    pub fn pairs(&self) -> &PairTable {
        &self.pairs
    }

    pub fn annotations(&self) -> &AnnotationTable {
        &self.annotations
    }

    pub fn cache(&self) -> &PoseMapCache {
        &self.cache
    }

    pub(crate) fn pairs_mut(&mut self) -> &mut PairTable {
        &mut self.pairs
    }

    pub fn pair(&self, index: usize) -> DatasetResult<&PairRecord> {
        self.pairs.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.pairs.len(),
        })
    }

    /// `[H, W, 18]` heat-map of `name`, from the cache when available.
    pub fn pose_map(&self, name: &str) -> DatasetResult<Array3<f32>> {
        self.cache
            .get_or_compute(name, self.config.image_size, || {
                let keypoints = self.annotations.keypoints(name)?;
                Ok(cords_to_map(
                    &keypoints,
                    self.config.image_size,
                    None,
                    self.config.sigma,
                ))
            })
    }

    /// Normalized `[H, W, 3]` pixels of the image `name`.
    pub fn image(&self, name: &str) -> DatasetResult<Vec<f32>> {
        let path = self.config.images_dir.join(name);
        let image = load_image(&path, self.config.image_size)?;
        Ok(preprocess_image(&image))
    }

    /// Part transforms from the `to` pose back to the `from` pose, plus the
    /// `to` part masks when configured.
    pub fn warp(&self, from: &str, to: &str) -> DatasetResult<WarpItem> {
        let source = self.annotations.keypoints(from)?;
        let target = self.annotations.keypoints(to)?;

        let transforms = affine_transforms(&source, &target).concat();
        let masks = (self.config.warp_skip == WarpSkip::Mask).then(|| {
            pose_masks(&target, self.config.image_size)
                .iter()
                .copied()
                .collect()
        });

        Ok(WarpItem { transforms, masks })
    }

    /// Load the pair at `index` as seen by the generator
    /// (`for_discriminator == false`) or the discriminator.
    pub fn load_item(&self, index: usize, for_discriminator: bool) -> DatasetResult<PosePairItem> {
        let pair = self.pair(index)?;
        let [height, width] = self.config.image_size;

        let from_image = self.image(&pair.from)?;
        let from_pose = if self.config.use_input_pose {
            Some(flatten(self.pose_map(&pair.from)?))
        } else {
            None
        };
        let to_image = self.image(&pair.to)?;
        let to_pose = flatten(self.pose_map(&pair.to)?);

        let warp = if self.config.wants_warp(for_discriminator) {
            Some(self.warp(&pair.from, &pair.to)?)
        } else {
            None
        };

        Ok(PosePairItem {
            from_image,
            from_pose,
            to_image,
            to_pose,
            warp,
            height,
            width,
        })
    }

    /// Assemble the pairs at `indices` into one batch.
    pub fn load_batch<B: Backend>(
        &self,
        indices: &[usize],
        for_discriminator: bool,
        device: &B::Device,
    ) -> DatasetResult<PosePairBatch<B>> {
        ensure_non_empty(indices)?;
        let items = indices
            .iter()
            .map(|&index| self.load_item(index, for_discriminator))
            .collect::<DatasetResult<Vec<_>>>()?;
        debug!("Loaded batch of {} pairs", items.len());
        Ok(PosePairBatcher::new().batch(items, device))
    }

    /// `[B, 3, H, W]` images on one side of the pairs at `indices`.
    pub fn load_image_batch<B: Backend>(
        &self,
        indices: &[usize],
        direction: Direction,
        device: &B::Device,
    ) -> DatasetResult<Tensor<B, 4>> {
        ensure_non_empty(indices)?;
        let [height, width] = self.config.image_size;
        let images = indices
            .iter()
            .map(|&index| self.image(direction.select(self.pair(index)?)))
            .collect::<DatasetResult<Vec<_>>>()?;
        Ok(stack_channels_last(images, [height, width, 3], device))
    }

    /// `[B, 18, H, W]` pose maps on one side of the pairs at `indices`.
    pub fn compute_pose_map_batch<B: Backend>(
        &self,
        indices: &[usize],
        direction: Direction,
        device: &B::Device,
    ) -> DatasetResult<Tensor<B, 4>> {
        ensure_non_empty(indices)?;
        let [height, width] = self.config.image_size;
        let poses = indices
            .iter()
            .map(|&index| {
                let name = direction.select(self.pair(index)?);
                self.pose_map(name).map(flatten)
            })
            .collect::<DatasetResult<Vec<_>>>()?;
        Ok(stack_channels_last(poses, [height, width, NUM_JOINTS], device))
    }

    /// Warp tensors for the pairs at `indices`, regardless of `warp_skip`
    /// being `None`; masks follow `warp_skip == Mask`.
    pub fn compute_cord_warp_batch<B: Backend>(
        &self,
        indices: &[usize],
        device: &B::Device,
    ) -> DatasetResult<WarpBatch<B>> {
        ensure_non_empty(indices)?;
        let warps = indices
            .iter()
            .map(|&index| {
                let pair = self.pair(index)?;
                self.warp(&pair.from, &pair.to)
            })
            .collect::<DatasetResult<Vec<_>>>()?;
        Ok(stack_warps(warps, self.config.image_size, device))
    }
}

fn ensure_non_empty(indices: &[usize]) -> DatasetResult<()> {
    if indices.is_empty() {
        return Err(DatasetError::EmptyBatch);
    }
    Ok(())
}

fn flatten(array: Array3<f32>) -> Vec<f32> {
    array.iter().copied().collect()
}

impl Dataset<PosePairItem> for PosePairDataset {
    fn get(&self, index: usize) -> Option<PosePairItem> {
        if index >= self.pairs.len() {
            return None;
        }
        match self.load_item(index, false) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!("Failed to load pair {index}: {e}");
                None
            }
        }
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}
