//! Image loading and pixel normalization.
//!
//! The generator works on pixels scaled to `[-1, 1]`; these helpers move
//! images in and out of that range.

use std::path::Path;

use burn::tensor::{backend::Backend, Tensor};
use image::RgbImage;

use crate::error::{DatasetError, DatasetResult};

/// Scale 8-bit RGB pixels to `[-1, 1]`, keeping the HWC layout.
pub fn preprocess_image(image: &RgbImage) -> Vec<f32> {
    image
        .as_raw()
        .iter()
        .map(|&v| (f32::from(v) / 255.0 - 0.5) * 2.0)
        .collect()
}

/// Load an RGB image that must already be `image_size` (`[height, width]`).
pub fn load_image(path: &Path, image_size: [usize; 2]) -> DatasetResult<RgbImage> {
    let image = image::open(path)
        .map_err(|source| DatasetError::ImageOpenFailed {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgb8();

    let actual = [image.height() as usize, image.width() as usize];
    if actual != image_size {
        return Err(DatasetError::ImageSizeMismatch {
            path: path.to_path_buf(),
            expected: image_size,
            actual,
        });
    }
    Ok(image)
}

/// Convert a `[3, H, W]` tensor in `[-1, 1]` back to an 8-bit image.
pub fn deprocess_image<B: Backend>(tensor: Tensor<B, 3>) -> DatasetResult<RgbImage> {
    let [channels, height, width] = tensor.dims();
    if channels != 3 {
        return Err(DatasetError::InvalidTensorShape {
            expected: "[3, H, W]".to_string(),
            actual: format!("{:?}", [channels, height, width]),
        });
    }

    let pixels: Vec<u8> = tensor
        .add_scalar(1.0)
        .mul_scalar(127.5)
        .clamp(0.0, 255.0)
        .permute([1, 2, 0])
        .into_data()
        .iter::<f32>()
        .map(|v| v as u8)
        .collect();

    RgbImage::from_raw(width as u32, height as u32, pixels).ok_or_else(|| {
        DatasetError::InvalidTensorShape {
            expected: format!("{} pixel values", height * width * 3),
            actual: "a shorter buffer".to_string(),
        }
    })
}
