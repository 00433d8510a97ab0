//! Gaussian keypoint heat-maps.

use ndarray::{Array3, Axis};

use crate::keypoints::{PoseKeypoints, MISSING_VALUE, NUM_JOINTS};

/// Standard deviation, in pixels, of each joint's Gaussian.
pub const DEFAULT_SIGMA: f32 = 6.0;

/// Minimum peak value for a heat-map channel to count as a detected joint.
pub const DEFAULT_THRESHOLD: f32 = 0.1;

/// Rasterize a pose into a `[H, W, 18]` heat-map.
///
/// Keypoints are given in `old_size` pixel space (the target size when
/// `None`) and rescaled to `image_size`, both `[height, width]`. The scaled
/// coordinate is truncated to a whole pixel before the Gaussian is drawn.
/// Missing joints leave their channel at zero.
pub fn cords_to_map(
    pose: &PoseKeypoints,
    image_size: [usize; 2],
    old_size: Option<[usize; 2]>,
    sigma: f32,
) -> Array3<f32> {
    let [height, width] = image_size;
    let [old_height, old_width] = old_size.unwrap_or(image_size);
    let denom = 2.0 * sigma * sigma;

    let mut result = Array3::<f32>::zeros((height, width, NUM_JOINTS));
    for (k, keypoint) in pose.iter().enumerate() {
        let Some(keypoint) = keypoint else {
            continue;
        };
        let py = (keypoint.y / old_height as f32 * height as f32).trunc();
        let px = (keypoint.x / old_width as f32 * width as f32).trunc();

        let mut channel = result.index_axis_mut(Axis(2), k);
        for ((y, x), value) in channel.indexed_iter_mut() {
            let dy = y as f32 - py;
            let dx = x as f32 - px;
            *value = (-(dy * dy + dx * dx) / denom).exp();
        }
    }
    result
}

/// Recover keypoints from a heat-map.
///
/// Each of the first 18 channels yields the first row-major position of its
/// maximum, provided that maximum exceeds `threshold`.
pub fn map_to_cords(pose_map: &Array3<f32>, threshold: f32) -> PoseKeypoints {
    let channels = pose_map.len_of(Axis(2)).min(NUM_JOINTS);
    let mut cords = [[MISSING_VALUE as f32; 2]; NUM_JOINTS];

    for (k, cord) in cords.iter_mut().enumerate().take(channels) {
        let channel = pose_map.index_axis(Axis(2), k);
        let peak = channel.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
        if peak <= threshold {
            continue;
        }
        if let Some(((y, x), _)) = channel.indexed_iter().find(|&(_, &v)| v == peak) {
            *cord = [y as f32, x as f32];
        }
    }
    PoseKeypoints::from_cords(&cords)
}
