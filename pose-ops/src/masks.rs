//! Binary body-part masks for the target pose.

use glam::DVec2;
use image::{GrayImage, Luma};
use imageproc::{drawing::draw_polygon_mut, point::Point};
use ndarray::{s, Array3, ArrayViewMut2, Axis};

use crate::{
    affine::{limb_polygon, LIMBS, NUM_PARTS},
    keypoints::{Joint, PoseKeypoints},
};

/// Half-side of the head box as a fraction of the torso scale.
const HEAD_EXTENT: f64 = 0.4;

/// Rasterize the ten part masks of `pose` into a `[10, H, W]` array.
///
/// Order matches [`affine_transforms`](crate::affine_transforms): the body
/// mask covers the whole image, the head mask is a box around the centroid
/// of the visible head joints, and each limb mask is its polygon. Parts that
/// cannot be located, including every scaled part of a pose without a full
/// torso, are left empty.
pub fn pose_masks(pose: &PoseKeypoints, image_size: [usize; 2]) -> Array3<f32> {
    let [height, width] = image_size;
    let mut masks = Array3::<f32>::zeros((NUM_PARTS, height, width));

    masks.index_axis_mut(Axis(0), 0).fill(1.0);

    let Some(scale) = pose.torso_scale() else {
        return masks;
    };

    let head: Vec<DVec2> = Joint::HEAD
        .into_iter()
        .filter_map(|joint| pose.get(joint).map(|kp| kp.to_xy()))
        .collect();
    if !head.is_empty() {
        let center = (head.iter().copied().sum::<DVec2>() / head.len() as f64).trunc();
        fill_box(
            masks.index_axis_mut(Axis(0), 1),
            center - HEAD_EXTENT * scale,
            center + HEAD_EXTENT * scale,
        );
    }

    for (k, &(from, to)) in LIMBS.iter().enumerate() {
        let (Some(from), Some(to)) = (pose.get(from), pose.get(to)) else {
            continue;
        };
        let polygon = limb_polygon(from.to_xy(), to.to_xy(), scale);
        fill_polygon(masks.index_axis_mut(Axis(0), k + 2), &polygon);
    }

    masks
}

/// Set the `(x, y)` box `[min, max)` to one, clipped to the mask.
fn fill_box(mut mask: ArrayViewMut2<f32>, min: DVec2, max: DVec2) {
    let (height, width) = mask.dim();
    let clip = |v: f64, limit: usize| v.clamp(0.0, limit as f64) as usize;

    let (x0, x1) = (clip(min.x, width), clip(max.x, width));
    let (y0, y1) = (clip(min.y, height), clip(max.y, height));
    if x0 < x1 && y0 < y1 {
        mask.slice_mut(s![y0..y1, x0..x1]).fill(1.0);
    }
}

fn fill_polygon(mut mask: ArrayViewMut2<f32>, polygon: &[DVec2]) {
    let (height, width) = mask.dim();

    let mut points: Vec<Point<i32>> = Vec::with_capacity(polygon.len());
    for vertex in polygon {
        let point = Point::new(vertex.x.round() as i32, vertex.y.round() as i32);
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    // imageproc expects an open polygon.
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return;
    }

    let mut canvas = GrayImage::new(width as u32, height as u32);
    draw_polygon_mut(&mut canvas, &points, Luma([255u8]));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        if pixel[0] > 0 {
            mask[[y as usize, x as usize]] = 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::full_pose;

    fn mask_sum(masks: &Array3<f32>, part: usize) -> f32 {
        masks.index_axis(Axis(0), part).sum()
    }

    #[test]
    fn produces_one_mask_per_part() {
        let masks = pose_masks(&full_pose(), [16, 8]);

        assert_eq!(masks.dim(), (NUM_PARTS, 16, 8));
        assert!(masks.iter().all(|&v| v == 0.0 || v == 1.0));
        assert_eq!(mask_sum(&masks, 0), 16.0 * 8.0);
    }

    #[test]
    fn head_box_surrounds_head_joints() {
        let masks = pose_masks(&full_pose(), [16, 8]);
        let head = masks.index_axis(Axis(0), 1);

        // Head joints average to (x=4, y=1.6) -> (4, 1); half-side 0.4 * sqrt(37).
        assert_eq!(head[[1, 4]], 1.0);
        assert_eq!(head[[0, 2]], 1.0);
        assert_eq!(head[[5, 4]], 0.0);
    }

    #[test]
    fn limb_masks_cover_their_joints() {
        let pose = full_pose();
        let masks = pose_masks(&pose, [16, 8]);

        for (k, &(from, to)) in LIMBS.iter().enumerate() {
            let mask = masks.index_axis(Axis(0), k + 2);
            for joint in [from, to] {
                let kp = pose.get(joint).unwrap();
                assert_eq!(mask[[kp.y as usize, kp.x as usize]], 1.0, "{joint:?}");
            }
        }
    }

    #[test]
    fn missing_parts_are_empty() {
        let mut pose = full_pose();
        pose.set(Joint::RAnkle, None);
        for joint in Joint::HEAD {
            pose.set(joint, None);
        }
        let masks = pose_masks(&pose, [16, 8]);

        assert_eq!(mask_sum(&masks, 1), 0.0);
        assert_eq!(mask_sum(&masks, 4), 0.0);
        assert!(mask_sum(&masks, 2) > 0.0);
    }

    #[test]
    fn pose_without_torso_keeps_only_body_mask() {
        let mut pose = full_pose();
        pose.set(Joint::LShoulder, None);
        let masks = pose_masks(&pose, [16, 8]);

        assert_eq!(mask_sum(&masks, 0), 16.0 * 8.0);
        for part in 1..NUM_PARTS {
            assert_eq!(mask_sum(&masks, part), 0.0);
        }
    }
}
