//! Per-body-part affine warps between two poses.
//!
//! The generator's deformable skip connections move source-image features
//! part by part. For every body part we estimate the affine map that takes
//! target-pose coordinates back into the source image; parts that cannot be
//! estimated get [`AffineTransform::OFFSCREEN`], which samples from far
//! outside the frame and so contributes nothing.

use glam::{DMat2, DMat3, DVec2, DVec3};

use crate::keypoints::{Joint, PoseKeypoints};

/// Number of warped parts: body, head and eight limb segments.
pub const NUM_PARTS: usize = 10;

/// Limb segments, in the order their transforms and masks are emitted.
pub const LIMBS: [(Joint, Joint); 8] = [
    (Joint::RHip, Joint::RKnee),
    (Joint::LHip, Joint::LKnee),
    (Joint::RKnee, Joint::RAnkle),
    (Joint::LKnee, Joint::LAnkle),
    (Joint::RShoulder, Joint::RElbow),
    (Joint::LShoulder, Joint::LElbow),
    (Joint::RElbow, Joint::RWrist),
    (Joint::LElbow, Joint::LWrist),
];

/// Row-major affine parameters of every part with the constant `1` dropped.
pub type PartTransforms = [[f32; 8]; NUM_PARTS];

// Limb quadrilateral extents, as fractions of the limb length (`INC_*`) and
// of the torso scale (`WIDTH_*`).
const INC_TO: f64 = 0.2;
const INC_FROM: f64 = 0.1;
const WIDTH_TO: f64 = 0.2;
const WIDTH_FROM: f64 = 0.2;

const DEGENERACY_TOLERANCE: f64 = 1e-9;

/// A 2-D affine transform acting on `(x, y)` points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    matrix: DMat3,
}

impl AffineTransform {
    pub const IDENTITY: Self = Self {
        matrix: DMat3::IDENTITY,
    };

    /// Identity shifted by 1000 pixels in both axes.
    pub const OFFSCREEN: Self = Self {
        matrix: DMat3::from_cols(DVec3::X, DVec3::Y, DVec3::new(1000.0, 1000.0, 1.0)),
    };

    pub const fn from_matrix(matrix: DMat3) -> Self {
        Self { matrix }
    }

    pub const fn matrix(&self) -> DMat3 {
        self.matrix
    }

    /// Least-squares affine map taking each `src` point onto the matching
    /// `dst` point.
    ///
    /// Returns `None` for fewer than three correspondences, mismatched
    /// lengths, or source points that do not span the plane.
    pub fn estimate(src: &[DVec2], dst: &[DVec2]) -> Option<Self> {
        if src.len() < 3 || src.len() != dst.len() {
            return None;
        }

        let n = src.len() as f64;
        let src_mean = src.iter().copied().sum::<DVec2>() / n;
        let dst_mean = dst.iter().copied().sum::<DVec2>() / n;

        // Normal equations on centered points: L = (Σ q pᵀ)(Σ p pᵀ)⁻¹.
        let mut spp = DMat2::ZERO;
        let mut sqp = DMat2::ZERO;
        for (&p, &q) in src.iter().zip(dst) {
            let p = p - src_mean;
            let q = q - dst_mean;
            spp += DMat2::from_cols(p * p.x, p * p.y);
            sqp += DMat2::from_cols(q * p.x, q * p.y);
        }

        let det = spp.determinant();
        let scale = spp.x_axis.x * spp.y_axis.y;
        if scale <= 0.0 || det <= DEGENERACY_TOLERANCE * scale {
            return None;
        }

        let linear = sqp * spp.inverse();
        let translation = dst_mean - linear * src_mean;
        let matrix = DMat3::from_cols(
            linear.x_axis.extend(0.0),
            linear.y_axis.extend(0.0),
            translation.extend(1.0),
        );
        matrix.is_finite().then_some(Self { matrix })
    }

    pub fn apply(&self, point: DVec2) -> DVec2 {
        self.matrix.transform_point2(point)
    }

    /// The first eight row-major entries of the 3x3 matrix.
    pub fn to_params(&self) -> [f32; 8] {
        let m = self.matrix;
        [
            m.x_axis.x, m.y_axis.x, m.z_axis.x, //
            m.x_axis.y, m.y_axis.y, m.z_axis.y, //
            m.x_axis.z, m.y_axis.z,
        ]
        .map(|v| v as f32)
    }
}

/// Quadrilateral covering the limb segment `from -> to`.
///
/// The segment is lengthened by `inc_from` and `inc_to` times its length at
/// each end, and widened perpendicularly by `scale * p_from` and
/// `scale * p_to`. A zero-length segment yields a one-pixel square.
pub fn estimate_polygon(
    from: DVec2,
    to: DVec2,
    scale: f64,
    inc_to: f64,
    inc_from: f64,
    p_to: f64,
    p_from: f64,
) -> [DVec2; 4] {
    let direction = to - from;
    let from = from - direction * inc_from;
    let to = to + direction * inc_to;

    let normal = direction.perp();
    let length = normal.length();
    if length == 0.0 {
        return [from + 1.0, from - 1.0, to - 1.0, to + 1.0];
    }
    let normal = normal / length;

    [
        from + normal * scale * p_from,
        from - normal * scale * p_from,
        to - normal * scale * p_to,
        to + normal * scale * p_to,
    ]
}

pub(crate) fn limb_polygon(from: DVec2, to: DVec2, scale: f64) -> [DVec2; 4] {
    estimate_polygon(from, to, scale, INC_TO, INC_FROM, WIDTH_TO, WIDTH_FROM)
}

/// Estimate the ten part transforms mapping `target` coordinates to
/// `source` coordinates.
///
/// Parts are ordered body, head, then [`LIMBS`]. A limb absent from the
/// source pose borrows the source's mirrored limb.
pub fn affine_transforms(source: &PoseKeypoints, target: &PoseKeypoints) -> PartTransforms {
    let mut transforms = [AffineTransform::OFFSCREEN; NUM_PARTS];

    transforms[0] = body_transform(source, target).unwrap_or(AffineTransform::OFFSCREEN);
    transforms[1] = head_transform(source, target).unwrap_or(AffineTransform::OFFSCREEN);

    if let (Some(source_scale), Some(target_scale)) = (source.torso_scale(), target.torso_scale())
    {
        for (slot, &(from, to)) in transforms[2..].iter_mut().zip(LIMBS.iter()) {
            *slot = limb_transform(source, target, source_scale, target_scale, from, to)
                .unwrap_or(AffineTransform::OFFSCREEN);
        }
    }

    transforms.map(|tr| tr.to_params())
}

fn body_transform(source: &PoseKeypoints, target: &PoseKeypoints) -> Option<AffineTransform> {
    let source_poly = source.points(&Joint::TORSO)?;
    let target_poly = target.points(&Joint::TORSO)?;
    AffineTransform::estimate(&target_poly, &source_poly)
}

fn head_transform(source: &PoseKeypoints, target: &PoseKeypoints) -> Option<AffineTransform> {
    let mut joints: Vec<Joint> = Joint::HEAD
        .into_iter()
        .filter(|&joint| source.is_present(joint) && target.is_present(joint))
        .collect();
    if joints.is_empty() {
        return None;
    }
    joints.extend([Joint::LShoulder, Joint::RShoulder]);

    let source_poly = source.points(&joints)?;
    let target_poly = target.points(&joints)?;
    AffineTransform::estimate(&target_poly, &source_poly)
}

fn limb_transform(
    source: &PoseKeypoints,
    target: &PoseKeypoints,
    source_scale: f64,
    target_scale: f64,
    from: Joint,
    to: Joint,
) -> Option<AffineTransform> {
    let [target_from, target_to]: [_; 2] = target.points(&[from, to])?.try_into().ok()?;
    let target_poly = limb_polygon(target_from, target_to, target_scale);

    let [source_from, source_to]: [_; 2] = source
        .points(&[from, to])
        .or_else(|| source.points(&[from.mirrored(), to.mirrored()]))?
        .try_into()
        .ok()?;
    let source_poly = limb_polygon(source_from, source_to, source_scale);

    AffineTransform::estimate(&target_poly, &source_poly)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::{keypoints::Keypoint, tests::full_pose};

    const OFFSCREEN_PARAMS: [f32; 8] = [1.0, 0.0, 1000.0, 0.0, 1.0, 1000.0, 0.0, 0.0];

    fn shifted(pose: &PoseKeypoints, dy: f32, dx: f32) -> PoseKeypoints {
        let cords: Vec<[f32; 2]> = pose
            .to_cords()
            .iter()
            .map(|&[y, x]| if y < 0.0 { [y, x] } else { [y + dy, x + dx] })
            .collect();
        PoseKeypoints::from_cords(&cords)
    }

    #[test]
    fn estimate_recovers_known_transform() {
        let truth = DMat3::from_cols(
            DVec3::new(2.0, 0.5, 0.0),
            DVec3::new(-0.3, 1.5, 0.0),
            DVec3::new(4.0, -7.0, 1.0),
        );
        let src = [
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(0.0, 10.0),
            DVec2::new(7.0, 3.0),
        ];
        let dst: Vec<DVec2> = src.iter().map(|&p| truth.transform_point2(p)).collect();

        let estimated = AffineTransform::estimate(&src, &dst).unwrap();
        for (a, b) in estimated
            .matrix()
            .to_cols_array()
            .iter()
            .zip(truth.to_cols_array())
        {
            assert_relative_eq!(*a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn estimate_rejects_collinear_points() {
        let src = [
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(2.0, 2.0),
        ];
        assert!(AffineTransform::estimate(&src, &src).is_none());
        assert!(AffineTransform::estimate(&src[..2], &src[..2]).is_none());
    }

    #[test]
    fn params_drop_constant_entry() {
        assert_eq!(AffineTransform::OFFSCREEN.to_params(), OFFSCREEN_PARAMS);
        assert_eq!(
            AffineTransform::IDENTITY.to_params(),
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn polygon_is_widened_perpendicular_to_limb() {
        let poly = estimate_polygon(
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 10.0),
            5.0,
            0.2,
            0.1,
            0.2,
            0.2,
        );

        assert_relative_eq!(poly[0].y, -1.0);
        assert_relative_eq!(poly[2].y, 12.0);
        assert_relative_eq!((poly[0] - poly[1]).length(), 2.0);
        assert_relative_eq!(poly[0].x.abs(), 1.0);
    }

    #[test]
    fn translated_pose_yields_translations() {
        let source = full_pose();
        let target = shifted(&source, 1.0, -2.0);

        let transforms = affine_transforms(&source, &target);
        for params in transforms {
            // Target -> source undoes the shift.
            assert_relative_eq!(params[0], 1.0, epsilon = 1e-4);
            assert_relative_eq!(params[1], 0.0, epsilon = 1e-4);
            assert_relative_eq!(params[2], 2.0, epsilon = 1e-4);
            assert_relative_eq!(params[4], 1.0, epsilon = 1e-4);
            assert_relative_eq!(params[5], -1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn incomplete_torso_sends_parts_offscreen() {
        let source = full_pose();
        let mut target = full_pose();
        target.set(Joint::RHip, None);

        let transforms = affine_transforms(&source, &target);
        assert_eq!(transforms[0], OFFSCREEN_PARAMS);
        for params in &transforms[2..] {
            assert_eq!(*params, OFFSCREEN_PARAMS);
        }
        // The head only needs the shoulders.
        assert_ne!(transforms[1], OFFSCREEN_PARAMS);
    }

    #[test]
    fn missing_source_limb_uses_mirrored_limb() {
        let mut source = full_pose();
        source.set(Joint::RWrist, None);
        let target = full_pose();

        let transforms = affine_transforms(&source, &target);
        assert_ne!(transforms[8], OFFSCREEN_PARAMS);

        let mut no_arms = source.clone();
        no_arms.set(Joint::LWrist, None);
        let transforms = affine_transforms(&no_arms, &target);
        assert_eq!(transforms[8], OFFSCREEN_PARAMS);
    }

    #[test]
    fn missing_target_limb_is_offscreen() {
        let source = full_pose();
        let mut target = full_pose();
        target.set(Joint::LKnee, Some(Keypoint::new(12.0, 5.0)));
        target.set(Joint::LAnkle, None);

        let transforms = affine_transforms(&source, &target);
        assert_eq!(transforms[5], OFFSCREEN_PARAMS);
        assert_ne!(transforms[3], OFFSCREEN_PARAMS);
    }
}
