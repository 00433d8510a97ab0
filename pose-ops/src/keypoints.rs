//! COCO-18 keypoint annotations.
//!
//! Annotations store each image's joints as two JSON lists, one of row (y)
//! and one of column (x) coordinates, with `-1` marking a joint the pose
//! estimator did not detect.

use glam::DVec2;

use crate::error::{PoseError, PoseResult};

/// Number of joints in a pose.
pub const NUM_JOINTS: usize = 18;

/// Coordinate value marking an undetected joint.
pub const MISSING_VALUE: i32 = -1;

/// Body joints in COCO-18 order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Joint {
    Nose,
    Neck,
    RShoulder,
    RElbow,
    RWrist,
    LShoulder,
    LElbow,
    LWrist,
    RHip,
    RKnee,
    RAnkle,
    LHip,
    LKnee,
    LAnkle,
    LEye,
    REye,
    LEar,
    REar,
}

impl Joint {
    /// All joints, in annotation order.
    pub const ALL: [Self; NUM_JOINTS] = [
        Self::Nose,
        Self::Neck,
        Self::RShoulder,
        Self::RElbow,
        Self::RWrist,
        Self::LShoulder,
        Self::LElbow,
        Self::LWrist,
        Self::RHip,
        Self::RKnee,
        Self::RAnkle,
        Self::LHip,
        Self::LKnee,
        Self::LAnkle,
        Self::LEye,
        Self::REye,
        Self::LEar,
        Self::REar,
    ];

    /// The torso quadrilateral.
    pub const TORSO: [Self; 4] = [Self::RHip, Self::LHip, Self::LShoulder, Self::RShoulder];

    /// Joints that locate the head.
    pub const HEAD: [Self; 5] = [Self::Nose, Self::LEye, Self::REye, Self::LEar, Self::REar];

    /// Position of the joint in an annotation list.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short label used by the pose estimator.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::Neck => "neck",
            Self::RShoulder => "Rsho",
            Self::RElbow => "Relb",
            Self::RWrist => "Rwri",
            Self::LShoulder => "Lsho",
            Self::LElbow => "Lelb",
            Self::LWrist => "Lwri",
            Self::RHip => "Rhip",
            Self::RKnee => "Rkne",
            Self::RAnkle => "Rank",
            Self::LHip => "Lhip",
            Self::LKnee => "Lkne",
            Self::LAnkle => "Lank",
            Self::LEye => "Leye",
            Self::REye => "Reye",
            Self::LEar => "Lear",
            Self::REar => "Rear",
        }
    }

    /// The same joint on the other side of the body.
    pub const fn mirrored(self) -> Self {
        match self {
            Self::RShoulder => Self::LShoulder,
            Self::RElbow => Self::LElbow,
            Self::RWrist => Self::LWrist,
            Self::LShoulder => Self::RShoulder,
            Self::LElbow => Self::RElbow,
            Self::LWrist => Self::RWrist,
            Self::RHip => Self::LHip,
            Self::RKnee => Self::LKnee,
            Self::RAnkle => Self::LAnkle,
            Self::LHip => Self::RHip,
            Self::LKnee => Self::RKnee,
            Self::LAnkle => Self::RAnkle,
            Self::LEye => Self::REye,
            Self::REye => Self::LEye,
            Self::LEar => Self::REar,
            Self::REar => Self::LEar,
            Self::Nose => Self::Nose,
            Self::Neck => Self::Neck,
        }
    }
}

/// A detected joint position in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub y: f32,
    pub x: f32,
}

impl Keypoint {
    pub const fn new(y: f32, x: f32) -> Self {
        Self { y, x }
    }

    /// The keypoint as an `(x, y)` point.
    pub fn to_xy(self) -> DVec2 {
        DVec2::new(f64::from(self.x), f64::from(self.y))
    }
}

/// The 18 joints of one person, each possibly undetected.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PoseKeypoints {
    joints: [Option<Keypoint>; NUM_JOINTS],
}

impl PoseKeypoints {
    /// Parse the `keypoints_y` and `keypoints_x` annotation columns.
    pub fn from_strings(y_str: &str, x_str: &str) -> PoseResult<Self> {
        let ys = parse_coordinates(y_str)?;
        let xs = parse_coordinates(x_str)?;
        if ys.len() != NUM_JOINTS || xs.len() != NUM_JOINTS {
            return Err(PoseError::WrongKeypointCount {
                expected: NUM_JOINTS,
                actual_y: ys.len(),
                actual_x: xs.len(),
            });
        }

        let cords: Vec<[f32; 2]> = ys.into_iter().zip(xs).map(|(y, x)| [y, x]).collect();
        Ok(Self::from_cords(&cords))
    }

    /// Build a pose from `(y, x)` pairs; pairs containing `-1` are missing.
    /// Entries past the 18th are ignored.
    pub fn from_cords(cords: &[[f32; 2]]) -> Self {
        let missing = MISSING_VALUE as f32;
        let mut joints = [None; NUM_JOINTS];
        for (slot, &[y, x]) in joints.iter_mut().zip(cords) {
            if y != missing && x != missing {
                *slot = Some(Keypoint::new(y, x));
            }
        }
        Self { joints }
    }

    /// `(y, x)` pairs with missing joints written as `-1`.
    pub fn to_cords(&self) -> [[f32; 2]; NUM_JOINTS] {
        let missing = MISSING_VALUE as f32;
        self.joints
            .map(|joint| joint.map_or([missing, missing], |kp| [kp.y, kp.x]))
    }

    pub fn get(&self, joint: Joint) -> Option<Keypoint> {
        self.joints[joint.index()]
    }

    pub fn set(&mut self, joint: Joint, keypoint: Option<Keypoint>) {
        self.joints[joint.index()] = keypoint;
    }

    pub fn is_present(&self, joint: Joint) -> bool {
        self.get(joint).is_some()
    }

    pub fn all_present(&self, joints: &[Joint]) -> bool {
        joints.iter().all(|&joint| self.is_present(joint))
    }

    /// Iterate joints in annotation order.
    pub fn iter(&self) -> impl Iterator<Item = Option<Keypoint>> + '_ {
        self.joints.iter().copied()
    }

    /// `(x, y)` points of the given joints, or `None` if any is missing.
    pub fn points(&self, joints: &[Joint]) -> Option<Vec<DVec2>> {
        joints
            .iter()
            .map(|&joint| self.get(joint).map(Keypoint::to_xy))
            .collect()
    }

    /// Whether the torso is complete, which warping requires.
    pub fn is_valid(&self) -> bool {
        self.all_present(&Joint::TORSO)
    }

    /// Body scale: root mean square of the two hip-to-shoulder distances.
    pub fn torso_scale(&self) -> Option<f64> {
        let [r_hip, l_hip, l_sho, r_sho]: [DVec2; 4] =
            self.points(&Joint::TORSO)?.try_into().ok()?;
        let right = r_hip.distance_squared(r_sho);
        let left = l_hip.distance_squared(l_sho);
        Some(((right + left) / 2.0).sqrt())
    }
}

fn parse_coordinates(text: &str) -> PoseResult<Vec<f32>> {
    serde_json::from_str(text).map_err(|source| PoseError::MalformedCoordinates {
        text: text.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::tests::{full_pose, FULL_POSE_X};

    #[test]
    fn parses_annotation_columns() {
        let pose = full_pose();

        assert_eq!(pose.get(Joint::Nose), Some(Keypoint::new(2.0, 4.0)));
        assert_eq!(pose.get(Joint::REar), Some(Keypoint::new(2.0, 6.0)));
        assert!(pose.is_valid());
    }

    #[test]
    fn minus_one_marks_missing_joint() {
        let y = "[-1, 4, 4, 7, 10, 4, 7, 10, 10, 12, 15, 10, 12, 15, 1, 1, 2, 2]";
        let x = "[4, 4, 2, 1, 1, 6, 7, 7, 3, 3, 3, 5, 5, 5, 3, 5, 2, -1]";
        let pose = PoseKeypoints::from_strings(y, x).unwrap();

        assert!(!pose.is_present(Joint::Nose));
        assert!(!pose.is_present(Joint::REar));
        assert!(pose.is_present(Joint::Neck));
        assert_eq!(pose.to_cords()[0], [-1.0, -1.0]);
    }

    #[test]
    fn rejects_wrong_joint_count() {
        let result = PoseKeypoints::from_strings("[1, 2, 3]", FULL_POSE_X);

        match result {
            Err(PoseError::WrongKeypointCount {
                actual_y, actual_x, ..
            }) => {
                assert_eq!(actual_y, 3);
                assert_eq!(actual_x, NUM_JOINTS);
            }
            other => panic!("Expected WrongKeypointCount, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_list() {
        let result = PoseKeypoints::from_strings("[1, 2", FULL_POSE_X);
        assert!(matches!(result, Err(PoseError::MalformedCoordinates { .. })));
    }

    #[test]
    fn torso_scale_averages_both_sides() {
        let pose = full_pose();

        // Rhip (10, 3) to Rsho (4, 2): 36 + 1; Lhip (10, 5) to Lsho (4, 6): 36 + 1.
        assert_relative_eq!(pose.torso_scale().unwrap(), 37f64.sqrt());
    }

    #[test]
    fn incomplete_torso_has_no_scale() {
        let mut pose = full_pose();
        pose.set(Joint::LHip, None);

        assert!(!pose.is_valid());
        assert!(pose.torso_scale().is_none());
    }

    #[test]
    fn mirroring_is_an_involution() {
        for joint in Joint::ALL {
            assert_eq!(joint.mirrored().mirrored(), joint);
        }
        assert_eq!(Joint::RKnee.mirrored(), Joint::LKnee);
    }
}
