// ================================
// src/fingers.rs - the two finger markers and their mirrored motion
// ================================
use builtin_interfaces::msg::Time as TimeMsg;
use geometry_msgs::msg::{Point, Pose, Quaternion, Vector3};
use std_msgs::msg::ColorRGBA;
use visualization_msgs::msg::{InteractiveMarkerFeedback, Marker};

use crate::config::GripperConfig;

// visualization_msgs/Marker constants
pub const MARKER_SPHERE: i32 = 2;
pub const MARKER_CYLINDER: i32 = 3;
pub const MARKER_ADD: i32 = 0;
pub const MARKER_MODIFY: i32 = 0; // same value as ADD on the wire

pub const FINGER_A_ID: i32 = 1;
pub const FINGER_B_ID: i32 = 2;

// 90 degrees about x, so the cylinders lie along y
const FINGER_ORIENTATION: Quaternion = Quaternion {
    x: 0.707,
    y: 0.0,
    z: 0.0,
    w: 0.707,
};

const FINGER_SCALE: Vector3 = Vector3 {
    x: 1.0,
    y: 1.0,
    z: 3.0,
};

const BLUE: ColorRGBA = ColorRGBA {
    r: 0.0,
    g: 0.0,
    b: 1.0,
    a: 1.0,
};

const RED: ColorRGBA = ColorRGBA {
    r: 1.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerAction {
    Create,
    Modify,
}

impl FingerAction {
    pub fn as_marker_action(self) -> i32 {
        match self {
            FingerAction::Create => MARKER_ADD,
            FingerAction::Modify => MARKER_MODIFY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Finger {
    pub id: i32,
    pub pose: Pose,
    pub scale: Vector3,
    pub color: ColorRGBA,
    pub action: FingerAction,
    pub stamp: TimeMsg,
}

impl Finger {
    fn new(id: i32, x: f64, config: &GripperConfig, color: ColorRGBA, stamp: TimeMsg) -> Self {
        Self {
            id,
            pose: Pose {
                position: Point {
                    x,
                    y: config.finger_y,
                    z: config.finger_z,
                },
                orientation: FINGER_ORIENTATION,
            },
            scale: FINGER_SCALE,
            color,
            action: FingerAction::Create,
            stamp,
        }
    }

    pub fn x(&self) -> f64 {
        self.pose.position.x
    }

    pub fn to_marker(&self, frame_id: &str) -> Marker {
        let mut marker = Marker::default();

        marker.header.frame_id = frame_id.to_string();
        marker.header.stamp = self.stamp.clone();
        marker.id = self.id;
        marker.type_ = MARKER_CYLINDER;
        marker.action = self.action.as_marker_action();
        marker.pose = self.pose.clone();
        marker.scale = self.scale.clone();
        marker.color = self.color.clone();

        marker
    }
}

/// Both fingers of the gripper. Finger B always sits at the mirror image of
/// finger A about the base frame's `x = 0` plane.
#[derive(Debug, Clone)]
pub struct GripperFingers {
    frame_id: String,
    gain: f64,
    finger_a: Finger,
    finger_b: Finger,
}

impl GripperFingers {
    pub fn new(config: &GripperConfig, stamp: TimeMsg) -> Self {
        let offset = config.initial_offset;
        Self {
            frame_id: config.base_frame.clone(),
            gain: config.finger_gain,
            finger_a: Finger::new(FINGER_A_ID, offset, config, BLUE, stamp.clone()),
            finger_b: Finger::new(FINGER_B_ID, -offset, config, RED, stamp),
        }
    }

    /// Move the fingers for a control orientation whose scalar part is `w`.
    ///
    /// `x_a = gain * w`, `x_b = -x_a`. `w` is not clamped: a non-unit
    /// quaternion extrapolates linearly. Returns the new `x_a`.
    pub fn apply_orientation(&mut self, w: f64, stamp: TimeMsg) -> f64 {
        let x_a = self.gain * w;

        self.finger_a.pose.position.x = x_a;
        self.finger_b.pose.position.x = -x_a;

        for finger in [&mut self.finger_a, &mut self.finger_b] {
            finger.action = FingerAction::Modify;
            finger.stamp = stamp.clone();
        }

        x_a
    }

    pub fn finger_a(&self) -> &Finger {
        &self.finger_a
    }

    pub fn finger_b(&self) -> &Finger {
        &self.finger_b
    }

    /// Handle one interactive-marker feedback event: move the fingers to the
    /// reported orientation and return both markers to republish, A then B.
    pub fn on_feedback(&mut self, feedback: &InteractiveMarkerFeedback, stamp: TimeMsg) -> [Marker; 2] {
        self.apply_orientation(feedback.pose.orientation.w, stamp);
        self.to_markers()
    }

    /// Markers in publish order: finger A, then finger B.
    pub fn to_markers(&self) -> [Marker; 2] {
        [
            self.finger_a.to_marker(&self.frame_id),
            self.finger_b.to_marker(&self.frame_id),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn stamp(sec: i32) -> TimeMsg {
        TimeMsg { sec, nanosec: 0 }
    }

    fn fingers() -> GripperFingers {
        GripperFingers::new(&GripperConfig::default(), stamp(1))
    }

    #[test]
    fn starts_open_with_create_action() {
        let fingers = fingers();
        assert_eq!(fingers.finger_a().x(), 5.0);
        assert_eq!(fingers.finger_b().x(), -5.0);
        assert_eq!(fingers.finger_a().action, FingerAction::Create);
        assert_eq!(fingers.finger_b().action, FingerAction::Create);
    }

    #[test]
    fn fingers_mirror_each_other() {
        let mut fingers = fingers();
        for w in [-1.0, -0.75, -0.2, 0.0, 0.3, 0.5, 0.999, 1.0] {
            let x_a = fingers.apply_orientation(w, stamp(2));
            assert!((x_a - 3.0 * w).abs() < EPS);
            assert!((fingers.finger_a().x() - 3.0 * w).abs() < EPS);
            assert_eq!(fingers.finger_b().x(), -fingers.finger_a().x());
        }
    }

    #[test]
    fn closed_and_fully_open_bounds() {
        let mut fingers = fingers();

        fingers.apply_orientation(0.0, stamp(2));
        assert_eq!(fingers.finger_a().x(), 0.0);
        assert_eq!(fingers.finger_b().x(), 0.0);

        fingers.apply_orientation(1.0, stamp(3));
        assert_eq!(fingers.finger_a().x(), 3.0);
        assert_eq!(fingers.finger_b().x(), -3.0);

        fingers.apply_orientation(-1.0, stamp(4));
        assert_eq!(fingers.finger_a().x(), -3.0);
        assert_eq!(fingers.finger_b().x(), 3.0);
    }

    #[test]
    fn repeated_feedback_does_not_drift() {
        let mut fingers = fingers();
        fingers.apply_orientation(0.4, stamp(2));
        let first = fingers.to_markers();
        fingers.apply_orientation(0.4, stamp(2));
        assert_eq!(fingers.to_markers(), first);
    }

    #[test]
    fn out_of_range_w_extrapolates() {
        let mut fingers = fingers();
        fingers.apply_orientation(2.0, stamp(2));
        assert_eq!(fingers.finger_a().x(), 6.0);
        assert_eq!(fingers.finger_b().x(), -6.0);
    }

    #[test]
    fn feedback_only_touches_x_action_and_stamp() {
        let mut fingers = fingers();
        let before = fingers.finger_a().clone();
        fingers.apply_orientation(0.5, stamp(9));
        let after = fingers.finger_a();

        assert_eq!(after.pose.position.y, before.pose.position.y);
        assert_eq!(after.pose.position.z, before.pose.position.z);
        assert_eq!(after.pose.orientation, before.pose.orientation);
        assert_eq!(after.scale, before.scale);
        assert_eq!(after.color, before.color);
        assert_eq!(after.action, FingerAction::Modify);
        assert_eq!(after.stamp, stamp(9));
    }

    #[test]
    fn markers_carry_fixed_geometry() {
        let [a, b] = fingers().to_markers();

        assert_eq!((a.id, b.id), (FINGER_A_ID, FINGER_B_ID));
        for marker in [&a, &b] {
            assert_eq!(marker.header.frame_id, "base");
            assert_eq!(marker.type_, MARKER_CYLINDER);
            assert_eq!(marker.action, MARKER_ADD);
            assert_eq!(marker.scale, FINGER_SCALE);
            assert_eq!(marker.pose.orientation, FINGER_ORIENTATION);
        }
        assert_eq!(a.color, BLUE);
        assert_eq!(b.color, RED);
    }

    #[test]
    fn feedback_uses_the_scalar_part_of_the_orientation() {
        let mut fingers = fingers();
        let mut feedback = InteractiveMarkerFeedback::default();
        feedback.pose.orientation.x = 0.1;
        feedback.pose.orientation.y = 0.2;
        feedback.pose.orientation.z = 0.9;
        feedback.pose.orientation.w = 0.5;

        let [a, b] = fingers.on_feedback(&feedback, stamp(4));

        assert!((a.pose.position.x - 1.5).abs() < EPS);
        assert!((b.pose.position.x + 1.5).abs() < EPS);
        assert_eq!((a.id, b.id), (FINGER_A_ID, FINGER_B_ID));
        assert_eq!((a.action, b.action), (MARKER_MODIFY, MARKER_MODIFY));
        assert_eq!(a.header.stamp, stamp(4));
        assert_eq!(b.header.stamp, stamp(4));
    }

    #[test]
    fn gain_comes_from_config() {
        let config = GripperConfig {
            finger_gain: 2.0,
            ..Default::default()
        };
        let mut fingers = GripperFingers::new(&config, stamp(0));
        fingers.apply_orientation(0.5, stamp(1));
        assert_eq!(fingers.finger_a().x(), 1.0);
        assert_eq!(fingers.finger_b().x(), -1.0);
    }
}
