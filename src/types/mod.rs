pub mod linalg;

pub use linalg::*;

/// Rigid transform: rotation followed by translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Rotation,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn new(position: Vec3, rotation: Rotation) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Rotation::identity(),
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Rotation::identity(),
        }
    }

    /// Map a point expressed in this pose's local frame into world space.
    pub fn transform_point(&self, local: &Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Apply a local offset on top of this pose (`self * offset`).
    pub fn compose(&self, offset: &Pose) -> Pose {
        Pose {
            position: self.transform_point(&offset.position),
            rotation: self.rotation * offset.rotation,
        }
    }

    /// Local transform taking `from` onto `to`, so that `from.compose(&delta) == to`.
    pub fn delta(from: &Pose, to: &Pose) -> Pose {
        let inverse = from.rotation.inverse();
        Pose {
            position: inverse * (to.position - from.position),
            rotation: inverse * to.rotation,
        }
    }
}

/// A pose sampled at a given time [seconds].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedPose {
    pub timestamp: f64,
    pub pose: Pose,
}

impl TimedPose {
    pub fn new(timestamp: f64, pose: Pose) -> Self {
        Self { timestamp, pose }
    }
}

/// One tick of input from the external pose source.
#[derive(Clone, Copy, Debug)]
pub struct TrackingFrame {
    /// Monotonic host time [seconds]
    pub time: f64,
    /// Tracked root pose; `None` while tracking is lost
    pub root_pose: Option<Pose>,
    pub high_confidence: bool,
}

impl TrackingFrame {
    pub fn tracked(time: f64, root_pose: Pose) -> Self {
        Self {
            time,
            root_pose: Some(root_pose),
            high_confidence: true,
        }
    }

    pub fn lost(time: f64) -> Self {
        Self {
            time,
            root_pose: None,
            high_confidence: false,
        }
    }

    /// Root pose when the frame is usable for velocity sampling.
    pub fn confident_pose(&self) -> Option<&Pose> {
        self.root_pose.as_ref().filter(|_| self.high_confidence)
    }
}

/// Velocities handed to the host when an object is released.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReleaseVelocityInformation {
    /// Linear velocity of the release point [units/s]
    pub linear_velocity: Vec3,
    /// Angular velocity as a scaled axis [rad/s]
    pub angular_velocity: Vec3,
    /// World position of the released object
    pub position: Vec3,
    pub valid: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_delta_inverts_compose() {
        let root = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            Rotation::from_axis_angle(&Vec3::y_axis(), FRAC_PI_2),
        );
        let object = Pose::new(
            Vec3::new(1.5, 2.0, 2.0),
            Rotation::from_axis_angle(&Vec3::x_axis(), 0.3),
        );

        let offset = Pose::delta(&root, &object);
        let rebuilt = root.compose(&offset);

        assert_relative_eq!(rebuilt.position, object.position, epsilon = 1e-12);
        assert_relative_eq!(rebuilt.rotation.angle_to(&object.rotation), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_transform_point_rotates_then_translates() {
        let pose = Pose::new(
            Vec3::new(0.0, 0.0, 1.0),
            Rotation::from_axis_angle(&Vec3::z_axis(), FRAC_PI_2),
        );
        // +X rotated 90° about Z lands on +Y
        let p = pose.transform_point(&Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p, Vec3::new(0.0, 1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_confident_pose() {
        let mut frame = TrackingFrame::tracked(0.0, Pose::identity());
        assert!(frame.confident_pose().is_some());

        frame.high_confidence = false;
        assert!(frame.confident_pose().is_none());
        assert!(TrackingFrame::lost(0.0).confident_pose().is_none());
    }
}
