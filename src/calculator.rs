use crate::types::{Pose, ReleaseVelocityInformation, TrackingFrame};

/// Seam between a grab/throw host and whatever estimates release velocities.
///
/// The host calls [`update_throw_state`](Self::update_throw_state) once per
/// tick while the object is held and
/// [`calculate_throw_velocity`](Self::calculate_throw_velocity) when it is
/// let go.
pub trait ThrowVelocityCalculator {
    fn update_throw_state(&mut self, frame: &TrackingFrame);

    fn calculate_throw_velocity(
        &mut self,
        frame: &TrackingFrame,
        object_pose: &Pose,
    ) -> ReleaseVelocityInformation;

    /// Most recent result of `calculate_throw_velocity`, if any
    fn last_throw_velocities(&self) -> Option<&ReleaseVelocityInformation>;
}
