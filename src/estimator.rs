use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::calculator::ThrowVelocityCalculator;
use crate::config::EstimatorConfig;
use crate::error::VelocityResult;
use crate::history::PoseHistory;
use crate::ransac::{
    angular_sampler, angular_velocity_between, linear_sampler, linear_velocity_between,
    quaternion_dot_score, run_robust_estimate, squared_distance_score,
};
use crate::types::{Pose, ReleaseVelocityInformation, TimedPose, TrackingFrame, Vec3};

/// Release velocity estimator backed by a short pose history and a
/// best-of-S RANSAC over pairwise finite differences.
///
/// Feed it one [`TrackingFrame`] per host tick through [`process`](Self::process)
/// and ask for a [`ReleaseVelocityInformation`] when the object is let go.
pub struct RansacVelocityEstimator {
    config: EstimatorConfig,
    history: PoseHistory,
    rng: StdRng,

    /// Valid, confident, non-stuck frames since the last tracking gap
    consecutive_valid_frames: usize,

    /// |position|² of the last accepted root pose; a cheap "did it move"
    /// check that treats positions on the same sphere as identical
    last_position_fingerprint: Option<f64>,

    /// Host time of the previous tick, valid or not [seconds]
    last_time: f64,

    last_release: Option<ReleaseVelocityInformation>,
}

impl RansacVelocityEstimator {
    /// Create an estimator whose history is prefilled with `start_pose` at `start_time`
    pub fn new(config: EstimatorConfig, start_pose: Pose, start_time: f64) -> VelocityResult<Self> {
        config.validate()?;
        let history = PoseHistory::new(config.history_capacity(), start_pose, start_time)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            history,
            rng,
            consecutive_valid_frames: 0,
            last_position_fingerprint: None,
            last_time: start_time,
            last_release: None,
        })
    }

    pub fn with_defaults(start_pose: Pose, start_time: f64) -> VelocityResult<Self> {
        Self::new(EstimatorConfig::default(), start_pose, start_time)
    }

    /// Ingest one tick of tracking input.
    ///
    /// Repeated calls for the same tick are ignored, so hosts may call this
    /// from several places per frame without double counting.
    pub fn process(&mut self, frame: &TrackingFrame) {
        if !frame.time.is_finite() {
            log::warn!("Tick with non-finite time {}; ignoring", frame.time);
            return;
        }

        let newest = self.history.peek(0);
        if frame.time == newest.timestamp {
            log::trace!("Skipping duplicate tick at t={:.4}", frame.time);
            return;
        }
        if frame.time < newest.timestamp {
            log::warn!(
                "Tick at t={:.4} precedes newest sample t={:.4}; ignoring",
                frame.time,
                newest.timestamp
            );
            return;
        }

        let accepted = frame
            .confident_pose()
            .copied()
            .filter(|pose| !self.is_stuck(pose));

        match accepted {
            None => {
                if self.consecutive_valid_frames > 0 {
                    log::debug!(
                        "Tracking gap at t={:.4} after {} valid frames",
                        frame.time,
                        self.consecutive_valid_frames
                    );
                }
                self.consecutive_valid_frames = 0;
            }
            Some(pose) => {
                if self.consecutive_valid_frames == 0 && self.last_time > newest.timestamp {
                    // Hold the last known pose until the previous tick so the
                    // first difference after a gap spans one tick, not the gap.
                    log::debug!(
                        "Re-seeding history at t={:.4} after tracking gap",
                        self.last_time
                    );
                    self.history.add(TimedPose::new(self.last_time, newest.pose));
                }

                self.consecutive_valid_frames += 1;
                self.last_position_fingerprint = Some(pose.position.norm_squared());
                self.history.add(TimedPose::new(frame.time, pose));
            }
        }

        self.last_time = frame.time;
    }

    fn is_stuck(&self, pose: &Pose) -> bool {
        self.last_position_fingerprint == Some(pose.position.norm_squared())
    }

    /// Ingest `frame` and estimate the velocities of `object_pose`, which is
    /// assumed rigidly attached to the tracked root.
    pub fn compute_release_velocity(
        &mut self,
        frame: &TrackingFrame,
        object_pose: &Pose,
    ) -> ReleaseVelocityInformation {
        self.process(frame);

        let root = frame.root_pose.unwrap_or_else(|| self.history.peek(0).pose);
        let offset = Pose::delta(&root, object_pose);

        let (linear_velocity, angular_velocity) =
            if self.consecutive_valid_frames < self.config.min_high_confidence_samples {
                log::debug!(
                    "Two-point release estimate ({} valid frames)",
                    self.consecutive_valid_frames
                );
                self.two_point_estimate(&offset)
            } else {
                self.robust_estimate(&offset)
            };

        let release = ReleaseVelocityInformation {
            linear_velocity,
            angular_velocity,
            position: object_pose.position,
            valid: true,
        };
        self.last_release = Some(release);
        release
    }

    /// Finite difference between the two newest history entries.
    fn two_point_estimate(&self, offset: &Pose) -> (Vec3, Vec3) {
        let newest = self.history.peek(0);
        let previous = self.history.peek(-1);

        let linear = linear_velocity_between(&previous, &newest, offset).unwrap_or_else(Vec3::zeros);
        let angular = angular_velocity_between(&previous, &newest, offset).unwrap_or_else(Vec3::zeros);
        (linear, angular)
    }

    fn robust_estimate(&mut self, offset: &Pose) -> (Vec3, Vec3) {
        let sample_count = self.config.sample_count;
        let dead_zone = self.config.dead_zone;

        let linear = run_robust_estimate(
            offset,
            sample_count,
            dead_zone,
            &mut self.rng,
            linear_sampler(&self.history),
            squared_distance_score,
        );
        let angular = run_robust_estimate(
            offset,
            sample_count,
            dead_zone,
            &mut self.rng,
            angular_sampler(&self.history),
            quaternion_dot_score,
        );

        match (linear, angular) {
            (Some(linear), Some(angular)) => (linear, angular),
            (linear, angular) => {
                log::debug!("RANSAC found no timed pair; falling back to two-point estimate");
                let (fallback_linear, fallback_angular) = self.two_point_estimate(offset);
                (
                    linear.unwrap_or(fallback_linear),
                    angular.unwrap_or(fallback_angular),
                )
            }
        }
    }

    pub fn consecutive_valid_frames(&self) -> usize {
        self.consecutive_valid_frames
    }

    pub fn history(&self) -> &PoseHistory {
        &self.history
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn last_release(&self) -> Option<&ReleaseVelocityInformation> {
        self.last_release.as_ref()
    }
}

impl ThrowVelocityCalculator for RansacVelocityEstimator {
    fn update_throw_state(&mut self, frame: &TrackingFrame) {
        self.process(frame);
    }

    fn calculate_throw_velocity(
        &mut self,
        frame: &TrackingFrame,
        object_pose: &Pose,
    ) -> ReleaseVelocityInformation {
        self.compute_release_velocity(frame, object_pose)
    }

    fn last_throw_velocities(&self) -> Option<&ReleaseVelocityInformation> {
        self.last_release()
    }
}
