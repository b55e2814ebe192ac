//! Robust release (throw) velocity estimation from a short history of
//! tracked poses.
//!
//! A host feeds one [`TrackingFrame`] per tick into a
//! [`RansacVelocityEstimator`] and asks for a
//! [`ReleaseVelocityInformation`] when the held object is let go.

pub mod calculator;
pub mod config;
pub mod error;
pub mod estimator;
pub mod history;
pub mod ransac;
pub mod trace;
pub mod types;

pub use calculator::ThrowVelocityCalculator;
pub use config::EstimatorConfig;
pub use error::{VelocityError, VelocityResult};
pub use estimator::RansacVelocityEstimator;
pub use history::PoseHistory;
pub use types::{Pose, ReleaseVelocityInformation, TimedPose, TrackingFrame};
