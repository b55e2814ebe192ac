//! Linear algebra type system for the release velocity estimator
//!
//! Provides clean type aliases and the default algorithm dimensions
//! shared by the pose history and the RANSAC sampler.

use nalgebra::{UnitQuaternion, Vector3};

// ===== Default Estimator Dimensions =====
pub const SAMPLE_COUNT: usize = 8; // S: historical samples fed to RANSAC
pub const DEAD_ZONE: usize = 2; // D: slots skipped ahead of the sampled range
pub const MIN_HIGH_CONFIDENCE_SAMPLES: usize = 2;
pub const HISTORY_CAPACITY: usize = SAMPLE_COUNT + DEAD_ZONE; // 10

// ===== Configuration Limits =====
pub const MAX_SAMPLE_COUNT: usize = 256; // keeps the S×S table small
pub const MAX_HISTORY_CAPACITY: usize = 4096;

// ===== Geometry Types =====
pub type Vec3 = Vector3<f64>;
pub type Rotation = UnitQuaternion<f64>;

// ===== RANSAC Scratch Types =====
/// One pairwise sample; `None` when the two slots share a timestamp.
pub type PairSample = Option<Vec3>;

/// Row-major S×S upper-triangular table, rebuilt on every estimate.
pub type SamplesTable = Vec<PairSample>;
