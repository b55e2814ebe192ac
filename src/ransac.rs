//! Simplified RANSAC over pairwise velocity samples.
//!
//! A pose history yields one velocity (or angular velocity) sample for
//! every pair of historical slots. Rather than fitting a model with an
//! inlier threshold, a handful of pairs are drawn at random and the one
//! closest to all other pairs (lowest aggregate score) wins. With S fixed
//! at 8 the whole estimate is a few hundred vector operations.

use rand::Rng;

use crate::history::PoseHistory;
use crate::types::{PairSample, Pose, Rotation, SamplesTable, TimedPose, Vec3};

/// Turns an offset and two raw history slots into one sample.
pub trait Sampler: Fn(&Pose, usize, usize) -> PairSample {}
impl<F: Fn(&Pose, usize, usize) -> PairSample> Sampler for F {}

/// Distance between a candidate and another table entry; lower is closer.
pub trait Scorer: Fn(&Vec3, &Vec3) -> f64 {}
impl<F: Fn(&Vec3, &Vec3) -> f64> Scorer for F {}

/// Order two samples by recorded time, oldest first.
///
/// Slots map to physical buffer positions, so after wraparound a larger
/// slot index is not necessarily the younger sample.
fn chronological<'a>(a: &'a TimedPose, b: &'a TimedPose) -> (&'a TimedPose, &'a TimedPose) {
    if a.timestamp <= b.timestamp {
        (a, b)
    } else {
        (b, a)
    }
}

/// Elapsed time between two ordered samples, `None` when there is none.
fn elapsed(older: &TimedPose, younger: &TimedPose) -> Option<f64> {
    let dt = younger.timestamp - older.timestamp;
    (dt > 0.0 && dt.is_finite()).then_some(dt)
}

/// Finite-difference velocity of the point `offset` rigidly attached to the tracked root.
pub fn linear_velocity_between(a: &TimedPose, b: &TimedPose, offset: &Pose) -> PairSample {
    let (older, younger) = chronological(a, b);
    let dt = elapsed(older, younger)?;
    let from = older.pose.transform_point(&offset.position);
    let to = younger.pose.transform_point(&offset.position);
    Some((to - from) / dt)
}

/// Angular velocity as a scaled axis [rad/s] from the relative rotation of two samples.
pub fn angular_velocity_between(a: &TimedPose, b: &TimedPose, offset: &Pose) -> PairSample {
    let (older, younger) = chronological(a, b);
    let dt = elapsed(older, younger)?;
    let from = older.pose.rotation * offset.rotation;
    let to = younger.pose.rotation * offset.rotation;
    let delta: Rotation = to * from.inverse();
    Some(delta.scaled_axis() / dt)
}

pub fn linear_sampler(history: &PoseHistory) -> impl Sampler + '_ {
    move |offset: &Pose, i: usize, j: usize| linear_velocity_between(&history[i], &history[j], offset)
}

pub fn angular_sampler(history: &PoseHistory) -> impl Sampler + '_ {
    move |offset: &Pose, i: usize, j: usize| angular_velocity_between(&history[i], &history[j], offset)
}

/// Squared Euclidean distance
pub fn squared_distance_score(a: &Vec3, b: &Vec3) -> f64 {
    (a - b).norm_squared()
}

/// Absolute dot product of the rotations whose scaled axes are `a` and `b`.
///
/// Unlike [`squared_distance_score`] this grows with similarity, so
/// minimising it prefers the candidate least like the others.
pub fn quaternion_dot_score(a: &Vec3, b: &Vec3) -> f64 {
    let qa = Rotation::from_scaled_axis(*a);
    let qb = Rotation::from_scaled_axis(*b);
    qa.coords.dot(&qb.coords).abs()
}

/// Build the upper-triangular table of pairwise samples for slots `[dead_zone, dead_zone + sample_count)`.
pub fn build_samples_table<S: Sampler>(
    offset: &Pose,
    sample_count: usize,
    dead_zone: usize,
    sampler: &S,
) -> SamplesTable {
    let mut table: SamplesTable = vec![None; sample_count * sample_count];
    for i in 0..sample_count {
        for j in (i + 1)..sample_count {
            table[i * sample_count + j] = sampler(offset, i + dead_zone, j + dead_zone);
        }
    }
    table
}

/// Draw a pair `(y, x)` with `y < x < sample_count`, uniform over the upper triangle.
fn draw_pair<R: Rng>(rng: &mut R, sample_count: usize) -> (usize, usize) {
    let pair_count = sample_count * (sample_count - 1) / 2;
    let mut k = rng.gen_range(0..pair_count);
    let mut x = 1;
    while k >= x {
        k -= x;
        x += 1;
    }
    (k, x)
}

/// Best-of-`sample_count` robust estimate.
///
/// Returns `None` when every drawn candidate is missing (all drawn pairs
/// shared a timestamp); callers fall back to a two-point estimate.
pub fn run_robust_estimate<R, S, C>(
    offset: &Pose,
    sample_count: usize,
    dead_zone: usize,
    rng: &mut R,
    sampler: S,
    scorer: C,
) -> Option<Vec3>
where
    R: Rng,
    S: Sampler,
    C: Scorer,
{
    if sample_count < 2 {
        return None;
    }

    let table = build_samples_table(offset, sample_count, dead_zone, &sampler);

    let mut best: Option<(f64, Vec3)> = None;
    for _ in 0..sample_count {
        let (y, x) = draw_pair(rng, sample_count);
        let candidate_index = y * sample_count + x;
        let Some(candidate) = table[candidate_index] else {
            continue;
        };

        let score: f64 = table
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != candidate_index)
            .filter_map(|(_, entry)| entry.as_ref())
            .map(|entry| scorer(&candidate, entry))
            .sum();

        if best.map_or(true, |(best_score, _)| score < best_score) {
            best = Some((score, candidate));
        }
    }

    if let Some((score, value)) = best {
        log::trace!("RANSAC picked {:?} (score {:.4})", value.as_slice(), score);
    }
    best.map(|(_, value)| value)
}
