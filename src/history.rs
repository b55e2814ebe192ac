use std::ops::Index;

use crate::error::{VelocityError, VelocityResult};
use crate::types::{Pose, TimedPose};

/// Fixed-capacity circular history of timed poses.
///
/// Every slot is populated from construction on, so lookback never
/// reads an empty slot. Inserting overwrites the oldest entry.
#[derive(Clone, Debug)]
pub struct PoseHistory {
    slots: Vec<TimedPose>,
    /// Slot holding the most recent insertion
    head: usize,
}

impl PoseHistory {
    /// Create a history of `capacity` slots, each holding `default_pose` at `current_time`
    pub fn new(capacity: usize, default_pose: Pose, current_time: f64) -> VelocityResult<Self> {
        if capacity == 0 {
            return Err(VelocityError::InvalidCapacity(capacity));
        }

        Ok(PoseHistory {
            slots: vec![TimedPose::new(current_time, default_pose); capacity],
            head: capacity - 1,
        })
    }

    pub fn add(&mut self, sample: TimedPose) {
        self.head = (self.head + 1) % self.slots.len();
        self.slots[self.head] = sample;
    }

    /// Look back from the newest sample: 0 = newest, -1 = the one before, ...
    /// Any offset wraps modulo capacity.
    pub fn peek(&self, offset: isize) -> TimedPose {
        let capacity = self.slots.len() as isize;
        let slot = (self.head as isize + offset).rem_euclid(capacity);
        self.slots[slot as usize]
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Samples ordered oldest to newest
    pub fn iter_chronological(&self) -> impl Iterator<Item = &TimedPose> + '_ {
        let start = (self.head + 1) % self.slots.len();
        self.slots[start..].iter().chain(self.slots[..start].iter())
    }
}

/// Raw slot access, independent of insertion order.
impl Index<usize> for PoseHistory {
    type Output = TimedPose;

    fn index(&self, index: usize) -> &TimedPose {
        &self.slots[index % self.slots.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;

    fn sample(i: usize) -> TimedPose {
        TimedPose::new(i as f64, Pose::from_position(Vec3::new(i as f64, 0.0, 0.0)))
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = PoseHistory::new(0, Pose::identity(), 0.0);
        assert_eq!(result.unwrap_err(), VelocityError::InvalidCapacity(0));
    }

    #[test]
    fn test_prefilled_with_default() {
        let history = PoseHistory::new(4, Pose::identity(), 2.5).unwrap();
        for offset in -6..6 {
            let slot = history.peek(offset);
            assert_eq!(slot.timestamp, 2.5);
            assert_eq!(slot.pose, Pose::identity());
        }
    }

    #[test]
    fn test_peek_newest_first() {
        let mut history = PoseHistory::new(5, Pose::identity(), -1.0).unwrap();
        history.add(sample(1));
        history.add(sample(2));

        assert_eq!(history.peek(0), sample(2));
        assert_eq!(history.peek(-1), sample(1));
        assert_eq!(history.peek(-2).timestamp, -1.0);
    }

    #[test]
    fn test_wraparound_keeps_latest_capacity() {
        let capacity = 6;
        let mut history = PoseHistory::new(capacity, Pose::identity(), -1.0).unwrap();
        for i in 0..2 * capacity {
            history.add(sample(i));
            assert_eq!(history.peek(0), sample(i));
        }

        let newest = 2 * capacity - 1;
        let oldest = newest - (capacity - 1);
        assert_eq!(history.peek(-(capacity as isize - 1)), sample(oldest));

        // Nothing older than `capacity` inserts back survives
        assert!(history
            .iter_chronological()
            .all(|s| s.timestamp >= oldest as f64));
    }

    #[test]
    fn test_peek_wraps_any_offset() {
        let mut history = PoseHistory::new(3, Pose::identity(), -1.0).unwrap();
        for i in 0..3 {
            history.add(sample(i));
        }
        assert_eq!(history.peek(3), history.peek(0));
        assert_eq!(history.peek(-4), history.peek(-1));
        assert_eq!(history.peek(1), sample(0));
        assert_eq!(history.peek(-300), history.peek(0));
    }

    #[test]
    fn test_index_is_raw_slot() {
        let mut history = PoseHistory::new(3, Pose::identity(), -1.0).unwrap();
        for i in 0..4 {
            history.add(sample(i));
        }
        // Slot 0 was overwritten by the fourth insert
        assert_eq!(history[0], sample(3));
        assert_eq!(history[1], sample(1));
        assert_eq!(history[5], history[2]);
    }

    #[test]
    fn test_iter_chronological_order() {
        let mut history = PoseHistory::new(4, Pose::identity(), -1.0).unwrap();
        for i in 0..6 {
            history.add(sample(i));
        }
        let times: Vec<f64> = history.iter_chronological().map(|s| s.timestamp).collect();
        assert_eq!(times, vec![2.0, 3.0, 4.0, 5.0]);
    }
}
