use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{VelocityError, VelocityResult};
use crate::types::{
    DEAD_ZONE, MAX_HISTORY_CAPACITY, MAX_SAMPLE_COUNT, MIN_HIGH_CONFIDENCE_SAMPLES, SAMPLE_COUNT,
};

/// Tuning for the RANSAC release velocity estimator.
///
/// Any field missing from a JSON config keeps its default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Historical slots sampled by RANSAC (S)
    pub sample_count: usize,
    /// Slots skipped ahead of the sampled range (D)
    pub dead_zone: usize,
    /// Consecutive valid frames required before RANSAC is trusted
    pub min_high_confidence_samples: usize,
    /// Fixed RNG seed; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            sample_count: SAMPLE_COUNT,
            dead_zone: DEAD_ZONE,
            min_high_confidence_samples: MIN_HIGH_CONFIDENCE_SAMPLES,
            seed: None,
        }
    }
}

impl EstimatorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Pose history length backing the sampled range, [`HISTORY_CAPACITY`]
    /// for the defaults. Saturates on configs that [`validate`](Self::validate) rejects.
    ///
    /// [`HISTORY_CAPACITY`]: crate::types::HISTORY_CAPACITY
    pub fn history_capacity(&self) -> usize {
        self.sample_count.saturating_add(self.dead_zone)
    }

    pub fn validate(&self) -> VelocityResult<()> {
        if self.sample_count < 2 {
            return Err(VelocityError::InvalidConfig(format!(
                "sample_count must be at least 2 to form a pair (got {})",
                self.sample_count
            )));
        }
        if self.sample_count > MAX_SAMPLE_COUNT {
            return Err(VelocityError::InvalidConfig(format!(
                "sample_count must be at most {} (got {})",
                MAX_SAMPLE_COUNT, self.sample_count
            )));
        }
        match self.sample_count.checked_add(self.dead_zone) {
            Some(capacity) if capacity <= MAX_HISTORY_CAPACITY => {}
            _ => {
                return Err(VelocityError::InvalidConfig(format!(
                    "sample_count + dead_zone must be at most {} (got {} + {})",
                    MAX_HISTORY_CAPACITY, self.sample_count, self.dead_zone
                )));
            }
        }
        if self.min_high_confidence_samples == 0 {
            return Err(VelocityError::InvalidConfig(
                "min_high_confidence_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> VelocityResult<Self> {
        let file = File::open(path)
            .map_err(|e| VelocityError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        let config: EstimatorConfig = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| VelocityError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HISTORY_CAPACITY;

    #[test]
    fn test_defaults_match_reference_dimensions() {
        let config = EstimatorConfig::default();
        assert_eq!(config.sample_count, 8);
        assert_eq!(config.dead_zone, 2);
        assert_eq!(config.min_high_confidence_samples, 2);
        assert_eq!(config.history_capacity(), HISTORY_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: EstimatorConfig = serde_json::from_str(r#"{ "dead_zone": 3, "seed": 7 }"#).unwrap();
        assert_eq!(config.sample_count, 8);
        assert_eq!(config.dead_zone, 3);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.history_capacity(), 11);
    }

    #[test]
    fn test_rejects_degenerate_sample_count() {
        let config = EstimatorConfig {
            sample_count: 1,
            ..EstimatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(VelocityError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_zero_confidence_threshold() {
        let config = EstimatorConfig {
            min_high_confidence_samples: 0,
            ..EstimatorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_sample_count() {
        let config = EstimatorConfig {
            sample_count: MAX_SAMPLE_COUNT + 1,
            ..EstimatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(VelocityError::InvalidConfig(_))));

        let at_limit = EstimatorConfig {
            sample_count: MAX_SAMPLE_COUNT,
            ..EstimatorConfig::default()
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_rejects_overflowing_dead_zone() {
        let config: EstimatorConfig =
            serde_json::from_str(r#"{ "dead_zone": 18446744073709551615 }"#).unwrap();
        assert!(matches!(config.validate(), Err(VelocityError::InvalidConfig(_))));
        assert_eq!(config.history_capacity(), usize::MAX);
    }

    #[test]
    fn test_rejects_oversized_history() {
        let config = EstimatorConfig {
            dead_zone: MAX_HISTORY_CAPACITY,
            ..EstimatorConfig::default()
        };
        assert!(matches!(config.validate(), Err(VelocityError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = EstimatorConfig::from_json_file(Path::new("/nonexistent/estimator.json"));
        assert!(matches!(result, Err(VelocityError::InvalidConfig(_))));
    }
}
