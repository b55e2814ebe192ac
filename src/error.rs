use thiserror::Error;

/// Release velocity error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VelocityError {
    #[error("Pose history capacity must be at least 1 (got {0})")]
    InvalidCapacity(usize),

    #[error("Invalid estimator configuration: {0}")]
    InvalidConfig(String),

    #[error("Trace error: {0}")]
    Trace(String),
}

/// Result type for estimator operations
pub type VelocityResult<T> = Result<T, VelocityError>;
