//! Configuration error type.
//!
//! Configuration errors are the only hard failures the engine reports to its
//! caller.  They are raised before any replication starts and are never
//! papered over with defaults.  Per-order outcomes (rejections, closed
//! service windows) are data, not errors, and live in `fleet-demand`.

use thiserror::Error;

use crate::NodeId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("service-level target must be positive")]
    NonPositiveSla,

    #[error("rate profile has no buckets")]
    EmptyRateProfile,

    #[error("rate bucket {index}: {reason}")]
    InvalidBucket { index: usize, reason: String },

    #[error("rate bucket {index} starts before the previous bucket ends")]
    OverlappingBuckets { index: usize },

    #[error("{what} has {got} entries, expected {expected}")]
    LengthMismatch {
        what:     &'static str,
        expected: usize,
        got:      usize,
    },

    #[error("node {0} is not part of the network")]
    UnknownNode(NodeId),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidParameter`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter { name, reason: reason.into() }
    }
}

/// Shorthand result type for configuration-time validation.
pub type ConfigResult<T> = Result<T, ConfigError>;
