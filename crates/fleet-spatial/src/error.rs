//! Spatial-subsystem error type.
//!
//! Every variant is a configuration error: a bad network is rejected before
//! any replication runs.

use thiserror::Error;

use fleet_core::{ConfigError, NodeId};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpatialError {
    #[error("node {0} not found in network")]
    NodeNotFound(NodeId),

    #[error("network has no depot")]
    MissingDepot,

    #[error("course sequence is empty")]
    EmptyCourse,

    #[error("node {0} appears more than once in the course sequence")]
    DuplicateCourseNode(NodeId),

    #[error("depot {0} must not be part of the course sequence")]
    DepotOnCourse(NodeId),

    #[error("too many zones: {0} (max {})", u16::MAX)]
    TooManyZones(usize),

    #[error("network is disconnected: no path from {from} to {to}")]
    Disconnected { from: NodeId, to: NodeId },

    #[error("triangle inequality violated: {a}→{c} exceeds {a}→{b}→{c} by {excess_secs} s")]
    TriangleViolation {
        a:           NodeId,
        b:           NodeId,
        c:           NodeId,
        excess_secs: u64,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type SpatialResult<T> = Result<T, SpatialError>;
