use thiserror::Error;

use fleet_core::{ConfigError, SimTime};
use fleet_demand::DemandError;
use fleet_spatial::SpatialError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("scenario configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("waypoint network error: {0}")]
    Spatial(#[from] SpatialError),

    #[error("demand configuration error: {0}")]
    Demand(#[from] DemandError),

    /// Engine invariant violation: a handler tried to schedule into the past.
    #[error("event scheduled at {at} but the clock already reads {now}")]
    PastEvent { now: SimTime, at: SimTime },

    #[error("replication abandoned before the service window closed")]
    Abandoned,
}

impl SimError {
    /// `true` for errors raised while validating a scenario, before any
    /// replication runs.
    pub fn is_config(&self) -> bool {
        !matches!(self, SimError::PastEvent { .. } | SimError::Abandoned)
    }
}

pub type SimResult<T> = Result<T, SimError>;
