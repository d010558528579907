use thiserror::Error;

use fleet_core::ConfigError;
use fleet_sim::SimError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReplicateError {
    #[error("no seeds given")]
    NoSeeds,

    #[error("replication settings: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sim(#[from] SimError),

    /// Every replication hit the wall-clock limit; nothing to aggregate.
    #[error("all {timed_out} replications timed out")]
    AllTimedOut { timed_out: u32 },
}

pub type ReplicateResult<T> = Result<T, ReplicateError>;
