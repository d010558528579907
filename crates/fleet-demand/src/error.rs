use thiserror::Error;

use fleet_core::ConfigError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DemandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("origin weights are unusable: {0}")]
    OriginWeights(String),
}

pub type DemandResult<T> = Result<T, DemandError>;
