//! `fleet-replicate` — many seeds, one answer.
//!
//! A staffing decision should not rest on one noisy replication.  This crate
//! runs a scenario once per seed, discards runs that blow the wall-clock
//! budget, and reduces the rest into means, spreads and a Wilson lower bound
//! on the on-time rate.
//!
//! | Module         | Contents                                            |
//! |----------------|-----------------------------------------------------|
//! | [`replicator`] | `Replicator`, `AggregatedOutcome`                   |
//! | [`stats`]      | `MetricSummary`, `WilsonInterval`                   |
//! | [`error`]      | `ReplicateError`, `ReplicateResult<T>`              |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                              |
//! |------------|-----------------------------------------------------|
//! | `parallel` | Runs replications on Rayon's thread pool.           |
//! | `serde`    | `Serialize`/`Deserialize` on the aggregate types.   |

pub mod error;
pub mod replicator;
pub mod stats;

#[cfg(test)]
mod tests;

pub use error::{ReplicateError, ReplicateResult};
pub use replicator::{AggregatedOutcome, DEFAULT_CONFIDENCE_Z, Replicator};
pub use stats::{MetricSummary, WilsonInterval};

use fleet_sim::Scenario;

/// Replicate `scenario` once per seed with default settings (no timeout,
/// 95 % interval, the scenario's own policy).
pub fn replicate(scenario: &Scenario, seeds: &[u64]) -> ReplicateResult<AggregatedOutcome> {
    Replicator::new().run(scenario, seeds)
}
