//! Fleet and dispatch tunables.

use fleet_core::{ConfigError, ConfigResult};

/// Knobs shared by the worker state machine and the dispatch policies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DispatchConfig {
    /// Maximum orders one worker may hold (assigned, not yet delivered).
    /// Once every worker is at the ceiling, new orders are rejected as
    /// `queue_saturated`.
    pub queue_ceiling: u32,

    /// Maximum orders a worker carries at once.
    pub capacity: u32,

    /// Time spent handing an order over before the worker can move on.
    pub handoff_secs: u64,

    /// Reject orders whose best ETA misses their own deadline.  When
    /// `false`, such orders are accepted and delivered late.
    pub reject_late: bool,

    /// Let a worker heading back to the depot divert at the next waypoint
    /// when that is strictly cheaper than finishing the return first.
    pub retask_while_returning: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_ceiling:          4,
            capacity:               1,
            handoff_secs:           0,
            reject_late:            true,
            retask_while_returning: true,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.queue_ceiling == 0 {
            return Err(ConfigError::invalid("queue_ceiling", "must be at least 1"));
        }
        if self.capacity == 0 {
            return Err(ConfigError::invalid("capacity", "must be at least 1"));
        }
        Ok(())
    }
}
