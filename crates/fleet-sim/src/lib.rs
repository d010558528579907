//! `fleet-sim` — discrete-event loop for the fleet dispatch simulator.
//!
//! # Event loop
//!
//! ```text
//! schedule service_window_close at the horizon, then one order_arrival per order
//! loop:
//!   pop the earliest (time, seq) event, advance the clock
//!   observer.on_event
//!   order_arrival        → policy decides; reject, or accept + prep_complete
//!   prep_complete        → owning worker leaves staging
//!   worker_departs       → next leg; worker_arrives scheduled
//!   worker_arrives       → pickups / drop-offs at the node; next departure
//!   service_window_close → open orders fail, loop stops
//! ```
//!
//! # Crate layout
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`scenario`] | `Scenario`, `ScenarioBuilder`                             |
//! | [`sim`]      | `Sim`, `RunLimits`, `RunStatus`                           |
//! | [`queue`]    | `EventQueue` (min-heap on `(time, seq)`)                  |
//! | [`event`]    | `Event`, `EventKind`                                      |
//! | [`state`]    | `SimulationState`, `OrderProgress`                        |
//! | [`observer`] | `SimObserver`, `NoopObserver`                             |
//! | [`recorder`] | `OutcomeRecorder`, `OutcomeRecord` and its parts          |
//! | [`error`]    | `SimError`, `SimResult<T>`                                |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! let scenario = Scenario::builder(Arc::new(network), RateProfile::hourly(&[10.0; 8])?)
//!     .worker_count(2)
//!     .sla_minutes(30)
//!     .build()?;
//! let record = fleet_sim::simulate(&scenario, 7)?;
//! println!("on time: {:.1}%", 100.0 * record.on_time_rate);
//! ```

pub mod error;
pub mod event;
pub mod observer;
pub mod queue;
pub mod recorder;
pub mod scenario;
pub mod sim;
pub mod state;


pub use error::{SimError, SimResult};
pub use event::{Event, EventKind};
pub use observer::{NoopObserver, SimObserver};
pub use queue::EventQueue;
pub use recorder::{
    FailureCounts, LatencySummary, OutcomeRecord, OutcomeRecorder, WorkerUtilization, ZoneStats,
};
pub use scenario::{Scenario, ScenarioBuilder};
pub use sim::{RunLimits, RunStatus, Sim};
pub use state::{OrderProgress, SimulationState};

/// Run replication `seed` of `scenario` to the end of its service window.
///
/// Identical inputs always produce identical records.
pub fn simulate(scenario: &Scenario, seed: u64) -> SimResult<OutcomeRecord> {
    let record = simulate_limited(scenario, seed, &RunLimits::default())?;
    // Without limits a run always completes.
    record.ok_or(SimError::Abandoned)
}

/// [`simulate`] under infrastructure limits.  Returns `Ok(None)` when the
/// replication was abandoned; its partial state is dropped.
pub fn simulate_limited(
    scenario: &Scenario,
    seed:     u64,
    limits:   &RunLimits,
) -> SimResult<Option<OutcomeRecord>> {
    let mut recorder = OutcomeRecorder::new(
        seed,
        scenario.worker_count(),
        scenario.network().zones().len(),
    );
    let mut sim = Sim::new(scenario, seed)?;
    match sim.run(&mut recorder, limits)? {
        RunStatus::Completed => Ok(Some(recorder.finish())),
        RunStatus::Abandoned => Ok(None),
    }
}
