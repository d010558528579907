//! `fleet-dispatch` — workers, their plans, and the dispatch policies that
//! extend those plans.
//!
//! # Crate layout
//!
//! | Module     | Contents                                                     |
//! |------------|--------------------------------------------------------------|
//! | [`worker`] | `Worker`, `WorkerState`, `Leg`, `Effect`                     |
//! | [`plan`]   | `Stop`, `StopKind`, `Anchor`, timeline evaluation            |
//! | [`policy`] | `DispatchPolicy`, `MinAddedLatency`, `AppendOnly`, `Decision` |
//! | [`config`] | `DispatchConfig`                                             |
//!
//! # Ownership
//!
//! A worker is the only mutator of its plan.  Policies read the fleet and
//! return a [`Proposal`]; the simulation hands it back to the chosen worker,
//! which commits it in one step via [`Worker::accept`].

pub mod config;
pub mod plan;
pub mod policy;
pub mod worker;

#[cfg(test)]
mod tests;

pub use config::DispatchConfig;
pub use plan::{Anchor, Stop, StopKind};
pub use policy::{
    AppendOnly, Decision, DispatchContext, DispatchPolicy, Divert, MinAddedLatency, Proposal,
    stops_for,
};
pub use worker::{Effect, Leg, Worker, WorkerState};
