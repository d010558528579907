//! `fleet-demand` — orders and the seeded demand generator.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                  |
//! |---------------|-----------------------------------------------------------|
//! | [`order`]     | `Order`, `OrderStatus`, `FailureReason`                   |
//! | [`profile`]   | `RateProfile`, `RateBucket`, `CountSampling`              |
//! | [`generator`] | `DemandConfig`, `PrepTime`, `CustomerDrift`, `DemandGenerator` |
//! | [`error`]     | `DemandError`, `DemandResult<T>`                          |
//!
//! # Determinism
//!
//! Every random concern draws from its own named stream of the replication
//! seed (see `fleet_core::rng`), so `generate(seed)` returns an identical
//! `Vec<Order>` every time it is called with the same seed.

pub mod error;
pub mod generator;
pub mod order;
pub mod profile;

#[cfg(test)]
mod tests;

pub use error::{DemandError, DemandResult};
pub use generator::{CustomerDrift, DEFAULT_SLA_SECS, DemandConfig, DemandGenerator, PrepTime};
pub use order::{FailureReason, Order, OrderStatus};
pub use profile::{CountSampling, RateBucket, RateProfile};
