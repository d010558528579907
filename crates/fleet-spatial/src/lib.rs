//! `fleet-spatial` — the waypoint network and the travel-time oracle.
//!
//! # Crate layout
//!
//! | Module      | Contents                                                     |
//! |-------------|--------------------------------------------------------------|
//! | [`network`] | `WaypointNetwork` (CSR + course + zones), its builder        |
//! | [`oracle`]  | `TravelTime` trait, `TravelTimeOracle`, `CostModel`          |
//! | [`error`]   | `SpatialError`, `SpatialResult<T>`                           |
//!
//! The network is built once per scenario by an external builder and is
//! read-only afterwards.  The oracle precomputes every pairwise travel time
//! once; both are shared across replications behind an `Arc`.

pub mod error;
pub mod network;
pub mod oracle;


pub use error::{SpatialError, SpatialResult};
pub use network::{WaypointNetwork, WaypointNetworkBuilder, Zone};
pub use oracle::{CostModel, TravelTime, TravelTimeOracle};
