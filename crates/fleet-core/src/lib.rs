//! `fleet-core` — foundational types for the fleet dispatch simulator.
//!
//! Every other `fleet-*` crate depends on this one.  It has no `fleet-*`
//! dependencies and minimal external ones (`rand`, `thiserror`, optional
//! `serde`).
//!
//! # What lives here
//!
//! | Module    | Contents                                                  |
//! |-----------|-----------------------------------------------------------|
//! | [`ids`]   | `NodeId`, `EdgeId`, `OrderId`, `WorkerId`, `ZoneId`       |
//! | [`geo`]   | `GeoPoint`, haversine distance, centroid                  |
//! | [`time`]  | `SimTime`, `SimClock`                                     |
//! | [`rng`]   | `SimRng`, named RNG streams                               |
//! | [`error`] | `ConfigError`, `ConfigResult`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{ConfigError, ConfigResult};
pub use geo::GeoPoint;
pub use ids::{EdgeId, NodeId, OrderId, WorkerId, ZoneId};
pub use rng::{RngStream, SimRng};
pub use time::{SimClock, SimTime};
