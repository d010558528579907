//! Seeded demand generation.
//!
//! # Draw order
//!
//! `generate(seed)` runs in two phases:
//!
//! 1. **Draw.**  Bucket counts come from the `DemandCount` stream.  Then, for
//!    each bucket in time order and each instance within it, the arrival
//!    offset comes from `DemandTime`, the origin waypoint from
//!    `DemandOrigin`, and the prep time from `PrepTime`.
//! 2. **Number.**  Drafts are stably sorted by arrival and numbered
//!    `OrderId(0..N)`, so id order is arrival order and ties keep draw
//!    order.
//!
//! The whole sequence is materialised before the run starts; nothing
//! downstream can perturb it.

use std::sync::Arc;

use rand::distributions::{Distribution, WeightedIndex};

use fleet_core::{ConfigError, NodeId, OrderId, RngStream, SimRng, SimTime};
use fleet_spatial::{TravelTimeOracle, WaypointNetwork};

use crate::{DemandError, DemandResult, Order, RateProfile};

/// Default service-level target: 30 minutes from order to hand-over.
pub const DEFAULT_SLA_SECS: u64 = 30 * 60;

// ── Config types ──────────────────────────────────────────────────────────────

/// Kitchen preparation time: `base_secs + U[0, jitter_secs]`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrepTime {
    pub base_secs:   u64,
    pub jitter_secs: u64,
}

impl PrepTime {
    pub fn fixed(secs: u64) -> Self {
        Self { base_secs: secs, jitter_secs: 0 }
    }
}

impl Default for PrepTime {
    fn default() -> Self {
        Self { base_secs: 8 * 60, jitter_secs: 4 * 60 }
    }
}

/// Customers keep playing while their order is made.
///
/// With drift configured, the hand-over waypoint is the origin advanced
/// `lead_secs / secs_per_waypoint` positions along the cyclic course.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CustomerDrift {
    /// Average time a group spends on one waypoint.
    pub secs_per_waypoint: u64,
    /// How far ahead the hand-over is planned.
    pub lead_secs:         u64,
}

impl CustomerDrift {
    pub fn steps(&self) -> usize {
        (self.lead_secs / self.secs_per_waypoint.max(1)) as usize
    }
}

/// Everything the generator needs besides the network.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DemandConfig {
    pub profile:        RateProfile,
    pub sla_secs:       u64,
    pub prep:           PrepTime,
    /// Relative order likelihood per course position; uniform when `None`.
    pub origin_weights: Option<Vec<f64>>,
    pub drift:          Option<CustomerDrift>,
}

impl DemandConfig {
    pub fn new(profile: RateProfile) -> Self {
        Self {
            profile,
            sla_secs:       DEFAULT_SLA_SECS,
            prep:           PrepTime::default(),
            origin_weights: None,
            drift:          None,
        }
    }

    pub fn sla_secs(mut self, secs: u64) -> Self {
        self.sla_secs = secs;
        self
    }

    pub fn prep(mut self, prep: PrepTime) -> Self {
        self.prep = prep;
        self
    }

    pub fn origin_weights(mut self, weights: Vec<f64>) -> Self {
        self.origin_weights = Some(weights);
        self
    }

    pub fn drift(mut self, drift: CustomerDrift) -> Self {
        self.drift = Some(drift);
        self
    }

    /// Check the config against the course it will draw from.
    pub fn validate(&self, course_len: usize) -> DemandResult<()> {
        self.profile.validate()?;
        if self.sla_secs == 0 {
            return Err(ConfigError::NonPositiveSla.into());
        }
        if let Some(d) = self.drift {
            if d.secs_per_waypoint == 0 {
                return Err(ConfigError::invalid("secs_per_waypoint", "must be positive").into());
            }
        }
        if let Some(w) = &self.origin_weights {
            if w.len() != course_len {
                return Err(ConfigError::LengthMismatch {
                    what:     "origin_weights",
                    expected: course_len,
                    got:      w.len(),
                }
                .into());
            }
            if w.iter().any(|x| !(x.is_finite() && *x >= 0.0)) {
                return Err(DemandError::OriginWeights("negative or non-finite weight".into()));
            }
            if w.iter().all(|&x| x == 0.0) {
                return Err(DemandError::OriginWeights("all weights are zero".into()));
            }
        }
        Ok(())
    }
}

// ── DemandGenerator ───────────────────────────────────────────────────────────

/// Produces the full order sequence of one replication from its seed.
///
/// Built once per scenario; `generate` takes `&self` and is safe to call
/// from many threads.
pub struct DemandGenerator {
    config:   DemandConfig,
    network:  Arc<WaypointNetwork>,
    /// Nearest kitchen for every node, indexed by `NodeId`.
    kitchen:  Vec<NodeId>,
    origin:   Option<WeightedIndex<f64>>,
}

impl DemandGenerator {
    pub fn new(
        config:  DemandConfig,
        network: Arc<WaypointNetwork>,
        oracle:  &TravelTimeOracle,
    ) -> DemandResult<Self> {
        config.validate(network.course().len())?;

        let origin = match &config.origin_weights {
            Some(w) => Some(
                WeightedIndex::new(w.iter().copied())
                    .map_err(|e| DemandError::OriginWeights(e.to_string()))?,
            ),
            None => None,
        };

        let depot = network.depot();
        let kitchen = (0..network.node_count())
            .map(|n| {
                oracle
                    .nearest_to(NodeId(n as u32), network.pickups())
                    .unwrap_or(depot)
            })
            .collect();

        Ok(Self { config, network, kitchen, origin })
    }

    pub fn config(&self) -> &DemandConfig {
        &self.config
    }

    /// Deterministically draw every order of replication `seed`.
    pub fn generate(&self, seed: u64) -> Vec<Order> {
        let mut count_rng  = SimRng::stream(seed, RngStream::DemandCount);
        let mut time_rng   = SimRng::stream(seed, RngStream::DemandTime);
        let mut origin_rng = SimRng::stream(seed, RngStream::DemandOrigin);
        let mut prep_rng   = SimRng::stream(seed, RngStream::PrepTime);

        let profile = &self.config.profile;
        let counts  = profile.sample_counts(&mut count_rng);
        let course  = self.network.course();
        let steps   = self.config.drift.map_or(0, |d| d.steps());
        let prep    = self.config.prep;

        let mut drafts: Vec<Order> = Vec::with_capacity(counts.iter().sum::<u32>() as usize);
        for (bucket, &count) in profile.buckets().iter().zip(&counts) {
            let width = bucket.width_secs();
            for _ in 0..count {
                let arrival = bucket.start.offset(time_rng.gen_range(0..width));

                let pos = match &self.origin {
                    Some(dist) => dist.sample(origin_rng.inner()),
                    None => origin_rng.gen_range(0..course.len()),
                };
                let origin      = course[pos];
                let destination = self.network.course_advance(origin, steps);

                let prep_secs = prep.base_secs + prep_rng.gen_range(0..=prep.jitter_secs);

                drafts.push(Order {
                    id: OrderId::INVALID,
                    arrival,
                    origin,
                    destination,
                    pickup: self.kitchen[destination.index()],
                    prep_secs,
                    deadline: arrival.offset(self.config.sla_secs),
                    zone: self.network.zone_of(destination),
                });
            }
        }

        // Stable: equal arrivals keep draw order.
        drafts.sort_by_key(|o| o.arrival);
        for (i, o) in drafts.iter_mut().enumerate() {
            o.id = OrderId(i as u32);
        }

        log::debug!(
            "seed {seed}: generated {} orders over {} buckets",
            drafts.len(),
            counts.len()
        );
        drafts
    }

    /// Latest arrival time any order can have.
    pub fn last_arrival(&self) -> SimTime {
        self.config.profile.end()
    }
}
