//! Committed plans and their timelines.
//!
//! A worker's plan is an ordered list of [`Stop`]s.  [`timeline`] replays a
//! plan from an [`Anchor`] with exactly the rules the worker uses when it
//! executes the plan:
//!
//! ```text
//! arrive(k)  = leave(k-1) + time(node(k-1), node(k))
//! pickup:    done(k) = max(arrive(k), ready)      leave(k) = done(k)
//! drop-off:  done(k) = arrive(k)                  leave(k) = done(k) + handoff
//! ```
//!
//! Because execution and evaluation agree, the drop-off time computed when
//! an order is accepted is the time it is actually delivered, unless a later
//! insertion delays it (which the policy bounds).

use fleet_core::{NodeId, OrderId, SimTime};
use fleet_spatial::TravelTime;

// ── Stop ──────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopKind {
    /// Collect the order from its kitchen once it is ready.
    Pickup { ready: SimTime },
    /// Hand the order over; promised by `deadline`.
    Dropoff { deadline: SimTime },
}

/// One pending visit in a worker's plan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stop {
    pub order: OrderId,
    pub node:  NodeId,
    pub kind:  StopKind,
}

impl Stop {
    pub fn pickup(order: OrderId, node: NodeId, ready: SimTime) -> Self {
        Self { order, node, kind: StopKind::Pickup { ready } }
    }

    pub fn dropoff(order: OrderId, node: NodeId, deadline: SimTime) -> Self {
        Self { order, node, kind: StopKind::Dropoff { deadline } }
    }

    #[inline]
    pub fn is_pickup(&self) -> bool {
        matches!(self.kind, StopKind::Pickup { .. })
    }

    #[inline]
    pub fn is_dropoff(&self) -> bool {
        matches!(self.kind, StopKind::Dropoff { .. })
    }
}

// ── Anchor ────────────────────────────────────────────────────────────────────

/// Where and when a worker is next free to act on its plan.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Anchor {
    pub node: NodeId,
    pub time: SimTime,
}

// ── Timeline ──────────────────────────────────────────────────────────────────

/// Completion time of every stop of `stops`, walked from `anchor`.
///
/// A pickup completes when the worker leaves with the order; a drop-off
/// completes at hand-over.
pub fn timeline(
    anchor:       Anchor,
    stops:        &[Stop],
    travel:       &dyn TravelTime,
    handoff_secs: u64,
) -> Vec<SimTime> {
    let mut out  = Vec::with_capacity(stops.len());
    let mut node = anchor.node;
    let mut t    = anchor.time;
    for s in stops {
        let arrive = t + travel.time(node, s.node);
        match s.kind {
            StopKind::Pickup { ready } => {
                let done = arrive.max(ready);
                out.push(done);
                t = done;
            }
            StopKind::Dropoff { .. } => {
                out.push(arrive);
                t = arrive + handoff_secs;
            }
        }
        node = s.node;
    }
    out
}

/// `true` if carrying `onboard` orders into `stops` never exceeds
/// `capacity`.
pub fn within_capacity(stops: &[Stop], onboard: u32, capacity: u32) -> bool {
    let mut load = onboard;
    for s in stops {
        if s.is_pickup() {
            load += 1;
            if load > capacity {
                return false;
            }
        } else {
            load = load.saturating_sub(1);
        }
    }
    true
}

/// `plan` with a pickup spliced in at `pickup_at` and a drop-off at
/// `dropoff_at`.  Both indices refer to the resulting plan, so
/// `pickup_at < dropoff_at ≤ plan.len() + 1`.
pub fn with_insertion(
    plan:       &[Stop],
    pickup:     Stop,
    pickup_at:  usize,
    dropoff:    Stop,
    dropoff_at: usize,
) -> Vec<Stop> {
    debug_assert!(pickup_at < dropoff_at && dropoff_at <= plan.len() + 1);
    let mut out = Vec::with_capacity(plan.len() + 2);
    out.extend_from_slice(&plan[..pickup_at]);
    out.push(pickup);
    out.extend_from_slice(&plan[pickup_at..dropoff_at - 1]);
    out.push(dropoff);
    out.extend_from_slice(&plan[dropoff_at - 1..]);
    out
}

/// `true` if completion times never decrease along the plan.
pub fn is_monotone(times: &[SimTime]) -> bool {
    times.windows(2).all(|w| w[0] <= w[1])
}
