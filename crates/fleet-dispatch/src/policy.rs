//! Admission control and assignment.
//!
//! Every arriving order gets exactly one [`Decision`]:
//!
//! 1. **Admission.**  If every worker already holds `queue_ceiling` orders
//!    the order is rejected as `queue_saturated`.
//! 2. **Assignment.**  The policy searches the non-saturated workers for the
//!    cheapest feasible insertion.  None feasible ⇒ `eta_exceeded`.
//!
//! # Cost and feasibility
//!
//! For a candidate plan, with `old(k)` the current drop-off time of a
//! committed order `k` and `new(k)` its time after the insertion:
//!
//! ```text
//! cost      = Σ_k (new(k) − old(k))  +  (eta − now)
//! feasible  ⇔ ∀k: new(k) ≤ max(deadline(k), old(k))
//!             ∧ (reject_late ⇒ eta ≤ deadline)
//! ```
//!
//! Ties go to the lowest worker id, then the earliest insertion position.

use fleet_core::{NodeId, SimTime, WorkerId};
use fleet_demand::{FailureReason, Order};
use fleet_spatial::TravelTime;

use crate::DispatchConfig;
use crate::plan::{self, Anchor, Stop};
use crate::worker::Worker;

// ── Decision types ────────────────────────────────────────────────────────────

/// Cut a return trip short at `node`, reached at `arrive`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Divert {
    pub node:   NodeId,
    pub arrive: SimTime,
}

/// A proposed insertion, accepted atomically by [`Worker::accept`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub worker:     WorkerId,
    /// Index of the new pickup in the resulting plan.
    pub pickup_at:  usize,
    /// Index of the new drop-off in the resulting plan.
    pub dropoff_at: usize,
    /// Set when a returning worker is re-tasked mid-trip.
    pub divert:     Option<Divert>,
    /// Planned delivery time of the new order.
    pub eta:        SimTime,
    pub cost:       u64,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    Assign(Proposal),
    Reject(FailureReason),
}

/// Read-only inputs shared by every decision of one replication.
#[derive(Copy, Clone)]
pub struct DispatchContext<'a> {
    pub travel: &'a dyn TravelTime,
    pub config: &'a DispatchConfig,
}

/// The pickup and drop-off stops serving `order`, prep finishing at `ready`.
pub fn stops_for(order: &Order, ready: SimTime) -> (Stop, Stop) {
    (
        Stop::pickup(order.id, order.pickup, ready),
        Stop::dropoff(order.id, order.destination, order.deadline),
    )
}

// ── DispatchPolicy ────────────────────────────────────────────────────────────

/// Pluggable dispatch decision.
///
/// Implementations must be deterministic: the same order and fleet state
/// always yield the same decision.  They are shared across replication
/// threads, hence `Send + Sync`.
pub trait DispatchPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Decide the fate of `order`, whose prep would finish at `ready` if it
    /// were accepted at `now`.
    fn decide(
        &self,
        order: &Order,
        ready: SimTime,
        now:   SimTime,
        fleet: &[Worker],
        ctx:   &DispatchContext<'_>,
    ) -> Decision;
}

/// `true` when no worker can take another order.
pub fn is_saturated(fleet: &[Worker], config: &DispatchConfig) -> bool {
    fleet.iter().all(|w| w.held() >= config.queue_ceiling)
}

// ── MinAddedLatency ───────────────────────────────────────────────────────────

/// Minimum-added-latency insertion over every pickup/drop-off position pair
/// of every worker's plan.
#[derive(Copy, Clone, Debug, Default)]
pub struct MinAddedLatency;

impl DispatchPolicy for MinAddedLatency {
    fn name(&self) -> &'static str {
        "min_added_latency"
    }

    fn decide(
        &self,
        order: &Order,
        ready: SimTime,
        now:   SimTime,
        fleet: &[Worker],
        ctx:   &DispatchContext<'_>,
    ) -> Decision {
        decide_with(order, ready, now, fleet, ctx, Positions::Anywhere)
    }
}

// ── AppendOnly ────────────────────────────────────────────────────────────────

/// Baseline: new stops always go to the end of a plan and no return trip is
/// cut short.  The worker that would finish the order earliest wins.
#[derive(Copy, Clone, Debug, Default)]
pub struct AppendOnly;

impl DispatchPolicy for AppendOnly {
    fn name(&self) -> &'static str {
        "append_only"
    }

    fn decide(
        &self,
        order: &Order,
        ready: SimTime,
        now:   SimTime,
        fleet: &[Worker],
        ctx:   &DispatchContext<'_>,
    ) -> Decision {
        decide_with(order, ready, now, fleet, ctx, Positions::Append)
    }
}

// ── Search ────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq)]
enum Positions {
    Anywhere,
    Append,
}

fn decide_with(
    order:     &Order,
    ready:     SimTime,
    now:       SimTime,
    fleet:     &[Worker],
    ctx:       &DispatchContext<'_>,
    positions: Positions,
) -> Decision {
    if is_saturated(fleet, ctx.config) {
        log::debug!(
            "{now} {}: all {} workers hold {} orders",
            order.id,
            fleet.len(),
            ctx.config.queue_ceiling,
        );
        return Decision::Reject(FailureReason::QueueSaturated);
    }
    let mut best: Option<Proposal> = None;
    let mut searched = 0usize;
    for worker in fleet {
        if worker.held() >= ctx.config.queue_ceiling {
            continue;
        }
        searched += 1;
        if let Some(p) = best_for_worker(order, ready, now, worker, ctx, positions) {
            if best.is_none_or(|b| p.cost < b.cost) {
                best = Some(p);
            }
        }
    }
    match best {
        Some(p) => Decision::Assign(p),
        None => {
            log::debug!(
                "{now} {}: no feasible insertion on {searched} workers before {}",
                order.id,
                order.deadline,
            );
            Decision::Reject(FailureReason::EtaExceeded)
        }
    }
}

fn best_for_worker(
    order:     &Order,
    ready:     SimTime,
    now:       SimTime,
    worker:    &Worker,
    ctx:       &DispatchContext<'_>,
    positions: Positions,
) -> Option<Proposal> {
    let cfg     = ctx.config;
    let plan    = worker.plan();
    let m       = plan.len();
    let onboard = worker.onboard().len() as u32;
    let current = worker.timeline(now, ctx.travel, cfg);
    let (pickup, dropoff) = stops_for(order, ready);

    let mut anchors = vec![(worker.anchor(now), None)];
    if positions == Positions::Anywhere && cfg.retask_while_returning {
        if let Some(d) = worker.divert_point(now, ctx.travel) {
            anchors.push((Anchor { node: d.node, time: d.arrive }, Some(d)));
        }
    }

    let pairs: Vec<(usize, usize)> = match positions {
        Positions::Anywhere => (0..=m)
            .flat_map(|i| (i + 1..=m + 1).map(move |j| (i, j)))
            .collect(),
        Positions::Append => vec![(m, m + 1)],
    };

    let mut best: Option<Proposal> = None;
    let mut via_depot: Option<u64> = None;
    for (anchor, divert) in anchors {
        for &(i, j) in &pairs {
            let candidate = plan::with_insertion(plan, pickup, i, dropoff, j);
            if !plan::within_capacity(&candidate, onboard, cfg.capacity) {
                continue;
            }
            let times = plan::timeline(anchor, &candidate, ctx.travel, cfg.handoff_secs);
            let Some((cost, eta)) = score(order, now, &candidate, &times, &current, i, j, cfg) else {
                continue;
            };
            if divert.is_none() && via_depot.is_none_or(|c| cost < c) {
                via_depot = Some(cost);
            }
            if best.is_none_or(|b| cost < b.cost) {
                best = Some(Proposal {
                    worker: worker.id,
                    pickup_at: i,
                    dropoff_at: j,
                    divert,
                    eta,
                    cost,
                });
            }
        }
    }
    if let Some(Proposal { divert: Some(d), cost, .. }) = best {
        match via_depot {
            Some(c) => log::debug!(
                "{now} {}: divert at {} saves {} s over completing the return",
                worker.id,
                d.node,
                c.saturating_sub(cost),
            ),
            None => log::debug!(
                "{now} {}: only a divert at {} can serve {}",
                worker.id,
                d.node,
                order.id,
            ),
        }
    }
    best
}

/// Cost and ETA of one candidate plan, or `None` if it is infeasible.
#[allow(clippy::too_many_arguments)]
fn score(
    order:     &Order,
    now:       SimTime,
    candidate: &[Stop],
    times:     &[SimTime],
    current:   &[SimTime],
    i:         usize,
    j:         usize,
    cfg:       &DispatchConfig,
) -> Option<(u64, SimTime)> {
    let eta = times[j];
    if cfg.reject_late && eta > order.deadline {
        return None;
    }
    let mut cost = eta.since(now);
    for (k, stop) in candidate.iter().enumerate() {
        let plan::StopKind::Dropoff { deadline } = stop.kind else {
            continue;
        };
        if k == j {
            continue;
        }
        let old = current[if k < i { k } else if k < j { k - 1 } else { k - 2 }];
        let new = times[k];
        if new > deadline.max(old) {
            return None;
        }
        cost += new.since(old);
    }
    Some((cost, eta))
}
