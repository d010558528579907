//! The worker state machine.
//!
//! # States
//!
//! ```text
//! idle ──→ departing ──→ staging ──→ en_route ──→ returning ──→ idle
//!            (to pickup)  (prep wait) (to customer) (to depot)
//! ```
//!
//! # Travel model
//!
//! Travel is teleport-at-arrival: during a [`Leg`] the worker is logically
//! at `leg.from` and appears at `leg.to` when the matching `worker_arrives`
//! event fires.  Every leg carries a sequence number; an arrival event whose
//! sequence no longer matches the worker's current leg was superseded (the
//! leg was cut short by a re-task) and is ignored.
//!
//! # Effects
//!
//! The worker never touches the event queue.  Its handlers push [`Effect`]s
//! into a caller-owned buffer; the simulation turns those into scheduled
//! events and order-progress updates.

use fleet_core::{NodeId, OrderId, SimTime, WorkerId};
use fleet_spatial::TravelTime;

use crate::DispatchConfig;
use crate::plan::{self, Anchor, Stop, StopKind};
use crate::policy::{Divert, Proposal};

// ── WorkerState ───────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WorkerState {
    /// At the depot with nothing to do.
    #[default]
    Idle,
    /// Heading to a pickup.
    Departing,
    /// At a kitchen, waiting for prep to finish.
    Staging,
    /// Heading to a customer (or handing an order over).
    EnRoute,
    /// Plan empty, heading back to the depot.
    Returning,
}

impl WorkerState {
    /// Departing, en route, or returning.
    #[inline]
    pub fn is_traveling(self) -> bool {
        matches!(self, WorkerState::Departing | WorkerState::EnRoute | WorkerState::Returning)
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkerState::Idle      => "idle",
            WorkerState::Departing => "departing",
            WorkerState::Staging   => "staging",
            WorkerState::EnRoute   => "en_route",
            WorkerState::Returning => "returning",
        }
    }
}

// ── Leg ───────────────────────────────────────────────────────────────────────

/// One trip between two waypoints.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Leg {
    pub from:   NodeId,
    pub to:     NodeId,
    pub depart: SimTime,
    pub arrive: SimTime,
    pub seq:    u32,
}

// ── Effect ────────────────────────────────────────────────────────────────────

/// Something the simulation must do on the worker's behalf.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Schedule a `worker_departs` event.
    Depart(SimTime),
    /// Schedule a `worker_arrives` event for leg `seq`.
    Arrive { at: SimTime, seq: u32 },
    PickedUp(OrderId),
    Delivered(OrderId),
}

// ── Worker ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct Worker {
    pub id:    WorkerId,
    depot:     NodeId,
    state:     WorkerState,
    /// Last node reached; the departure node while a leg is in progress.
    node:      NodeId,
    leg:       Option<Leg>,
    /// Time of the pending `worker_departs` event, if any.
    departure: Option<SimTime>,
    plan:      Vec<Stop>,
    onboard:   Vec<OrderId>,
    next_seq:  u32,
}

impl Worker {
    /// A worker idle at `depot`.
    pub fn new(id: WorkerId, depot: NodeId) -> Self {
        Self {
            id,
            depot,
            state:     WorkerState::Idle,
            node:      depot,
            leg:       None,
            departure: None,
            plan:      Vec::new(),
            onboard:   Vec::new(),
            next_seq:  0,
        }
    }

    // ── Queries ───────────────────────────────────────────────────────────

    #[inline]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    #[inline]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[inline]
    pub fn depot(&self) -> NodeId {
        self.depot
    }

    pub fn leg(&self) -> Option<&Leg> {
        self.leg.as_ref()
    }

    pub fn pending_departure(&self) -> Option<SimTime> {
        self.departure
    }

    pub fn plan(&self) -> &[Stop] {
        &self.plan
    }

    pub fn onboard(&self) -> &[OrderId] {
        &self.onboard
    }

    /// Orders assigned to this worker and not yet delivered.
    pub fn held(&self) -> u32 {
        self.plan.iter().filter(|s| s.is_dropoff()).count() as u32
    }

    /// Where and when this worker can next act on its plan.
    pub fn anchor(&self, now: SimTime) -> Anchor {
        if let Some(leg) = &self.leg {
            Anchor { node: leg.to, time: leg.arrive }
        } else if let Some(t) = self.departure {
            Anchor { node: self.node, time: t }
        } else {
            Anchor { node: self.node, time: now }
        }
    }

    /// The first waypoint on the way back to the depot that the worker has
    /// not yet passed at `now`, if it is currently returning.
    pub fn divert_point(&self, now: SimTime, travel: &dyn TravelTime) -> Option<Divert> {
        if self.state != WorkerState::Returning {
            return None;
        }
        let leg = self.leg?;
        for node in travel.path(leg.from, leg.to) {
            if node == leg.to {
                return None;
            }
            let arrive = leg.depart + travel.time(leg.from, node);
            if arrive >= now {
                return Some(Divert { node, arrive });
            }
        }
        None
    }

    /// Completion time of every planned stop from the current anchor.
    pub fn timeline(&self, now: SimTime, travel: &dyn TravelTime, cfg: &DispatchConfig) -> Vec<SimTime> {
        plan::timeline(self.anchor(now), &self.plan, travel, cfg.handoff_secs)
    }

    // ── Transitions ───────────────────────────────────────────────────────

    /// Commit a proposal built by a dispatch policy.
    ///
    /// Splices the order's pickup and drop-off into the plan, cuts the
    /// return leg short when the proposal diverts, and starts the worker if
    /// it was waiting.
    #[allow(clippy::too_many_arguments)]
    pub fn accept(
        &mut self,
        proposal: &Proposal,
        pickup:   Stop,
        dropoff:  Stop,
        now:      SimTime,
        travel:   &dyn TravelTime,
        cfg:      &DispatchConfig,
        out:      &mut Vec<Effect>,
    ) {
        debug_assert_eq!(proposal.worker, self.id);
        self.plan = plan::with_insertion(
            &self.plan,
            pickup,
            proposal.pickup_at,
            dropoff,
            proposal.dropoff_at,
        );

        if let (Some(d), Some(leg)) = (proposal.divert, self.leg) {
            let seq = self.bump_seq();
            self.leg = Some(Leg { to: d.node, arrive: d.arrive, seq, ..leg });
            out.push(Effect::Arrive { at: d.arrive, seq });
        }

        if self.leg.is_none() && self.departure.is_none() {
            self.advance(now, cfg, out);
        } else {
            self.state = self.heading_state();
        }

        debug_assert!(
            plan::is_monotone(&self.timeline(now, travel, cfg)),
            "worker {} plan times decrease after accepting {:?}",
            self.id,
            proposal
        );
    }

    /// Handle this worker's `worker_departs` event.
    pub fn depart(&mut self, now: SimTime, travel: &dyn TravelTime, cfg: &DispatchConfig, out: &mut Vec<Effect>) {
        self.departure = None;
        let target = match self.plan.first() {
            Some(stop) if stop.node == self.node => {
                self.advance(now, cfg, out);
                return;
            }
            Some(stop) => stop.node,
            None if self.node == self.depot => {
                self.state = WorkerState::Idle;
                return;
            }
            None => self.depot,
        };
        let seq    = self.bump_seq();
        let arrive = now + travel.time(self.node, target);
        self.leg   = Some(Leg { from: self.node, to: target, depart: now, arrive, seq });
        self.state = self.heading_state();
        out.push(Effect::Arrive { at: arrive, seq });
    }

    /// Handle a `worker_arrives` event.  Returns `false` for a stale event.
    pub fn arrive(&mut self, now: SimTime, seq: u32, cfg: &DispatchConfig, out: &mut Vec<Effect>) -> bool {
        match self.leg {
            Some(leg) if leg.seq == seq => {
                debug_assert_eq!(leg.arrive, now);
                self.node = leg.to;
                self.leg  = None;
                self.advance(now, cfg, out);
                true
            }
            _ => false,
        }
    }

    /// Handle a `prep_complete` event for an order this worker may be
    /// staging for.
    pub fn prep_ready(&mut self, now: SimTime, cfg: &DispatchConfig, out: &mut Vec<Effect>) {
        if self.state == WorkerState::Staging {
            self.advance(now, cfg, out);
        }
    }

    /// Drop every planned stop; used when the service window closes.
    pub fn clear(&mut self) -> Vec<OrderId> {
        let mut held: Vec<OrderId> = self.plan.iter().filter(|s| s.is_dropoff()).map(|s| s.order).collect();
        held.sort_unstable();
        self.plan.clear();
        self.onboard.clear();
        held
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Work through the plan at the current node until the worker has to
    /// wait or move.
    fn advance(&mut self, now: SimTime, cfg: &DispatchConfig, out: &mut Vec<Effect>) {
        loop {
            let Some(&stop) = self.plan.first() else {
                if self.node == self.depot {
                    self.state = WorkerState::Idle;
                } else {
                    self.schedule_departure(now, out);
                }
                return;
            };
            if stop.node != self.node {
                self.schedule_departure(now, out);
                return;
            }
            match stop.kind {
                StopKind::Pickup { ready } if ready > now => {
                    self.state = WorkerState::Staging;
                    return;
                }
                StopKind::Pickup { .. } => {
                    self.plan.remove(0);
                    self.onboard.push(stop.order);
                    out.push(Effect::PickedUp(stop.order));
                }
                StopKind::Dropoff { .. } => {
                    self.plan.remove(0);
                    self.onboard.retain(|&o| o != stop.order);
                    out.push(Effect::Delivered(stop.order));
                    if cfg.handoff_secs > 0 {
                        if self.plan.is_empty() && self.node == self.depot {
                            self.state = WorkerState::Idle;
                        } else {
                            self.schedule_departure(now + cfg.handoff_secs, out);
                        }
                        return;
                    }
                }
            }
        }
    }

    fn schedule_departure(&mut self, at: SimTime, out: &mut Vec<Effect>) {
        self.departure = Some(at);
        self.state     = self.heading_state();
        out.push(Effect::Depart(at));
    }

    /// State label for a worker that is moving towards its next stop.
    fn heading_state(&self) -> WorkerState {
        match self.plan.first() {
            Some(s) if s.is_pickup() => WorkerState::Departing,
            Some(_)                  => WorkerState::EnRoute,
            None                     => WorkerState::Returning,
        }
    }

    fn bump_seq(&mut self) -> u32 {
        self.next_seq = self.next_seq.wrapping_add(1);
        self.next_seq
    }
}
