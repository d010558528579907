//! Unit tests for fleet-dispatch.
//!
//! Travel times come from [`Line`], a hand-written table: six waypoints on a
//! straight path, 60 s apart, with the depot kitchen at node 0.

use fleet_core::{NodeId, OrderId, SimTime, WorkerId, ZoneId};
use fleet_demand::{FailureReason, Order};
use fleet_spatial::TravelTime;

use crate::{
    AppendOnly, Decision, DispatchConfig, DispatchContext, DispatchPolicy, Effect,
    MinAddedLatency, Proposal, Worker, WorkerState, stops_for,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

struct Line;

impl TravelTime for Line {
    fn time(&self, from: NodeId, to: NodeId) -> u64 {
        (from.0 as i64 - to.0 as i64).unsigned_abs() * 60
    }

    fn node_count(&self) -> usize {
        6
    }

    fn path(&self, from: NodeId, to: NodeId) -> Vec<NodeId> {
        if from <= to {
            (from.0..=to.0).map(NodeId).collect()
        } else {
            (to.0..=from.0).rev().map(NodeId).collect()
        }
    }
}

const DEPOT: NodeId = NodeId(0);

fn order(id: u32, arrival: u64, pickup: u32, dest: u32, prep: u64, sla: u64) -> Order {
    Order {
        id:          OrderId(id),
        arrival:     SimTime(arrival),
        origin:      NodeId(dest),
        destination: NodeId(dest),
        pickup:      NodeId(pickup),
        prep_secs:   prep,
        deadline:    SimTime(arrival + sla),
        zone:        ZoneId(0),
    }
}

fn fleet(n: u32) -> Vec<Worker> {
    (0..n).map(|i| Worker::new(WorkerId(i), DEPOT)).collect()
}

/// Decide with `policy` and, on assignment, commit the proposal.
fn dispatch(
    policy: &dyn DispatchPolicy,
    fleet:  &mut [Worker],
    o:      &Order,
    now:    u64,
    cfg:    &DispatchConfig,
    out:    &mut Vec<Effect>,
) -> Decision {
    let now   = SimTime(now);
    let ready = now + o.prep_secs;
    let ctx   = DispatchContext { travel: &Line, config: cfg };
    let decision = policy.decide(o, ready, now, fleet, &ctx);
    if let Decision::Assign(p) = decision {
        let (pickup, dropoff) = stops_for(o, ready);
        fleet[p.worker.index()].accept(&p, pickup, dropoff, now, &Line, cfg, out);
    }
    decision
}

fn assigned(d: Decision) -> Proposal {
    match d {
        Decision::Assign(p) => p,
        Decision::Reject(r) => panic!("expected assignment, got rejection {r}"),
    }
}

// ── Plan evaluation ───────────────────────────────────────────────────────────

#[cfg(test)]
mod plan {
    use super::*;
    use crate::plan::{Anchor, Stop, timeline, with_insertion, within_capacity};

    #[test]
    fn timeline_waits_for_prep_and_hands_over() {
        let stops = [
            Stop::pickup(OrderId(0), NodeId(0), SimTime(100)),
            Stop::dropoff(OrderId(0), NodeId(3), SimTime(9_999)),
            Stop::pickup(OrderId(1), NodeId(0), SimTime(0)),
            Stop::dropoff(OrderId(1), NodeId(2), SimTime(9_999)),
        ];
        let t = timeline(Anchor { node: DEPOT, time: SimTime::ZERO }, &stops, &Line, 30);
        assert_eq!(t, vec![SimTime(100), SimTime(280), SimTime(490), SimTime(610)]);
    }

    #[test]
    fn insertion_positions_refer_to_result() {
        let a = Stop::pickup(OrderId(0), NodeId(0), SimTime(0));
        let b = Stop::dropoff(OrderId(0), NodeId(1), SimTime(0));
        let p = Stop::pickup(OrderId(1), NodeId(0), SimTime(0));
        let d = Stop::dropoff(OrderId(1), NodeId(2), SimTime(0));
        assert_eq!(with_insertion(&[a, b], p, 0, d, 1), vec![p, d, a, b]);
        assert_eq!(with_insertion(&[a, b], p, 1, d, 3), vec![a, p, b, d]);
        assert_eq!(with_insertion(&[a, b], p, 2, d, 3), vec![a, b, p, d]);
    }

    #[test]
    fn capacity_counts_onboard_load() {
        let p0 = Stop::pickup(OrderId(0), NodeId(0), SimTime(0));
        let d0 = Stop::dropoff(OrderId(0), NodeId(1), SimTime(0));
        let p1 = Stop::pickup(OrderId(1), NodeId(0), SimTime(0));
        let d1 = Stop::dropoff(OrderId(1), NodeId(2), SimTime(0));
        assert!(within_capacity(&[p0, d0, p1, d1], 0, 1));
        assert!(!within_capacity(&[p0, p1, d0, d1], 0, 1));
        assert!(within_capacity(&[p0, p1, d0, d1], 0, 2));
        assert!(!within_capacity(&[p1, d1], 1, 1));
    }
}

// ── Worker state machine ──────────────────────────────────────────────────────

#[cfg(test)]
mod worker {
    use super::*;

    #[test]
    fn full_cycle_out_and_back() {
        let cfg = DispatchConfig::default();
        let mut ws = fleet(1);
        let mut out = Vec::new();

        let p = assigned(dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 3, 300, 1_800), 0, &cfg, &mut out));
        assert_eq!((p.pickup_at, p.dropoff_at, p.eta), (0, 1, SimTime(480)));
        let w = &mut ws[0];
        assert_eq!(w.state(), WorkerState::Staging);
        assert_eq!(w.held(), 1);
        assert!(out.is_empty());

        w.prep_ready(SimTime(300), &cfg, &mut out);
        assert_eq!(out, vec![Effect::PickedUp(OrderId(0)), Effect::Depart(SimTime(300))]);
        assert_eq!(w.state(), WorkerState::EnRoute);
        assert_eq!(w.onboard(), &[OrderId(0)]);

        out.clear();
        w.depart(SimTime(300), &Line, &cfg, &mut out);
        assert_eq!(out, vec![Effect::Arrive { at: SimTime(480), seq: 1 }]);

        out.clear();
        assert!(w.arrive(SimTime(480), 1, &cfg, &mut out));
        assert_eq!(out, vec![Effect::Delivered(OrderId(0)), Effect::Depart(SimTime(480))]);
        assert_eq!(w.state(), WorkerState::Returning);
        assert_eq!(w.held(), 0);

        out.clear();
        w.depart(SimTime(480), &Line, &cfg, &mut out);
        assert_eq!(out, vec![Effect::Arrive { at: SimTime(660), seq: 2 }]);

        out.clear();
        assert!(!w.arrive(SimTime(660), 1, &cfg, &mut out), "stale leg accepted");
        assert!(w.arrive(SimTime(660), 2, &cfg, &mut out));
        assert_eq!(w.state(), WorkerState::Idle);
        assert_eq!(w.node(), DEPOT);
        assert!(out.is_empty());
    }

    #[test]
    fn ready_order_leaves_immediately() {
        let cfg = DispatchConfig::default();
        let mut ws = fleet(1);
        let mut out = Vec::new();
        dispatch(&MinAddedLatency, &mut ws, &order(0, 50, 0, 2, 0, 1_800), 50, &cfg, &mut out);
        assert_eq!(out, vec![Effect::PickedUp(OrderId(0)), Effect::Depart(SimTime(50))]);
        assert_eq!(ws[0].pending_departure(), Some(SimTime(50)));
    }

    #[test]
    fn handoff_delays_next_departure() {
        let cfg = DispatchConfig { handoff_secs: 30, ..DispatchConfig::default() };
        let mut ws = fleet(1);
        let mut out = Vec::new();
        dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 3, 0, 1_800), 0, &cfg, &mut out);
        let w = &mut ws[0];
        out.clear();
        w.depart(SimTime(0), &Line, &cfg, &mut out);
        out.clear();
        w.arrive(SimTime(180), 1, &cfg, &mut out);
        assert_eq!(out, vec![Effect::Delivered(OrderId(0)), Effect::Depart(SimTime(210))]);
        assert_eq!(w.anchor(SimTime(190)).time, SimTime(210));
    }

    #[test]
    fn divert_point_is_next_unpassed_waypoint() {
        let cfg = DispatchConfig::default();
        let mut ws = fleet(1);
        let mut out = Vec::new();
        dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 3, 0, 1_800), 0, &cfg, &mut out);
        let w = &mut ws[0];
        w.depart(SimTime(0), &Line, &cfg, &mut out);
        w.arrive(SimTime(180), 1, &cfg, &mut out);
        w.depart(SimTime(180), &Line, &cfg, &mut out);
        assert_eq!(w.state(), WorkerState::Returning);

        let d = w.divert_point(SimTime(200), &Line).unwrap();
        assert_eq!((d.node, d.arrive), (NodeId(2), SimTime(240)));
        let d = w.divert_point(SimTime(240), &Line).unwrap();
        assert_eq!(d.node, NodeId(2));
        assert_eq!(w.divert_point(SimTime(350), &Line), None);
    }

    #[test]
    fn clear_returns_held_orders() {
        let cfg = DispatchConfig { capacity: 2, ..DispatchConfig::default() };
        let mut ws = fleet(1);
        let mut out = Vec::new();
        dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 3, 600, 3_600), 0, &cfg, &mut out);
        dispatch(&MinAddedLatency, &mut ws, &order(1, 0, 0, 2, 600, 3_600), 0, &cfg, &mut out);
        assert_eq!(ws[0].held(), 2);
        assert_eq!(ws[0].clear(), vec![OrderId(0), OrderId(1)]);
        assert!(ws[0].plan().is_empty());
    }
}

// ── Dispatch policies ─────────────────────────────────────────────────────────

#[cfg(test)]
mod policy {
    use super::*;

    #[test]
    fn ties_go_to_lowest_worker_id() {
        let cfg = DispatchConfig::default();
        let mut ws = fleet(3);
        let mut out = Vec::new();
        let p = assigned(dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 2, 60, 1_800), 0, &cfg, &mut out));
        assert_eq!(p.worker, WorkerId(0));
        let p = assigned(dispatch(&MinAddedLatency, &mut ws, &order(1, 0, 0, 2, 60, 1_800), 0, &cfg, &mut out));
        assert_eq!(p.worker, WorkerId(1), "busy worker should lose to an idle one");
    }

    #[test]
    fn queue_ceiling_saturates() {
        let cfg = DispatchConfig { queue_ceiling: 1, ..DispatchConfig::default() };
        let mut ws = fleet(1);
        let mut out = Vec::new();
        assigned(dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 2, 60, 3_600), 0, &cfg, &mut out));
        let d = dispatch(&MinAddedLatency, &mut ws, &order(1, 0, 0, 2, 60, 3_600), 0, &cfg, &mut out);
        assert_eq!(d, Decision::Reject(FailureReason::QueueSaturated));
        assert_eq!(ws[0].held(), 1);
    }

    #[test]
    fn unreachable_deadline_is_eta_exceeded() {
        let cfg = DispatchConfig::default();
        let mut ws = fleet(1);
        let mut out = Vec::new();
        // 60 s prep + 300 s travel cannot make a 120 s promise.
        let d = dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 5, 60, 120), 0, &cfg, &mut out);
        assert_eq!(d, Decision::Reject(FailureReason::EtaExceeded));
        assert_eq!(ws[0].held(), 0);

        let lenient = DispatchConfig { reject_late: false, ..cfg };
        let p = assigned(dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 5, 60, 120), 0, &lenient, &mut out));
        assert_eq!(p.eta, SimTime(360));
    }

    #[test]
    fn committed_deadline_is_protected() {
        let cfg = DispatchConfig { capacity: 2, ..DispatchConfig::default() };
        let mut ws = fleet(1);
        let mut out = Vec::new();
        // Order 0 is due exactly when it will arrive (t = 300).
        let p0 = assigned(dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 5, 0, 300), 0, &cfg, &mut out));
        assert_eq!(p0.eta, SimTime(300));

        // Serving order 1 first would deliver order 0 at t = 400.
        let p1 = assigned(dispatch(&MinAddedLatency, &mut ws, &order(1, 0, 0, 1, 100, 1_000), 0, &cfg, &mut out));
        assert_eq!((p1.pickup_at, p1.dropoff_at), (1, 2));
        assert_eq!(p1.eta, SimTime(660));
        assert_eq!(ws[0].timeline(SimTime(0), &Line, &cfg)[0], SimTime(300));
    }

    #[test]
    fn batching_within_capacity() {
        let cfg = DispatchConfig { capacity: 2, ..DispatchConfig::default() };
        let mut ws = fleet(1);
        let mut out = Vec::new();
        dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 3, 300, 3_600), 0, &cfg, &mut out);
        assert_eq!(ws[0].state(), WorkerState::Staging);

        let p = assigned(dispatch(&MinAddedLatency, &mut ws, &order(1, 100, 0, 3, 200, 3_600), 100, &cfg, &mut out));
        assert_eq!((p.pickup_at, p.dropoff_at), (0, 2));
        assert_eq!((p.eta, p.cost), (SimTime(480), 380));
        assert_eq!(ws[0].state(), WorkerState::Staging);
    }

    #[test]
    fn append_only_never_reorders() {
        let cfg = DispatchConfig { capacity: 2, ..DispatchConfig::default() };
        let mut ws = fleet(1);
        let mut out = Vec::new();
        dispatch(&AppendOnly, &mut ws, &order(0, 0, 0, 3, 300, 3_600), 0, &cfg, &mut out);
        let p = assigned(dispatch(&AppendOnly, &mut ws, &order(1, 100, 0, 3, 200, 3_600), 100, &cfg, &mut out));
        assert_eq!((p.pickup_at, p.dropoff_at), (2, 3));
        assert_eq!((p.eta, p.cost), (SimTime(840), 740));
        assert_eq!(AppendOnly.name(), "append_only");
    }

    /// Worker heading home from node 5 (left at t = 300, due at t = 600).
    fn returning_worker(cfg: &DispatchConfig) -> Vec<Worker> {
        let mut ws = fleet(1);
        let mut out = Vec::new();
        dispatch(&MinAddedLatency, &mut ws, &order(0, 0, 0, 5, 0, 1_800), 0, cfg, &mut out);
        let w = &mut ws[0];
        w.depart(SimTime(0), &Line, cfg, &mut out);
        w.arrive(SimTime(300), 1, cfg, &mut out);
        w.depart(SimTime(300), &Line, cfg, &mut out);
        assert_eq!(w.state(), WorkerState::Returning);
        ws
    }

    #[test]
    fn returning_worker_is_retasked_when_cheaper() {
        let cfg = DispatchConfig::default();
        let mut ws = returning_worker(&cfg);
        let mut out = Vec::new();
        // Halfway kitchen at node 4, customer at node 5.
        let p = assigned(dispatch(&MinAddedLatency, &mut ws, &order(1, 330, 4, 5, 0, 3_600), 330, &cfg, &mut out));
        let d = p.divert.expect("divert expected");
        assert_eq!((d.node, d.arrive), (NodeId(4), SimTime(360)));
        assert_eq!(p.eta, SimTime(420));
        assert_eq!(out, vec![Effect::Arrive { at: SimTime(360), seq: 3 }]);

        let w = &mut ws[0];
        assert_eq!(w.state(), WorkerState::Departing);
        out.clear();
        assert!(!w.arrive(SimTime(600), 2, &cfg, &mut out));
        assert!(w.arrive(SimTime(360), 3, &cfg, &mut out));
        assert_eq!(out, vec![Effect::PickedUp(OrderId(1)), Effect::Depart(SimTime(360))]);
    }

    #[test]
    fn retasking_can_be_disabled() {
        let cfg = DispatchConfig { retask_while_returning: false, ..DispatchConfig::default() };
        let mut ws = returning_worker(&cfg);
        let mut out = Vec::new();
        let p = assigned(dispatch(&MinAddedLatency, &mut ws, &order(1, 330, 4, 5, 0, 3_600), 330, &cfg, &mut out));
        assert_eq!(p.divert, None);
        assert_eq!(p.eta, SimTime(900));
        assert!(out.is_empty());
        assert_eq!(ws[0].state(), WorkerState::Departing);
    }

    #[test]
    fn returning_worker_from_depot_side_keeps_going() {
        let cfg = DispatchConfig::default();
        let mut ws = returning_worker(&cfg);
        let mut out = Vec::new();
        // Depot kitchen: diverting only to come back later costs more.
        let p = assigned(dispatch(&MinAddedLatency, &mut ws, &order(1, 330, 0, 5, 0, 3_600), 330, &cfg, &mut out));
        assert_eq!(p.divert, None);
        assert_eq!(p.eta, SimTime(900));
    }
}
