//! The outcome recorder: an observer that turns one replication into an
//! [`OutcomeRecord`].
//!
//! The recorder holds no domain logic.  It counts transitions, appends
//! latency samples and accumulates per-worker state durations; every rate
//! and percentile is computed once, in [`OutcomeRecorder::finish`].
//!
//! # Latency and service cycle
//!
//! *Latency* runs from an order's arrival to its hand-over.  The *service
//! cycle* runs on until the serving worker is free again:
//!
//! | After the hand-over the worker…        | Cycle ends when                 |
//! |----------------------------------------|---------------------------------|
//! | heads back to the depot                | it is idle there, or re-tasked  |
//! | moves on to its next stop              | it departs for that stop        |
//! | is already idle or staging for another | at the hand-over                |
//!
//! Cycles still open when the service window closes are not recorded.

use rustc_hash::FxHashMap;

use fleet_core::{OrderId, SimTime, WorkerId, ZoneId};
use fleet_demand::{FailureReason, Order};
use fleet_dispatch::{Proposal, WorkerState};

use crate::{Event, EventKind, SimObserver};

// ── Record types ──────────────────────────────────────────────────────────────

/// Orders failed per reason.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FailureCounts {
    pub eta_exceeded:          u32,
    pub queue_saturated:       u32,
    pub service_window_closed: u32,
}

impl FailureCounts {
    pub fn get(&self, reason: FailureReason) -> u32 {
        match reason {
            FailureReason::EtaExceeded         => self.eta_exceeded,
            FailureReason::QueueSaturated      => self.queue_saturated,
            FailureReason::ServiceWindowClosed => self.service_window_closed,
        }
    }

    fn bump(&mut self, reason: FailureReason) {
        match reason {
            FailureReason::EtaExceeded         => self.eta_exceeded += 1,
            FailureReason::QueueSaturated      => self.queue_saturated += 1,
            FailureReason::ServiceWindowClosed => self.service_window_closed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        FailureReason::ALL.iter().map(|&r| self.get(r)).sum()
    }

    /// Orders refused before entering any plan.
    pub fn at_admission(&self) -> u32 {
        FailureReason::ALL
            .iter()
            .filter(|r| r.is_admission())
            .map(|&r| self.get(r))
            .sum()
    }
}

/// Summary of per-order durations, in seconds.
///
/// Percentiles use the nearest-rank method; all fields are zero when
/// nothing was delivered.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatencySummary {
    pub count: u32,
    pub mean:  f64,
    pub p50:   u64,
    pub p90:   u64,
    pub p99:   u64,
    pub max:   u64,
}

impl LatencySummary {
    /// Summarise samples already sorted ascending.
    pub fn from_sorted(sorted: &[u64]) -> Self {
        if sorted.is_empty() {
            return Self::default();
        }
        let sum: u64 = sorted.iter().sum();
        Self {
            count: sorted.len() as u32,
            mean:  sum as f64 / sorted.len() as f64,
            p50:   nearest_rank(sorted, 50.0),
            p90:   nearest_rank(sorted, 90.0),
            p99:   nearest_rank(sorted, 99.0),
            max:   sorted[sorted.len() - 1],
        }
    }
}

/// The smallest sample with at least `p` percent of samples at or below it.
pub fn nearest_rank(sorted: &[u64], p: f64) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// How one worker spent the service window.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkerUtilization {
    pub worker:         WorkerId,
    pub traveling_secs: u64,
    pub staging_secs:   u64,
    pub idle_secs:      u64,
    pub traveling_pct:  f64,
    pub staging_pct:    f64,
    pub idle_pct:       f64,
    pub deliveries:     u32,
}

impl WorkerUtilization {
    /// Share of the window spent traveling or staging, in `[0, 1]`.
    pub fn busy_fraction(&self) -> f64 {
        (self.traveling_pct + self.staging_pct) / 100.0
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZoneStats {
    pub zone:              ZoneId,
    pub delivered:         u32,
    pub failed:            u32,
    /// Mean order-to-hand-over time of the zone's deliveries; zero if none.
    pub mean_service_secs: f64,
}

/// Immutable summary of one replication.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutcomeRecord {
    pub seed:              u64,
    pub worker_count:      u32,
    /// Length of the service window, open to close.
    pub duration_secs:     u64,

    pub generated:         u32,
    pub admitted:          u32,
    /// Refused at admission (`eta_exceeded` + `queue_saturated`).
    pub rejected:          u32,
    pub delivered:         u32,
    pub on_time:           u32,
    /// Every failure, at admission or in flight.
    pub failed:            u32,
    pub failures:          FailureCounts,
    /// Delivered after both the deadline and the ETA promised at acceptance.
    pub late_after_accept: u32,

    /// On-time deliveries over generated orders; 1.0 when none were generated.
    pub on_time_rate:      f64,
    /// Failed over generated orders; 0.0 when none were generated.
    pub failure_rate:      f64,

    pub latency:           LatencySummary,
    /// Every delivered order's latency, ascending.
    pub latencies:         Vec<u64>,
    /// Arrival to the serving worker being free again, per completed cycle.
    pub cycle:             LatencySummary,
    /// Every completed service cycle, ascending.
    pub cycles:            Vec<u64>,

    pub workers:           Vec<WorkerUtilization>,
    /// Mean of the workers' busy fractions.
    pub mean_utilization:  f64,
    pub orders_per_worker_hour: f64,
    pub zones:             Vec<ZoneStats>,

    pub events_processed:  u64,
}

impl OutcomeRecord {
    /// Orders that entered a plan but were never delivered.
    pub fn failed_in_flight(&self) -> u32 {
        self.failures.service_window_closed
    }
}

// ── OutcomeRecorder ───────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, Default)]
struct WorkerClock {
    state:      WorkerState,
    since:      SimTime,
    traveling:  u64,
    staging:    u64,
    idle:       u64,
    deliveries: u32,
}

impl WorkerClock {
    fn settle(&mut self, now: SimTime) {
        let dt = now.since(self.since);
        match self.state {
            WorkerState::Idle    => self.idle += dt,
            WorkerState::Staging => self.staging += dt,
            _                    => self.traveling += dt,
        }
        self.since = now;
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct ZoneTally {
    delivered:   u32,
    failed:      u32,
    service_sum: u64,
}

/// A [`SimObserver`] that accumulates one [`OutcomeRecord`].
pub struct OutcomeRecorder {
    seed:      u64,
    generated: u32,
    admitted:  u32,
    delivered: u32,
    on_time:   u32,
    late:      u32,
    failures:  FailureCounts,
    promised:  FxHashMap<OrderId, SimTime>,
    latencies: Vec<u64>,
    cycles:    Vec<u64>,
    /// Arrivals of delivered orders whose worker is not yet free, per worker.
    open:      Vec<Vec<SimTime>>,
    workers:   Vec<WorkerClock>,
    zones:     Vec<ZoneTally>,
    end:       SimTime,
    events:    u64,
}

impl OutcomeRecorder {
    pub fn new(seed: u64, worker_count: u32, zone_count: usize) -> Self {
        Self {
            seed,
            generated: 0,
            admitted:  0,
            delivered: 0,
            on_time:   0,
            late:      0,
            failures:  FailureCounts::default(),
            promised:  FxHashMap::default(),
            latencies: Vec::new(),
            cycles:    Vec::new(),
            open:      vec![Vec::new(); worker_count as usize],
            workers:   vec![WorkerClock::default(); worker_count as usize],
            zones:     vec![ZoneTally::default(); zone_count.max(1)],
            end:       SimTime::ZERO,
            events:    0,
        }
    }

    fn zone(&mut self, zone: ZoneId) -> &mut ZoneTally {
        let i = zone.index();
        if i >= self.zones.len() {
            self.zones.resize(i + 1, ZoneTally::default());
        }
        &mut self.zones[i]
    }

    /// Close every open cycle of `worker` at `now`.
    fn release(&mut self, worker: WorkerId, now: SimTime) {
        if let Some(open) = self.open.get_mut(worker.index()) {
            self.cycles.extend(open.drain(..).map(|arrival| now.since(arrival)));
        }
    }

    fn state_of(&self, worker: WorkerId) -> WorkerState {
        self.workers.get(worker.index()).map_or(WorkerState::Idle, |w| w.state)
    }

    /// Compute every rate and summary.
    pub fn finish(mut self) -> OutcomeRecord {
        self.latencies.sort_unstable();
        self.cycles.sort_unstable();
        let duration = self.end.secs();
        let pct = |x: u64| if duration == 0 { 0.0 } else { 100.0 * x as f64 / duration as f64 };

        let workers: Vec<WorkerUtilization> = self
            .workers
            .iter()
            .enumerate()
            .map(|(i, w)| WorkerUtilization {
                worker:         WorkerId(i as u32),
                traveling_secs: w.traveling,
                staging_secs:   w.staging,
                idle_secs:      w.idle,
                traveling_pct:  pct(w.traveling),
                staging_pct:    pct(w.staging),
                idle_pct:       pct(w.idle),
                deliveries:     w.deliveries,
            })
            .collect();
        let mean_utilization = if workers.is_empty() {
            0.0
        } else {
            workers.iter().map(WorkerUtilization::busy_fraction).sum::<f64>() / workers.len() as f64
        };

        let worker_hours = workers.len() as f64 * duration as f64 / 3_600.0;
        let orders_per_worker_hour = if worker_hours > 0.0 {
            self.delivered as f64 / worker_hours
        } else {
            0.0
        };

        let zones = self
            .zones
            .iter()
            .enumerate()
            .map(|(i, z)| ZoneStats {
                zone:              ZoneId(i as u16),
                delivered:         z.delivered,
                failed:            z.failed,
                mean_service_secs: if z.delivered == 0 {
                    0.0
                } else {
                    z.service_sum as f64 / z.delivered as f64
                },
            })
            .collect();

        let failed = self.failures.total();
        let (on_time_rate, failure_rate) = if self.generated == 0 {
            (1.0, 0.0)
        } else {
            let n = self.generated as f64;
            (self.on_time as f64 / n, failed as f64 / n)
        };

        OutcomeRecord {
            seed:              self.seed,
            worker_count:      workers.len() as u32,
            duration_secs:     duration,
            generated:         self.generated,
            admitted:          self.admitted,
            rejected:          self.failures.at_admission(),
            delivered:         self.delivered,
            on_time:           self.on_time,
            failed,
            failures:          self.failures,
            late_after_accept: self.late,
            on_time_rate,
            failure_rate,
            latency:           LatencySummary::from_sorted(&self.latencies),
            latencies:         self.latencies,
            cycle:             LatencySummary::from_sorted(&self.cycles),
            cycles:            self.cycles,
            workers,
            mean_utilization,
            orders_per_worker_hour,
            zones,
            events_processed:  self.events,
        }
    }
}

impl SimObserver for OutcomeRecorder {
    fn on_event(&mut self, event: &Event) {
        if let EventKind::WorkerDeparts(worker) = event.kind {
            if self.state_of(worker) != WorkerState::Returning {
                self.release(worker, event.time);
            }
        }
    }

    fn on_order_generated(&mut self, _order: &Order, _now: SimTime) {
        self.generated += 1;
    }

    fn on_order_admitted(&mut self, order: &Order, proposal: &Proposal, _now: SimTime) {
        self.admitted += 1;
        self.promised.insert(order.id, proposal.eta);
    }

    fn on_order_rejected(&mut self, order: &Order, reason: FailureReason, _now: SimTime) {
        self.failures.bump(reason);
        self.zone(order.zone).failed += 1;
    }

    fn on_order_delivered(&mut self, order: &Order, worker: WorkerId, now: SimTime) {
        self.delivered += 1;
        if !order.is_late_at(now) {
            self.on_time += 1;
        }
        let promised = self.promised.remove(&order.id).unwrap_or(order.deadline);
        if now > order.deadline.max(promised) {
            self.late += 1;
        }
        let latency = now.since(order.arrival);
        self.latencies.push(latency);
        if let Some(w) = self.workers.get_mut(worker.index()) {
            w.deliveries += 1;
        }
        let z = self.zone(order.zone);
        z.delivered   += 1;
        z.service_sum += latency;

        if let Some(open) = self.open.get_mut(worker.index()) {
            open.push(order.arrival);
        }
        if matches!(self.state_of(worker), WorkerState::Idle | WorkerState::Staging) {
            self.release(worker, now);
        }
    }

    fn on_order_failed(&mut self, order: &Order, reason: FailureReason, _now: SimTime) {
        self.failures.bump(reason);
        self.promised.remove(&order.id);
        self.zone(order.zone).failed += 1;
    }

    fn on_worker_transition(&mut self, worker: WorkerId, from: WorkerState, to: WorkerState, now: SimTime) {
        if let Some(w) = self.workers.get_mut(worker.index()) {
            w.settle(now);
            w.state = to;
        }
        if from == WorkerState::Returning {
            self.release(worker, now);
        }
    }

    fn on_sim_end(&mut self, end: SimTime, events: u64) {
        for w in &mut self.workers {
            w.settle(end);
        }
        self.end    = end;
        self.events = events;
    }
}
