//! The `Sim` struct and its event loop.

use std::time::{Duration, Instant};

use fleet_core::{OrderId, SimTime, WorkerId};
use fleet_demand::{FailureReason, OrderStatus};
use fleet_dispatch::{Decision, DispatchContext, Effect, Worker, stops_for};

use crate::event::EventKind;
use crate::state::SimulationState;
use crate::{Scenario, SimObserver, SimResult};

/// Events between two wall-clock checks.
const WALL_CLOCK_CHECK_INTERVAL: u64 = 256;

// ── Run control ───────────────────────────────────────────────────────────────

/// Infrastructure limits on one replication.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Abandon the replication once it has run this long.
    pub wall_clock: Option<Duration>,
}

impl RunLimits {
    pub fn wall_clock(limit: Duration) -> Self {
        Self { wall_clock: Some(limit) }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunStatus {
    /// The service window closed and every order was finalised.
    Completed,
    /// A [`RunLimits`] bound was hit; the partial state must be discarded.
    Abandoned,
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// One replication of a [`Scenario`].
///
/// The loop pops the earliest event, advances the clock to it, shows it to
/// the observer and hands it to the handler for its kind:
///
/// | Event                  | Handler                                          |
/// |------------------------|--------------------------------------------------|
/// | `order_arrival`        | ask the policy; reject, or accept and start prep |
/// | `prep_complete`        | wake the owning worker if it is staging          |
/// | `worker_departs`       | start the next leg                               |
/// | `worker_arrives`       | reach a node and work through the plan there     |
/// | `service_window_close` | fail every open order and stop                   |
///
/// Handlers never block: a worker waiting for prep is simply a worker with
/// no scheduled event until `prep_complete` fires.
pub struct Sim<'a> {
    scenario: &'a Scenario,
    state:    SimulationState,
    effects:  Vec<Effect>,
}

impl<'a> Sim<'a> {
    /// Draw the orders of replication `seed` and queue their arrivals.
    ///
    /// The window-close event is queued first so that it wins any tie with
    /// an arrival at the horizon.
    pub fn new(scenario: &'a Scenario, seed: u64) -> SimResult<Self> {
        let orders = scenario.generator().generate(seed);
        let mut state = SimulationState::new(
            orders,
            scenario.worker_count(),
            scenario.network().depot(),
            scenario.horizon(),
        );
        let horizon = state.queue.clock().horizon();
        state.queue.schedule(horizon, EventKind::ServiceWindowClose)?;
        for i in 0..state.orders.len() {
            let (id, at) = (state.orders[i].id, state.orders[i].arrival);
            state.queue.schedule(at, EventKind::OrderArrival(id))?;
        }
        Ok(Self { scenario, state, effects: Vec::new() })
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn workers(&self) -> &[Worker] {
        &self.state.workers
    }

    /// Run until the service window closes or `limits` are exceeded.
    ///
    /// The window also closes early if the queue runs dry or its next
    /// event lies past the horizon.
    ///
    /// Use [`NoopObserver`][crate::NoopObserver] if you don't need
    /// callbacks.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O, limits: &RunLimits) -> SimResult<RunStatus> {
        let started = Instant::now();
        let mut closed = false;

        while let Some(event) = self.state.queue.pop_due() {
            self.state.events += 1;
            log::trace!("{event}");
            observer.on_event(&event);

            match event.kind {
                EventKind::OrderArrival(id)                => self.order_arrival(id, observer)?,
                EventKind::PrepComplete(id)                => self.prep_complete(id, observer)?,
                EventKind::WorkerDeparts(w)                => self.worker_departs(w, observer)?,
                EventKind::WorkerArrives { worker, seq }   => self.worker_arrives(worker, seq, observer)?,
                EventKind::ServiceWindowClose => {
                    self.close(observer);
                    closed = true;
                    break;
                }
            }

            if let Some(limit) = limits.wall_clock {
                if self.state.events.is_multiple_of(WALL_CLOCK_CHECK_INTERVAL)
                    && started.elapsed() >= limit
                {
                    log::warn!(
                        "replication abandoned after {} events at {} ({:?} wall clock)",
                        self.state.events,
                        self.state.now(),
                        started.elapsed(),
                    );
                    return Ok(RunStatus::Abandoned);
                }
            }
        }

        if !closed {
            self.close(observer);
        }
        observer.on_sim_end(self.state.now(), self.state.events);
        Ok(RunStatus::Completed)
    }

    // ── Handlers ──────────────────────────────────────────────────────────

    fn order_arrival<O: SimObserver>(&mut self, id: OrderId, observer: &mut O) -> SimResult<()> {
        let scenario = self.scenario;
        let now      = self.state.now();
        let order    = self.state.order(id).clone();
        observer.on_order_generated(&order, now);

        let ready = now + order.prep_secs;
        let ctx = DispatchContext {
            travel: scenario.oracle(),
            config: scenario.dispatch(),
        };
        let decision = scenario.policy().decide(&order, ready, now, &self.state.workers, &ctx);

        match decision {
            Decision::Reject(reason) => {
                log::debug!("{now} {id} rejected: {reason}");
                self.state.set_status(id, OrderStatus::Failed(reason));
                observer.on_order_rejected(&order, reason, now);
            }
            Decision::Assign(proposal) => {
                log::debug!(
                    "{now} {id} → {} at ({}, {}), eta {}, cost {}",
                    proposal.worker,
                    proposal.pickup_at,
                    proposal.dropoff_at,
                    proposal.eta,
                    proposal.cost,
                );
                if let Some(d) = proposal.divert {
                    log::debug!("{now} {} re-tasked at {} ({})", proposal.worker, d.node, d.arrive);
                }

                self.state.set_status(id, OrderStatus::Queued);
                self.state.set_status(id, OrderStatus::Assigned);
                let p = &mut self.state.progress[id.index()];
                p.worker       = Some(proposal.worker);
                p.accepted_at  = Some(now);
                p.ready_at     = Some(ready);
                p.promised_eta = Some(proposal.eta);

                self.state.queue.schedule(ready, EventKind::PrepComplete(id))?;
                observer.on_order_admitted(&order, &proposal, now);

                let (pickup, dropoff) = stops_for(&order, ready);
                let travel = scenario.oracle();
                let cfg    = scenario.dispatch();
                self.drive(proposal.worker, observer, |w, out| {
                    w.accept(&proposal, pickup, dropoff, now, travel, cfg, out)
                })?;
            }
        }
        Ok(())
    }

    fn prep_complete<O: SimObserver>(&mut self, id: OrderId, observer: &mut O) -> SimResult<()> {
        let p = *self.state.progress(id);
        if p.status != OrderStatus::Assigned {
            return Ok(());
        }
        let Some(worker) = p.worker else {
            return Ok(());
        };
        let now = self.state.now();
        let cfg = self.scenario.dispatch();
        self.drive(worker, observer, |w, out| w.prep_ready(now, cfg, out))
    }

    fn worker_departs<O: SimObserver>(&mut self, worker: WorkerId, observer: &mut O) -> SimResult<()> {
        let now    = self.state.now();
        let travel = self.scenario.oracle();
        let cfg    = self.scenario.dispatch();
        self.drive(worker, observer, |w, out| w.depart(now, travel, cfg, out))
    }

    fn worker_arrives<O: SimObserver>(&mut self, worker: WorkerId, seq: u32, observer: &mut O) -> SimResult<()> {
        let now = self.state.now();
        let cfg = self.scenario.dispatch();
        self.drive(worker, observer, |w, out| {
            if !w.arrive(now, seq, cfg, out) {
                log::trace!("{now} {} ignored superseded arrival #{seq}", w.id);
            }
        })
    }

    /// Fail every order still open and stop all workers.
    fn close<O: SimObserver>(&mut self, observer: &mut O) {
        let now = self.state.now();
        for w in &mut self.state.workers {
            w.clear();
        }
        let open: Vec<OrderId> = self.state.open_orders().collect();
        if !open.is_empty() {
            log::debug!("{now} service window closed with {} open orders", open.len());
        }
        let reason = FailureReason::ServiceWindowClosed;
        for id in open {
            self.state.set_status(id, OrderStatus::Failed(reason));
            observer.on_order_failed(self.state.order(id), reason, now);
        }
    }

    // ── Worker effects ────────────────────────────────────────────────────

    /// Run `f` against worker `id`, then report its state change and turn
    /// the effects it emitted into events and order progress.
    fn drive<O, F>(&mut self, id: WorkerId, observer: &mut O, f: F) -> SimResult<()>
    where
        O: SimObserver,
        F: FnOnce(&mut Worker, &mut Vec<Effect>),
    {
        let now    = self.state.now();
        let worker = &mut self.state.workers[id.index()];
        let before = worker.state();
        self.effects.clear();
        f(worker, &mut self.effects);
        let after = worker.state();
        if before != after {
            observer.on_worker_transition(id, before, after, now);
        }

        for i in 0..self.effects.len() {
            match self.effects[i] {
                Effect::Depart(at) => {
                    self.state.queue.schedule(at, EventKind::WorkerDeparts(id))?;
                }
                Effect::Arrive { at, seq } => {
                    self.state.queue.schedule(at, EventKind::WorkerArrives { worker: id, seq })?;
                }
                Effect::PickedUp(order) => {
                    self.state.set_status(order, OrderStatus::PickedUp);
                    self.state.progress[order.index()].picked_up_at = Some(now);
                    observer.on_order_picked_up(self.state.order(order), id, now);
                }
                Effect::Delivered(order) => {
                    self.state.set_status(order, OrderStatus::Delivered);
                    self.state.progress[order.index()].delivered_at = Some(now);
                    observer.on_order_delivered(self.state.order(order), id, now);
                }
            }
        }
        Ok(())
    }

    /// Current time of the replication.
    pub fn now(&self) -> SimTime {
        self.state.now()
    }
}
