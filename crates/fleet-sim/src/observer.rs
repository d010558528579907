//! The publish/subscribe hook on the event loop.

use fleet_core::{SimTime, WorkerId};
use fleet_demand::{FailureReason, Order};
use fleet_dispatch::{Proposal, WorkerState};

use crate::event::Event;

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] as the replication
/// unfolds.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.  Observers see every state change but
/// cannot alter it.
///
/// # Example: event counter
///
/// ```rust,ignore
/// struct Count(u64);
///
/// impl SimObserver for Count {
///     fn on_event(&mut self, _event: &Event) {
///         self.0 += 1;
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called for every event, just before its handler runs.
    fn on_event(&mut self, _event: &Event) {}

    /// The order reached the dispatcher, before its admission decision.
    fn on_order_generated(&mut self, _order: &Order, _now: SimTime) {}

    /// The order passed admission and was committed to a worker.
    fn on_order_admitted(&mut self, _order: &Order, _proposal: &Proposal, _now: SimTime) {}

    /// The order was refused at admission.
    fn on_order_rejected(&mut self, _order: &Order, _reason: FailureReason, _now: SimTime) {}

    fn on_order_picked_up(&mut self, _order: &Order, _worker: WorkerId, _now: SimTime) {}

    fn on_order_delivered(&mut self, _order: &Order, _worker: WorkerId, _now: SimTime) {}

    /// An admitted order was still open when the service window closed.
    fn on_order_failed(&mut self, _order: &Order, _reason: FailureReason, _now: SimTime) {}

    fn on_worker_transition(
        &mut self,
        _worker: WorkerId,
        _from:   WorkerState,
        _to:     WorkerState,
        _now:    SimTime,
    ) {}

    /// Called once after the last event.  `end` is the close time.
    fn on_sim_end(&mut self, _end: SimTime, _events: u64) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

impl<T: SimObserver + ?Sized> SimObserver for &mut T {
    fn on_event(&mut self, event: &Event) {
        (**self).on_event(event)
    }
    fn on_order_generated(&mut self, order: &Order, now: SimTime) {
        (**self).on_order_generated(order, now)
    }
    fn on_order_admitted(&mut self, order: &Order, proposal: &Proposal, now: SimTime) {
        (**self).on_order_admitted(order, proposal, now)
    }
    fn on_order_rejected(&mut self, order: &Order, reason: FailureReason, now: SimTime) {
        (**self).on_order_rejected(order, reason, now)
    }
    fn on_order_picked_up(&mut self, order: &Order, worker: WorkerId, now: SimTime) {
        (**self).on_order_picked_up(order, worker, now)
    }
    fn on_order_delivered(&mut self, order: &Order, worker: WorkerId, now: SimTime) {
        (**self).on_order_delivered(order, worker, now)
    }
    fn on_order_failed(&mut self, order: &Order, reason: FailureReason, now: SimTime) {
        (**self).on_order_failed(order, reason, now)
    }
    fn on_worker_transition(&mut self, worker: WorkerId, from: WorkerState, to: WorkerState, now: SimTime) {
        (**self).on_worker_transition(worker, from, to, now)
    }
    fn on_sim_end(&mut self, end: SimTime, events: u64) {
        (**self).on_sim_end(end, events)
    }
}

/// Fan out to two observers, left first.
impl<A: SimObserver, B: SimObserver> SimObserver for (A, B) {
    fn on_event(&mut self, event: &Event) {
        self.0.on_event(event);
        self.1.on_event(event);
    }
    fn on_order_generated(&mut self, order: &Order, now: SimTime) {
        self.0.on_order_generated(order, now);
        self.1.on_order_generated(order, now);
    }
    fn on_order_admitted(&mut self, order: &Order, proposal: &Proposal, now: SimTime) {
        self.0.on_order_admitted(order, proposal, now);
        self.1.on_order_admitted(order, proposal, now);
    }
    fn on_order_rejected(&mut self, order: &Order, reason: FailureReason, now: SimTime) {
        self.0.on_order_rejected(order, reason, now);
        self.1.on_order_rejected(order, reason, now);
    }
    fn on_order_picked_up(&mut self, order: &Order, worker: WorkerId, now: SimTime) {
        self.0.on_order_picked_up(order, worker, now);
        self.1.on_order_picked_up(order, worker, now);
    }
    fn on_order_delivered(&mut self, order: &Order, worker: WorkerId, now: SimTime) {
        self.0.on_order_delivered(order, worker, now);
        self.1.on_order_delivered(order, worker, now);
    }
    fn on_order_failed(&mut self, order: &Order, reason: FailureReason, now: SimTime) {
        self.0.on_order_failed(order, reason, now);
        self.1.on_order_failed(order, reason, now);
    }
    fn on_worker_transition(&mut self, worker: WorkerId, from: WorkerState, to: WorkerState, now: SimTime) {
        self.0.on_worker_transition(worker, from, to, now);
        self.1.on_worker_transition(worker, from, to, now);
    }
    fn on_sim_end(&mut self, end: SimTime, events: u64) {
        self.0.on_sim_end(end, events);
        self.1.on_sim_end(end, events);
    }
}
