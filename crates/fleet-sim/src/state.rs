//! Per-replication mutable state.
//!
//! Everything a replication mutates lives in one [`SimulationState`] value
//! owned by the [`Sim`][crate::Sim] and passed by `&mut` into each handler.
//! The scenario (network, oracle, configs) is borrowed read-only alongside.

use fleet_core::{NodeId, OrderId, SimTime, WorkerId};
use fleet_demand::{Order, OrderStatus};
use fleet_dispatch::Worker;

use crate::queue::EventQueue;

/// Progress of one order through its status machine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderProgress {
    pub status:       OrderStatus,
    pub worker:       Option<WorkerId>,
    pub accepted_at:  Option<SimTime>,
    pub ready_at:     Option<SimTime>,
    /// Drop-off time planned when the order was accepted.
    pub promised_eta: Option<SimTime>,
    pub picked_up_at: Option<SimTime>,
    pub delivered_at: Option<SimTime>,
}

pub struct SimulationState {
    /// Immutable order book, indexed by `OrderId`.
    pub orders:   Vec<Order>,
    /// Indexed by `OrderId`.
    pub progress: Vec<OrderProgress>,
    /// Indexed by `WorkerId`.
    pub workers:  Vec<Worker>,
    pub queue:    EventQueue,
    pub events:   u64,
}

impl SimulationState {
    pub fn new(orders: Vec<Order>, worker_count: u32, depot: NodeId, horizon: SimTime) -> Self {
        let progress = vec![OrderProgress::default(); orders.len()];
        let workers = (0..worker_count)
            .map(|i| Worker::new(WorkerId(i), depot))
            .collect();
        Self {
            orders,
            progress,
            workers,
            queue: EventQueue::new(horizon),
            events: 0,
        }
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        self.queue.now()
    }

    #[inline]
    pub fn order(&self, id: OrderId) -> &Order {
        &self.orders[id.index()]
    }

    #[inline]
    pub fn progress(&self, id: OrderId) -> &OrderProgress {
        &self.progress[id.index()]
    }

    /// Move `id` to `status`.  Illegal transitions are engine bugs.
    pub fn set_status(&mut self, id: OrderId, status: OrderStatus) {
        let p = &mut self.progress[id.index()];
        debug_assert!(
            p.status.can_become(status),
            "order {id}: illegal transition {} → {status}",
            p.status
        );
        p.status = status;
    }

    /// Orders not yet delivered or failed, ascending by id.
    pub fn open_orders(&self) -> impl Iterator<Item = OrderId> + '_ {
        self.progress
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.status.is_terminal())
            .map(|(i, _)| OrderId(i as u32))
    }
}
