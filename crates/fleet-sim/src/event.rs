//! Simulation events.

use std::fmt;

use fleet_core::{OrderId, SimTime, WorkerId};

/// What happens when an event fires.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    OrderArrival(OrderId),
    WorkerDeparts(WorkerId),
    /// `seq` identifies the leg; a mismatch means the leg was superseded.
    WorkerArrives { worker: WorkerId, seq: u32 },
    PrepComplete(OrderId),
    ServiceWindowClose,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::OrderArrival(_)      => "order_arrival",
            EventKind::WorkerDeparts(_)     => "worker_departs",
            EventKind::WorkerArrives { .. } => "worker_arrives",
            EventKind::PrepComplete(_)      => "prep_complete",
            EventKind::ServiceWindowClose   => "service_window_close",
        }
    }
}

/// An immutable scheduled event.  `seq` is the queue's insertion counter and
/// breaks ties between events at the same `time`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub time: SimTime,
    pub seq:  u64,
    pub kind: EventKind,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} {}", self.time, self.seq, self.kind.label())
    }
}
