//! The order record and its status machine.
//!
//! An [`Order`] is immutable once generated.  Everything that changes while
//! a replication runs (status, owning worker, progress timestamps) lives in
//! the simulation layer's per-replication progress table, keyed by
//! `OrderId`.

use std::fmt;

use fleet_core::{NodeId, OrderId, SimTime, ZoneId};

// ── Order ─────────────────────────────────────────────────────────────────────

/// One customer order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Order {
    pub id:          OrderId,
    /// When the customer placed the order.
    pub arrival:     SimTime,
    /// Waypoint the customer ordered from.
    pub origin:      NodeId,
    /// Waypoint where the runner hands the order over.
    pub destination: NodeId,
    /// Kitchen that prepares the order.
    pub pickup:      NodeId,
    /// Kitchen preparation time, counted from acceptance.
    pub prep_secs:   u64,
    /// Promised delivery time (`arrival + sla`).
    pub deadline:    SimTime,
    /// Reporting zone of the destination.
    pub zone:        ZoneId,
}

impl Order {
    /// The service-level target this order was promised, in seconds.
    #[inline]
    pub fn sla_secs(&self) -> u64 {
        self.deadline.since(self.arrival)
    }

    /// `true` if a delivery at `t` would miss the deadline.
    #[inline]
    pub fn is_late_at(&self, t: SimTime) -> bool {
        t > self.deadline
    }
}

// ── FailureReason ─────────────────────────────────────────────────────────────

/// Why an order ended in the `failed` state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailureReason {
    /// No worker could deliver it before its deadline.
    EtaExceeded,
    /// Every worker already held the maximum number of orders.
    QueueSaturated,
    /// Still open when the service window closed.
    ServiceWindowClosed,
}

impl FailureReason {
    pub const ALL: [FailureReason; 3] = [
        FailureReason::EtaExceeded,
        FailureReason::QueueSaturated,
        FailureReason::ServiceWindowClosed,
    ];

    /// `true` for reasons decided at admission time (the order never
    /// entered any worker's plan).
    pub fn is_admission(self) -> bool {
        matches!(self, FailureReason::EtaExceeded | FailureReason::QueueSaturated)
    }

    pub fn label(self) -> &'static str {
        match self {
            FailureReason::EtaExceeded         => "eta_exceeded",
            FailureReason::QueueSaturated      => "queue_saturated",
            FailureReason::ServiceWindowClosed => "service_window_closed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── OrderStatus ───────────────────────────────────────────────────────────────

/// Lifecycle of one order:
///
/// ```text
/// generated → queued → assigned → picked_up → delivered
///     └──────────┴─────────┴──────────┴──────→ failed(reason)
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderStatus {
    #[default]
    Generated,
    Queued,
    Assigned,
    PickedUp,
    Delivered,
    Failed(FailureReason),
}

impl OrderStatus {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Failed(_))
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_become(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Delivered | Failed(_), _) => false,
            (_, Failed(_))             => true,
            (Generated, Queued)        => true,
            (Queued, Assigned)         => true,
            (Assigned, PickedUp)       => true,
            (PickedUp, Delivered)      => true,
            _                          => false,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Generated => "generated",
            OrderStatus::Queued    => "queued",
            OrderStatus::Assigned  => "assigned",
            OrderStatus::PickedUp  => "picked_up",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Failed(r) => r.label(),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Failed(r) => write!(f, "failed({r})"),
            other => f.write_str(other.label()),
        }
    }
}
