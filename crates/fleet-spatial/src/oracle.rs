//! All-pairs travel-time oracle.
//!
//! # Why all-pairs
//!
//! A course network has at most a few hundred waypoints, while the dispatch
//! policy asks for travel times millions of times per replication.  Running
//! Dijkstra once from every node at scenario build time turns each query
//! into a single array read, and the resulting matrix is shared read-only by
//! every replication.
//!
//! # Cost units
//!
//! Costs are accumulated in **milliseconds** (`u32`) and exposed in whole
//! **seconds**, rounded up, through [`TravelTime::time`].  Because rounding up
//! is subadditive, `ceil(ac) ≤ ceil(ab) + ceil(bc)` whenever the millisecond
//! costs satisfy the triangle inequality, so rounding never introduces a
//! violation on its own.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use fleet_core::{ConfigError, EdgeId, NodeId};

use crate::network::WaypointNetwork;
use crate::{SpatialError, SpatialResult};

// ── TravelTime trait ──────────────────────────────────────────────────────────

/// Read-only travel-time queries.
///
/// The dispatch layer depends on this trait rather than on the concrete
/// oracle so tests can substitute hand-written tables.  Implementations must
/// be `Send + Sync`: replications on different threads query the same
/// instance.
pub trait TravelTime: Send + Sync {
    /// Travel time in whole seconds from `from` to `to`.
    fn time(&self, from: NodeId, to: NodeId) -> u64;

    /// Number of nodes the table covers.
    fn node_count(&self) -> usize;

    /// Waypoints on the shortest path, `from` and `to` inclusive.
    fn path(&self, from: NodeId, to: NodeId) -> Vec<NodeId>;

    /// `time(a, b) + time(b, a)`.
    fn round_trip(&self, a: NodeId, b: NodeId) -> u64 {
        self.time(a, b) + self.time(b, a)
    }
}

// ── CostModel ─────────────────────────────────────────────────────────────────

/// How an edge's traversal cost is derived.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CostModel {
    /// Use each edge's surveyed travel time at the network's reference speed.
    #[default]
    Reference,
    /// Derive each edge's time from its length at a fixed speed (m/s).
    Speed { mps: f32 },
}

impl CostModel {
    fn validate(self) -> SpatialResult<()> {
        match self {
            CostModel::Reference => Ok(()),
            CostModel::Speed { mps } if mps.is_finite() && mps > 0.0 => Ok(()),
            CostModel::Speed { mps } => Err(ConfigError::invalid(
                "speed_mps",
                format!("must be positive, got {mps}"),
            )
            .into()),
        }
    }

    #[inline]
    fn edge_cost_ms(self, network: &WaypointNetwork, edge: EdgeId) -> u32 {
        match self {
            CostModel::Reference => network.edge_travel_ms[edge.index()],
            CostModel::Speed { mps } => {
                (network.edge_length_m[edge.index()] / mps * 1000.0).ceil() as u32
            }
        }
    }
}

// ── TravelTimeOracle ──────────────────────────────────────────────────────────

/// Dense `K × K` shortest-path table with predecessor links for path
/// reconstruction.
pub struct TravelTimeOracle {
    n:       usize,
    /// `cost_ms[from * n + to]`.
    cost_ms: Vec<u32>,
    /// `prev[from * n + v]` = node preceding `v` on the shortest path from
    /// `from`; `NodeId::INVALID` for `v == from`.
    prev:    Vec<NodeId>,
    model:   CostModel,
}

impl TravelTimeOracle {
    /// Run single-source Dijkstra from every node.
    ///
    /// Fails with [`SpatialError::Disconnected`] if any node cannot reach any
    /// other: every waypoint must be servable from every kitchen and back.
    pub fn build(network: &WaypointNetwork, model: CostModel) -> SpatialResult<Self> {
        model.validate()?;
        let n = network.node_count();
        let mut cost_ms = vec![u32::MAX; n * n];
        let mut prev    = vec![NodeId::INVALID; n * n];

        for s in 0..n {
            let row = s * n..(s + 1) * n;
            dijkstra_from(
                network,
                NodeId(s as u32),
                model,
                &mut cost_ms[row.clone()],
                &mut prev[row],
            );
            if let Some(v) = cost_ms[s * n..(s + 1) * n].iter().position(|&c| c == u32::MAX) {
                return Err(SpatialError::Disconnected {
                    from: NodeId(s as u32),
                    to:   NodeId(v as u32),
                });
            }
        }

        log::debug!("travel-time oracle built for {n} nodes ({model:?})");
        Ok(Self { n, cost_ms, prev, model })
    }

    pub fn cost_model(&self) -> CostModel {
        self.model
    }

    /// Shortest travel time in milliseconds.
    #[inline]
    pub fn time_ms(&self, from: NodeId, to: NodeId) -> u32 {
        self.cost_ms[from.index() * self.n + to.index()]
    }

    /// The candidate reachable from `origin` soonest (ties → lowest id).
    pub fn nearest_to(&self, origin: NodeId, candidates: &[NodeId]) -> Option<NodeId> {
        candidates
            .iter()
            .copied()
            .min_by_key(|&c| (self.time_ms(c, origin), c))
    }

    /// Verify `time(a,c) ≤ time(a,b) + time(b,c) + tolerance` for all
    /// triples, in whole seconds.
    ///
    /// Shortest paths satisfy this by construction; a violation means the
    /// table was corrupted or built from an inconsistent network, which is a
    /// configuration error.
    pub fn check_triangle_inequality(&self, tolerance_secs: u64) -> SpatialResult<()> {
        let n = self.n;
        for a in 0..n {
            let (a_id, base_a) = (NodeId(a as u32), a * n);
            for b in 0..n {
                let ab = secs(self.cost_ms[base_a + b]);
                let base_b = b * n;
                for c in 0..n {
                    let ac = secs(self.cost_ms[base_a + c]);
                    let bound = ab + secs(self.cost_ms[base_b + c]) + tolerance_secs;
                    if ac > bound {
                        return Err(SpatialError::TriangleViolation {
                            a:           a_id,
                            b:           NodeId(b as u32),
                            c:           NodeId(c as u32),
                            excess_secs: ac - bound,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl TravelTime for TravelTimeOracle {
    #[inline]
    fn time(&self, from: NodeId, to: NodeId) -> u64 {
        secs(self.time_ms(from, to))
    }

    fn node_count(&self) -> usize {
        self.n
    }

    fn path(&self, from: NodeId, to: NodeId) -> Vec<NodeId> {
        let base = from.index() * self.n;
        let mut nodes = vec![to];
        let mut cur = to;
        while cur != from {
            let p = self.prev[base + cur.index()];
            if p == NodeId::INVALID {
                break;
            }
            nodes.push(p);
            cur = p;
        }
        nodes.reverse();
        nodes
    }
}

#[inline]
fn secs(ms: u32) -> u64 {
    (ms as u64).div_ceil(1000)
}

// ── Dijkstra internals ────────────────────────────────────────────────────────

/// Full single-source Dijkstra writing into one row of the tables.
fn dijkstra_from(
    network: &WaypointNetwork,
    from:    NodeId,
    model:   CostModel,
    dist:    &mut [u32],
    prev:    &mut [NodeId],
) {
    dist[from.index()] = 0;

    // Min-heap on (cost, node); NodeId as secondary key keeps tie-breaking
    // deterministic.
    let mut heap: BinaryHeap<Reverse<(u32, NodeId)>> = BinaryHeap::new();
    heap.push(Reverse((0, from)));

    while let Some(Reverse((cost, node))) = heap.pop() {
        if cost > dist[node.index()] {
            continue;
        }
        for edge in network.out_edges(node) {
            let neighbor = network.edge_to[edge.index()];
            let new_cost = cost.saturating_add(model.edge_cost_ms(network, edge));
            if new_cost < dist[neighbor.index()] {
                dist[neighbor.index()] = new_cost;
                prev[neighbor.index()] = node;
                heap.push(Reverse((new_cost, neighbor)));
            }
        }
    }
}
