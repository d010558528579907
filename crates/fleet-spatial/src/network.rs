//! Waypoint network representation and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for outgoing edges.
//! Given a `NodeId n`, its outgoing edges occupy the `EdgeId` range
//!
//! ```text
//! node_out_start[n] .. node_out_start[n+1]
//! ```
//!
//! All edge arrays (`edge_from`, `edge_to`, `edge_length_m`,
//! `edge_travel_ms`) are sorted by source node, so a node's neighbours are a
//! contiguous scan, which is what the oracle's Dijkstra inner loop wants.
//!
//! # Course, depot, pickups
//!
//! On top of the raw graph a network declares:
//!
//! - the **depot** (clubhouse), where workers start and return to;
//! - the **course**: the cyclic play sequence of waypoints customers occupy;
//! - **pickup** nodes: kitchens where orders are prepared.  The depot is
//!   always the first pickup; extra kitchens (a halfway house) may follow.
//!
//! # Zones
//!
//! Zones are named cluster centres.  Each node belongs to the zone whose
//! centre is nearest in lat/lon space, resolved once at build time through an
//! R-tree (via `rstar`).  A network built without zones gets a single zone
//! named `"course"`.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use fleet_core::{ConfigError, EdgeId, GeoPoint, NodeId, ZoneId};

use crate::{SpatialError, SpatialResult};

/// Reference speed used when the builder is not told otherwise: a brisk walk
/// with a loaded tray, in metres per second.
pub const DEFAULT_REFERENCE_SPEED_MPS: f32 = 1.4;

// ── R-tree zone entry ─────────────────────────────────────────────────────────

#[derive(Clone)]
struct ZoneEntry {
    point: [f32; 2], // [lat, lon]
    id:    ZoneId,
}

impl RTreeObject for ZoneEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for ZoneEntry {
    /// Squared Euclidean distance in lat/lon space; fine at property scale.
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let dlat = self.point[0] - point[0];
        let dlon = self.point[1] - point[1];
        dlat * dlat + dlon * dlon
    }
}

// ── Zone ──────────────────────────────────────────────────────────────────────

/// A named cluster of waypoints used for per-zone reporting.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Zone {
    pub id:     ZoneId,
    pub name:   String,
    pub center: GeoPoint,
}

// ── WaypointNetwork ───────────────────────────────────────────────────────────

/// Directed waypoint graph in CSR format plus the course/depot/zone overlay.
///
/// Edge arrays are `pub` for direct indexed access on hot paths.  Construct
/// with [`WaypointNetworkBuilder`].
pub struct WaypointNetwork {
    // ── Node data ─────────────────────────────────────────────────────────
    /// Geographic position of each node.  Indexed by `NodeId`.
    pub node_pos: Vec<GeoPoint>,

    // ── CSR edge adjacency ────────────────────────────────────────────────
    /// CSR row pointer; length = `node_count + 1`.
    pub node_out_start: Vec<u32>,

    /// Source node of each edge.
    pub edge_from: Vec<NodeId>,

    /// Destination node of each edge.
    pub edge_to: Vec<NodeId>,

    /// Length of each edge in metres.
    pub edge_length_m: Vec<f32>,

    /// Traversal time in milliseconds at the reference speed.
    pub edge_travel_ms: Vec<u32>,

    // ── Overlay ───────────────────────────────────────────────────────────
    depot:               NodeId,
    course:              Vec<NodeId>,
    /// Position of each node in `course`, `u32::MAX` for off-course nodes.
    course_index:        Vec<u32>,
    pickups:             Vec<NodeId>,
    zones:               Vec<Zone>,
    node_zone:           Vec<ZoneId>,
    zone_idx:            RTree<ZoneEntry>,
    reference_speed_mps: f32,
}

impl WaypointNetwork {
    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn node_count(&self) -> usize {
        self.node_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_to.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_pos.is_empty()
    }

    #[inline]
    pub fn contains(&self, node: NodeId) -> bool {
        node.index() < self.node_count()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// `EdgeId`s of all outgoing edges from `node` (a contiguous range).
    #[inline]
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    #[inline]
    pub fn out_degree(&self, node: NodeId) -> usize {
        let start = self.node_out_start[node.index()] as usize;
        let end   = self.node_out_start[node.index() + 1] as usize;
        end - start
    }

    /// Direct neighbours of `node` with the reference traversal time in ms.
    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = (NodeId, u32)> + '_ {
        self.out_edges(node)
            .map(|e| (self.edge_to[e.index()], self.edge_travel_ms[e.index()]))
    }

    // ── Overlay accessors ─────────────────────────────────────────────────

    #[inline]
    pub fn depot(&self) -> NodeId {
        self.depot
    }

    /// Course waypoints in play order.  The sequence is cyclic.
    #[inline]
    pub fn course(&self) -> &[NodeId] {
        &self.course
    }

    /// Position of `node` in the course sequence, if it is on the course.
    pub fn course_position(&self, node: NodeId) -> Option<usize> {
        match self.course_index.get(node.index()) {
            Some(&i) if i != u32::MAX => Some(i as usize),
            _ => None,
        }
    }

    /// The waypoint `steps` positions after `node` along the cyclic course.
    ///
    /// Off-course nodes are returned unchanged.
    pub fn course_advance(&self, node: NodeId, steps: usize) -> NodeId {
        match self.course_position(node) {
            Some(i) => self.course[(i + steps) % self.course.len()],
            None => node,
        }
    }

    /// Kitchens, depot first.
    #[inline]
    pub fn pickups(&self) -> &[NodeId] {
        &self.pickups
    }

    pub fn is_pickup(&self, node: NodeId) -> bool {
        self.pickups.contains(&node)
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id.index())
    }

    /// Zone of a waypoint (nearest zone centre, resolved at build time).
    #[inline]
    pub fn zone_of(&self, node: NodeId) -> ZoneId {
        self.node_zone[node.index()]
    }

    /// Zone nearest to an arbitrary position.
    pub fn zone_at(&self, pos: GeoPoint) -> ZoneId {
        snap_zone(&self.zone_idx, pos)
    }

    #[inline]
    pub fn reference_speed_mps(&self) -> f32 {
        self.reference_speed_mps
    }
}

// ── WaypointNetworkBuilder ────────────────────────────────────────────────────

/// Construct a [`WaypointNetwork`] incrementally, then call
/// [`build`](Self::build).
///
/// # Example
///
/// ```
/// use fleet_core::GeoPoint;
/// use fleet_spatial::WaypointNetworkBuilder;
///
/// let mut b = WaypointNetworkBuilder::new();
/// let club = b.add_node(GeoPoint::new(33.500, -84.000));
/// let tee1 = b.add_node(GeoPoint::new(33.501, -84.000));
/// let tee2 = b.add_node(GeoPoint::new(33.502, -84.000));
/// b.add_path(club, tee1, 120.0, 90_000);
/// b.add_path(tee1, tee2, 120.0, 90_000);
/// b.add_path(tee2, club, 240.0, 180_000);
/// b.set_depot(club);
/// b.set_course(vec![tee1, tee2]);
/// let net = b.build().unwrap();
/// assert_eq!(net.edge_count(), 6);
/// ```
pub struct WaypointNetworkBuilder {
    nodes:               Vec<GeoPoint>,
    raw_edges:           Vec<RawEdge>,
    depot:               Option<NodeId>,
    course:              Vec<NodeId>,
    extra_pickups:       Vec<NodeId>,
    zones:               Vec<(String, GeoPoint)>,
    reference_speed_mps: f32,
}

struct RawEdge {
    from:      NodeId,
    to:        NodeId,
    length_m:  f32,
    travel_ms: u32,
}

impl WaypointNetworkBuilder {
    pub fn new() -> Self {
        Self {
            nodes:               Vec::new(),
            raw_edges:           Vec::new(),
            depot:               None,
            course:              Vec::new(),
            extra_pickups:       Vec::new(),
            zones:               Vec::new(),
            reference_speed_mps: DEFAULT_REFERENCE_SPEED_MPS,
        }
    }

    /// Add a waypoint and return its `NodeId` (sequential from 0).
    pub fn add_node(&mut self, pos: GeoPoint) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(pos);
        id
    }

    /// Add a **directed** edge.  `travel_ms` is the traversal time at the
    /// reference speed.
    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId, length_m: f32, travel_ms: u32) {
        self.raw_edges.push(RawEdge { from, to, length_m, travel_ms });
    }

    /// Add a two-way path (the usual case for cart paths and fairways).
    pub fn add_path(&mut self, a: NodeId, b: NodeId, length_m: f32, travel_ms: u32) {
        self.add_directed_edge(a, b, length_m, travel_ms);
        self.add_directed_edge(b, a, length_m, travel_ms);
    }

    /// Add a two-way path whose length is the great-circle distance between
    /// the endpoints and whose time follows from the reference speed.
    ///
    /// Call [`reference_speed_mps`](Self::reference_speed_mps) first if the
    /// default does not apply.
    pub fn add_straight_path(&mut self, a: NodeId, b: NodeId) {
        let length_m  = self.nodes[a.index()].distance_m(self.nodes[b.index()]);
        let travel_ms = (length_m / self.reference_speed_mps * 1000.0).ceil() as u32;
        self.add_path(a, b, length_m, travel_ms);
    }

    pub fn set_depot(&mut self, node: NodeId) -> &mut Self {
        self.depot = Some(node);
        self
    }

    /// The cyclic play sequence of customer waypoints.
    pub fn set_course(&mut self, course: Vec<NodeId>) -> &mut Self {
        self.course = course;
        self
    }

    /// An additional kitchen besides the depot.
    pub fn add_pickup(&mut self, node: NodeId) -> &mut Self {
        if !self.extra_pickups.contains(&node) {
            self.extra_pickups.push(node);
        }
        self
    }

    /// Declare a named zone centred on `center`; returns its id.
    pub fn add_zone(&mut self, name: impl Into<String>, center: GeoPoint) -> ZoneId {
        let id = ZoneId(self.zones.len().min(u16::MAX as usize) as u16);
        self.zones.push((name.into(), center));
        id
    }

    pub fn reference_speed_mps(&mut self, mps: f32) -> &mut Self {
        self.reference_speed_mps = mps;
        self
    }

    pub fn node_count(&self) -> usize { self.nodes.len() }
    pub fn edge_count(&self) -> usize { self.raw_edges.len() }

    /// Validate and produce a [`WaypointNetwork`].
    ///
    /// Fails on a missing depot, an empty or duplicated course, references to
    /// unknown nodes, or a non-positive reference speed.  Connectivity is
    /// checked later, by the oracle.
    pub fn build(self) -> SpatialResult<WaypointNetwork> {
        let node_count = self.nodes.len();
        let valid = |n: NodeId| n.index() < node_count;

        if !(self.reference_speed_mps.is_finite() && self.reference_speed_mps > 0.0) {
            return Err(ConfigError::invalid(
                "reference_speed_mps",
                format!("must be positive, got {}", self.reference_speed_mps),
            )
            .into());
        }

        let depot = self.depot.ok_or(SpatialError::MissingDepot)?;
        if !valid(depot) {
            return Err(SpatialError::NodeNotFound(depot));
        }

        if self.course.is_empty() {
            return Err(SpatialError::EmptyCourse);
        }
        let mut course_index = vec![u32::MAX; node_count];
        for (i, &n) in self.course.iter().enumerate() {
            if !valid(n) {
                return Err(SpatialError::NodeNotFound(n));
            }
            if n == depot {
                return Err(SpatialError::DepotOnCourse(n));
            }
            if course_index[n.index()] != u32::MAX {
                return Err(SpatialError::DuplicateCourseNode(n));
            }
            course_index[n.index()] = i as u32;
        }

        for e in &self.raw_edges {
            for n in [e.from, e.to] {
                if !valid(n) {
                    return Err(SpatialError::NodeNotFound(n));
                }
            }
        }

        let mut pickups = vec![depot];
        for &p in &self.extra_pickups {
            if !valid(p) {
                return Err(SpatialError::NodeNotFound(p));
            }
            if p != depot {
                pickups.push(p);
            }
        }

        // ── CSR ───────────────────────────────────────────────────────────
        let mut raw = self.raw_edges;
        raw.sort_by_key(|e| (e.from.0, e.to.0));

        let edge_from:      Vec<NodeId> = raw.iter().map(|e| e.from).collect();
        let edge_to:        Vec<NodeId> = raw.iter().map(|e| e.to).collect();
        let edge_length_m:  Vec<f32>    = raw.iter().map(|e| e.length_m).collect();
        let edge_travel_ms: Vec<u32>    = raw.iter().map(|e| e.travel_ms).collect();

        let mut node_out_start = vec![0u32; node_count + 1];
        for e in &raw {
            node_out_start[e.from.index() + 1] += 1;
        }
        for i in 1..=node_count {
            node_out_start[i] += node_out_start[i - 1];
        }

        // ── Zones ─────────────────────────────────────────────────────────
        let mut zone_defs = self.zones;
        if zone_defs.len() > u16::MAX as usize {
            return Err(SpatialError::TooManyZones(zone_defs.len()));
        }
        if zone_defs.is_empty() {
            let center = GeoPoint::centroid(&self.nodes).unwrap_or(GeoPoint::new(0.0, 0.0));
            zone_defs.push(("course".to_string(), center));
        }
        let zones: Vec<Zone> = zone_defs
            .into_iter()
            .enumerate()
            .map(|(i, (name, center))| Zone { id: ZoneId(i as u16), name, center })
            .collect();
        let zone_idx = RTree::bulk_load(
            zones
                .iter()
                .map(|z| ZoneEntry { point: z.center.as_array(), id: z.id })
                .collect(),
        );
        let node_zone: Vec<ZoneId> = self.nodes.iter().map(|p| snap_zone(&zone_idx, *p)).collect();

        log::debug!(
            "waypoint network built: {} nodes, {} edges, {} course waypoints, {} zones",
            node_count,
            edge_to.len(),
            self.course.len(),
            zones.len()
        );

        Ok(WaypointNetwork {
            node_pos: self.nodes,
            node_out_start,
            edge_from,
            edge_to,
            edge_length_m,
            edge_travel_ms,
            depot,
            course: self.course,
            course_index,
            pickups,
            zones,
            node_zone,
            zone_idx,
            reference_speed_mps: self.reference_speed_mps,
        })
    }
}

impl Default for WaypointNetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Nearest zone centre to `p`.  Equidistant centres resolve to the lower
/// zone id so the mapping never depends on R-tree internals.
fn snap_zone(idx: &RTree<ZoneEntry>, p: GeoPoint) -> ZoneId {
    let mut hits = idx.nearest_neighbor_iter_with_distance_2(&p.as_array());
    let Some((first, d_min)) = hits.next() else {
        return ZoneId(0);
    };
    hits.take_while(|(_, d)| *d <= d_min)
        .map(|(e, _)| e.id)
        .fold(first.id, ZoneId::min)
}
