//! A synthetic nine-hole course.
//!
//! The clubhouse is the depot and main kitchen; a halfway house between the
//! fourth and sixth holes is a second kitchen.  Cart paths run hole to hole
//! in play order with two short cuts back towards the clubhouse.

use fleet_core::{GeoPoint, NodeId};
use fleet_spatial::{WaypointNetwork, WaypointNetworkBuilder};

/// Cart speed on paths, m/s (about 16 km/h).
const CART_SPEED_MPS: f32 = 4.5;

/// Green positions of holes 1–9.
const HOLES: [(f32, f32); 9] = [
    (33.5032, -82.0231),
    (33.5061, -82.0262),
    (33.5093, -82.0248),
    (33.5110, -82.0205),
    (33.5098, -82.0161),
    (33.5067, -82.0139),
    (33.5036, -82.0152),
    (33.5018, -82.0184),
    (33.5009, -82.0213),
];

/// Build the course.  Returns the network plus the clubhouse and halfway
/// house node ids.
pub fn build_course() -> anyhow::Result<(WaypointNetwork, NodeId, NodeId)> {
    let mut b = WaypointNetworkBuilder::new();
    b.reference_speed_mps(CART_SPEED_MPS);

    let clubhouse = b.add_node(GeoPoint::new(33.5012, -82.0240));
    let holes: Vec<NodeId> = HOLES
        .iter()
        .map(|&(lat, lon)| b.add_node(GeoPoint::new(lat, lon)))
        .collect();
    let halfway = b.add_node(GeoPoint::new(33.5085, -82.0175));

    // Play order, out from and back to the clubhouse.
    b.add_straight_path(clubhouse, holes[0]);
    for pair in holes.windows(2) {
        b.add_straight_path(pair[0], pair[1]);
    }
    b.add_straight_path(holes[8], clubhouse);

    // Halfway house sits off holes 4 and 6.
    b.add_straight_path(holes[3], halfway);
    b.add_straight_path(halfway, holes[5]);

    // Service roads.
    b.add_straight_path(clubhouse, holes[2]);
    b.add_straight_path(halfway, holes[7]);

    b.set_depot(clubhouse);
    b.set_course(holes.clone());
    b.add_pickup(halfway);

    b.add_zone("front", GeoPoint::new(33.5062, -82.0247));
    b.add_zone("turn", GeoPoint::new(33.5095, -82.0180));
    b.add_zone("home", GeoPoint::new(33.5025, -82.0170));

    Ok((b.build()?, clubhouse, halfway))
}
