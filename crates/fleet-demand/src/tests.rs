//! Unit tests for fleet-demand.

use std::sync::Arc;

use fleet_core::{ConfigError, GeoPoint, NodeId, SimRng, SimTime};
use fleet_spatial::{CostModel, TravelTimeOracle, WaypointNetwork, WaypointNetworkBuilder};

use crate::{
    CountSampling, CustomerDrift, DemandConfig, DemandError, DemandGenerator, PrepTime,
    RateBucket, RateProfile,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Loop `D → A → B → C → E → D`, 60 s per hop, plus a halfway kitchen `H`
/// 10 s off `C`.  Course order: A, B, C, E.
fn kitchen_network() -> (Arc<WaypointNetwork>, TravelTimeOracle) {
    let mut b = WaypointNetworkBuilder::new();
    let d = b.add_node(GeoPoint::new(0.000, 0.000));
    let a = b.add_node(GeoPoint::new(0.001, 0.000));
    let bb = b.add_node(GeoPoint::new(0.002, 0.000));
    let c = b.add_node(GeoPoint::new(0.002, 0.001));
    let e = b.add_node(GeoPoint::new(0.001, 0.001));
    let h = b.add_node(GeoPoint::new(0.0025, 0.001));
    for (x, y) in [(d, a), (a, bb), (bb, c), (c, e), (e, d)] {
        b.add_path(x, y, 80.0, 60_000);
    }
    b.add_path(c, h, 15.0, 10_000);
    b.set_depot(d);
    b.set_course(vec![a, bb, c, e]);
    b.add_pickup(h);
    let net = b.build().unwrap();
    let oracle = TravelTimeOracle::build(&net, CostModel::Reference).unwrap();
    (Arc::new(net), oracle)
}

const D: NodeId = NodeId(0);
const A: NodeId = NodeId(1);
const B: NodeId = NodeId(2);
const C: NodeId = NodeId(3);
const E: NodeId = NodeId(4);
const H: NodeId = NodeId(5);

fn four_hour_config(rate: f64) -> DemandConfig {
    let profile = RateProfile::uniform(rate, SimTime::ZERO, SimTime::from_hours(4)).unwrap();
    DemandConfig::new(profile).sla_secs(1_800)
}

// ── RateProfile ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod profile {
    use super::*;

    #[test]
    fn uniform_splits_into_hours() {
        let p = RateProfile::uniform(12.0, SimTime::from_hours(1), SimTime::from_minutes(210)).unwrap();
        let b = p.buckets();
        assert_eq!(b.len(), 3);
        assert_eq!(b[0].start, SimTime::from_hours(1));
        assert_eq!(b[2].end, SimTime::from_minutes(210));
        assert_eq!(b[2].expected_orders, 6.0); // half an hour
        assert_eq!(p.expected_total(), 30.0);
        assert_eq!(p.start(), SimTime::from_hours(1));
        assert_eq!(p.end(), SimTime::from_minutes(210));
    }

    #[test]
    fn uniform_rejects_inverted_window() {
        let r = RateProfile::uniform(10.0, SimTime::from_hours(3), SimTime::from_hours(1));
        assert!(matches!(r, Err(ConfigError::InvalidBucket { index: 0, .. })));
    }

    #[test]
    fn hourly_buckets() {
        let p = RateProfile::hourly(&[1.0, 0.0, 3.0]).unwrap();
        assert_eq!(p.buckets().len(), 3);
        assert_eq!(p.buckets()[1].start, SimTime::from_hours(1));
        assert_eq!(p.end(), SimTime::from_hours(3));
    }

    #[test]
    fn empty_profile_rejected() {
        assert_eq!(RateProfile::hourly(&[]), Err(ConfigError::EmptyRateProfile));
    }

    #[test]
    fn negative_expectation_rejected() {
        let r = RateProfile::hourly(&[1.0, -2.0]);
        assert!(matches!(r, Err(ConfigError::InvalidBucket { index: 1, .. })));
        let r = RateProfile::hourly(&[f64::NAN]);
        assert!(matches!(r, Err(ConfigError::InvalidBucket { index: 0, .. })));
    }

    #[test]
    fn overlap_rejected_after_sorting() {
        let r = RateProfile::new(
            vec![
                RateBucket::new(SimTime::from_minutes(30), SimTime::from_minutes(90), 1.0),
                RateBucket::new(SimTime::ZERO, SimTime::from_minutes(60), 1.0),
            ],
            CountSampling::Poisson,
        );
        assert_eq!(r, Err(ConfigError::OverlappingBuckets { index: 1 }));
    }

    #[test]
    fn gapped_buckets_allowed() {
        let p = RateProfile::new(
            vec![
                RateBucket::new(SimTime::from_hours(2), SimTime::from_hours(3), 1.0),
                RateBucket::new(SimTime::ZERO, SimTime::from_hours(1), 1.0),
            ],
            CountSampling::Poisson,
        )
        .unwrap();
        assert_eq!(p.start(), SimTime::ZERO);
        assert_eq!(p.end(), SimTime::from_hours(3));
    }

    #[test]
    fn scaled_multiplies_expectations() {
        let p = RateProfile::hourly(&[2.0, 4.0]).unwrap().scaled(1.5).unwrap();
        assert_eq!(p.buckets()[0].expected_orders, 3.0);
        assert_eq!(p.buckets()[1].expected_orders, 6.0);

        let fixed = RateProfile::hourly(&[1.0])
            .unwrap()
            .with_sampling(CountSampling::FixedTotal(10))
            .unwrap()
            .scaled(2.0)
            .unwrap();
        assert_eq!(fixed.sampling(), CountSampling::FixedTotal(20));
    }

    #[test]
    fn negative_scale_rejected() {
        let p = RateProfile::hourly(&[2.0]).unwrap();
        assert!(matches!(p.scaled(-1.0), Err(ConfigError::InvalidParameter { .. })));
    }

    #[test]
    fn fixed_total_is_exact() {
        let p = RateProfile::hourly(&[1.0, 3.0, 0.0])
            .unwrap()
            .with_sampling(CountSampling::FixedTotal(40))
            .unwrap();
        for seed in 0..10 {
            let counts = p.sample_counts(&mut SimRng::new(seed));
            assert_eq!(counts.iter().sum::<u32>(), 40);
            assert_eq!(counts[2], 0, "zero-weight bucket drew orders");
        }
    }

    #[test]
    fn fixed_total_needs_positive_weight() {
        let r = RateProfile::hourly(&[0.0, 0.0])
            .unwrap()
            .with_sampling(CountSampling::FixedTotal(5));
        assert!(matches!(r, Err(ConfigError::InvalidParameter { name: "fixed_total", .. })));
    }

    #[test]
    fn zero_rate_draws_nothing() {
        let p = RateProfile::uniform(0.0, SimTime::ZERO, SimTime::from_hours(2)).unwrap();
        assert_eq!(p.sample_counts(&mut SimRng::new(7)), vec![0, 0]);
    }

    #[test]
    fn poisson_mean_is_plausible() {
        let p = RateProfile::hourly(&[20.0]).unwrap();
        let mut rng = SimRng::new(99);
        let total: u32 = (0..500).map(|_| p.sample_counts(&mut rng)[0]).sum();
        let mean = total as f64 / 500.0;
        assert!((18.0..22.0).contains(&mean), "mean {mean}");
    }
}

// ── Order status machine ──────────────────────────────────────────────────────

#[cfg(test)]
mod status {
    use crate::{FailureReason, OrderStatus};

    #[test]
    fn happy_path_transitions() {
        use OrderStatus::*;
        assert!(Generated.can_become(Queued));
        assert!(Queued.can_become(Assigned));
        assert!(Assigned.can_become(PickedUp));
        assert!(PickedUp.can_become(Delivered));
        assert!(!Generated.can_become(Delivered));
        assert!(!Assigned.can_become(Queued));
    }

    #[test]
    fn terminal_states_are_frozen() {
        use OrderStatus::*;
        let failed = Failed(FailureReason::EtaExceeded);
        assert!(Delivered.is_terminal() && failed.is_terminal());
        assert!(!Delivered.can_become(Failed(FailureReason::ServiceWindowClosed)));
        assert!(!failed.can_become(Delivered));
        assert!(PickedUp.can_become(Failed(FailureReason::ServiceWindowClosed)));
    }

    #[test]
    fn labels() {
        assert_eq!(OrderStatus::PickedUp.to_string(), "picked_up");
        assert_eq!(
            OrderStatus::Failed(FailureReason::QueueSaturated).to_string(),
            "failed(queue_saturated)"
        );
        assert!(FailureReason::EtaExceeded.is_admission());
        assert!(!FailureReason::ServiceWindowClosed.is_admission());
    }
}

// ── DemandGenerator ───────────────────────────────────────────────────────────

#[cfg(test)]
mod generator {
    use super::*;

    #[test]
    fn same_seed_same_orders() {
        let (net, oracle) = kitchen_network();
        let g = DemandGenerator::new(four_hour_config(10.0), net, &oracle).unwrap();
        assert_eq!(g.generate(42), g.generate(42));
        assert_ne!(g.generate(42), g.generate(43));
    }

    #[test]
    fn ids_follow_arrival_order() {
        let (net, oracle) = kitchen_network();
        let g = DemandGenerator::new(four_hour_config(20.0), net, &oracle).unwrap();
        let orders = g.generate(1);
        assert!(!orders.is_empty());
        for (i, o) in orders.iter().enumerate() {
            assert_eq!(o.id.index(), i);
        }
        assert!(orders.windows(2).all(|w| w[0].arrival <= w[1].arrival));
    }

    #[test]
    fn orders_respect_profile_and_sla() {
        let (net, oracle) = kitchen_network();
        let config = four_hour_config(20.0).prep(PrepTime { base_secs: 300, jitter_secs: 60 });
        let g = DemandGenerator::new(config, net.clone(), &oracle).unwrap();
        for o in g.generate(5) {
            assert!(o.arrival < SimTime::from_hours(4));
            assert_eq!(o.sla_secs(), 1_800);
            assert!((300..=360).contains(&o.prep_secs));
            assert!(net.course_position(o.origin).is_some());
            assert_eq!(o.destination, o.origin);
        }
        assert_eq!(g.last_arrival(), SimTime::from_hours(4));
    }

    #[test]
    fn pickup_is_nearest_kitchen() {
        let (net, oracle) = kitchen_network();
        let g = DemandGenerator::new(four_hour_config(40.0), net, &oracle).unwrap();
        let orders = g.generate(9);
        for (dest, kitchen) in [(A, D), (B, H), (C, H), (E, D)] {
            assert!(
                orders.iter().filter(|o| o.destination == dest).all(|o| o.pickup == kitchen),
                "wrong kitchen for {dest}"
            );
        }
    }

    #[test]
    fn weighted_origins() {
        let (net, oracle) = kitchen_network();
        let config = four_hour_config(20.0).origin_weights(vec![0.0, 0.0, 1.0, 0.0]);
        let g = DemandGenerator::new(config, net, &oracle).unwrap();
        let orders = g.generate(3);
        assert!(!orders.is_empty());
        assert!(orders.iter().all(|o| o.origin == C));
    }

    #[test]
    fn drift_moves_destination_along_course() {
        let (net, oracle) = kitchen_network();
        let config = four_hour_config(20.0)
            .drift(CustomerDrift { secs_per_waypoint: 600, lead_secs: 1_200 });
        let g = DemandGenerator::new(config, net.clone(), &oracle).unwrap();
        for o in g.generate(11) {
            assert_eq!(o.destination, net.course_advance(o.origin, 2));
        }
    }

    #[test]
    fn origin_weight_length_mismatch() {
        let (net, oracle) = kitchen_network();
        let config = four_hour_config(5.0).origin_weights(vec![1.0, 1.0]);
        let err = DemandGenerator::new(config, net, &oracle).err();
        assert_eq!(
            err,
            Some(DemandError::Config(ConfigError::LengthMismatch {
                what:     "origin_weights",
                expected: 4,
                got:      2,
            }))
        );
    }

    #[test]
    fn all_zero_weights_rejected() {
        let (net, oracle) = kitchen_network();
        let config = four_hour_config(5.0).origin_weights(vec![0.0; 4]);
        let err = DemandGenerator::new(config, net, &oracle).err();
        assert!(matches!(err, Some(DemandError::OriginWeights(_))));
    }

    #[test]
    fn zero_sla_rejected() {
        let (net, oracle) = kitchen_network();
        let err = DemandGenerator::new(four_hour_config(5.0).sla_secs(0), net, &oracle).err();
        assert_eq!(err, Some(DemandError::Config(ConfigError::NonPositiveSla)));
    }

    #[test]
    fn zero_rate_generates_nothing() {
        let (net, oracle) = kitchen_network();
        let g = DemandGenerator::new(four_hour_config(0.0), net, &oracle).unwrap();
        assert!(g.generate(0).is_empty());
    }
}
