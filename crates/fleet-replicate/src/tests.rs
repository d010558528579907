//! Unit tests for fleet-replicate.

use std::sync::Arc;

use fleet_core::{GeoPoint, SimTime};
use fleet_demand::{PrepTime, RateProfile};
use fleet_sim::Scenario;
use fleet_spatial::{WaypointNetwork, WaypointNetworkBuilder};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Depot and a four-waypoint loop, 60 s per hop.
fn course_network() -> Arc<WaypointNetwork> {
    let mut b = WaypointNetworkBuilder::new();
    let d  = b.add_node(GeoPoint::new(0.000, 0.000));
    let a  = b.add_node(GeoPoint::new(0.001, 0.000));
    let bb = b.add_node(GeoPoint::new(0.002, 0.000));
    let c  = b.add_node(GeoPoint::new(0.002, -0.001));
    let e  = b.add_node(GeoPoint::new(0.000, -0.001));
    for (x, y) in [(d, a), (a, bb), (bb, c), (c, e), (e, d)] {
        b.add_path(x, y, 80.0, 60_000);
    }
    b.set_depot(d);
    b.set_course(vec![a, bb, c, e]);
    Arc::new(b.build().unwrap())
}

fn scenario(rate: f64, workers: u32) -> Scenario {
    let profile = RateProfile::uniform(rate, SimTime::ZERO, SimTime::from_hours(3)).unwrap();
    Scenario::builder(course_network(), profile)
        .worker_count(workers)
        .sla_minutes(15)
        .prep(PrepTime::fixed(300))
        .build()
        .unwrap()
}

// ── Statistics ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod stats {
    use crate::{MetricSummary, WilsonInterval};

    #[test]
    fn summary_uses_sample_std_dev() {
        let s = MetricSummary::from_samples(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(s.n, 4);
        assert_eq!(s.mean, 2.5);
        assert!((s.std_dev - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert!((s.std_error() - s.std_dev / 2.0).abs() < 1e-12);
    }

    #[test]
    fn summary_degenerate_inputs() {
        assert_eq!(MetricSummary::from_samples(&[]), MetricSummary::default());
        let one = MetricSummary::from_samples(&[0.7]);
        assert_eq!(one.std_dev, 0.0);
        assert_eq!((one.min, one.max, one.mean), (0.7, 0.7, 0.7));
    }

    #[test]
    fn wilson_matches_reference_values() {
        let w = WilsonInterval::new(8, 10, 1.96);
        assert!((w.lower - 0.4902).abs() < 1e-3, "{}", w.lower);
        assert!((w.upper - 0.9433).abs() < 1e-3, "{}", w.upper);
        assert_eq!(w.point(), 0.8);
        assert!(w.lower < w.point() && w.point() < w.upper);
    }

    #[test]
    fn wilson_stays_inside_unit_interval() {
        let all = WilsonInterval::new(50, 50, 1.96);
        assert_eq!(all.upper, 1.0);
        assert!(all.lower < 1.0 && all.lower > 0.9);

        let none = WilsonInterval::new(0, 50, 1.96);
        assert_eq!(none.lower, 0.0);
        assert!(none.upper > 0.0 && none.upper < 0.1);
    }

    #[test]
    fn wilson_narrows_with_more_trials() {
        let small = WilsonInterval::new(9, 10, 1.96);
        let large = WilsonInterval::new(900, 1_000, 1.96);
        assert!(large.upper - large.lower < small.upper - small.lower);
        assert!(large.lower > small.lower);
    }

    #[test]
    fn wilson_without_trials_is_certain() {
        let w = WilsonInterval::new(0, 0, 1.96);
        assert_eq!((w.lower, w.upper, w.point()), (1.0, 1.0, 1.0));
    }
}

// ── Replication ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod replicate {
    use std::sync::Arc;
    use std::time::Duration;

    use fleet_core::ConfigError;
    use fleet_dispatch::AppendOnly;
    use fleet_sim::simulate;

    use super::scenario;
    use crate::{ReplicateError, Replicator, replicate};

    #[test]
    fn records_follow_seed_order() {
        let s = scenario(12.0, 2);
        let seeds = [9, 3, 14, 0];
        let agg = replicate(&s, &seeds).unwrap();
        assert_eq!(agg.seeds, seeds.to_vec());
        assert_eq!(agg.replications(), 4);
        assert_eq!(agg.timed_out, 0);
        for (record, &seed) in agg.records.iter().zip(&seeds) {
            assert_eq!(*record, simulate(&s, seed).unwrap());
        }
    }

    #[test]
    fn aggregates_are_means_of_records() {
        let s = scenario(12.0, 1);
        let agg = replicate(&s, &[1, 2, 3, 4, 5]).unwrap();
        let mean = |f: fn(&fleet_sim::OutcomeRecord) -> f64| {
            agg.records.iter().map(f).sum::<f64>() / agg.records.len() as f64
        };
        assert!((agg.on_time_rate.mean - mean(|r| r.on_time_rate)).abs() < 1e-12);
        assert!((agg.failure_rate.mean - mean(|r| r.failure_rate)).abs() < 1e-12);
        assert!((agg.latency_p90.mean - mean(|r| r.latency.p90 as f64)).abs() < 1e-9);
        assert!(agg.on_time_rate.min <= agg.on_time_rate.mean);
        assert!(agg.on_time_rate.mean <= agg.on_time_rate.max);

        let on_time: u64 = agg.records.iter().map(|r| r.on_time as u64).sum();
        let generated: u64 = agg.records.iter().map(|r| r.generated as u64).sum();
        assert_eq!(agg.pooled_on_time.successes, on_time);
        assert_eq!(agg.pooled_on_time.trials, generated);
    }

    #[test]
    fn target_gates_on_the_lower_bound() {
        let s = scenario(12.0, 2);
        let agg = replicate(&s, &[1, 2, 3, 4, 5, 6]).unwrap();
        let w = agg.pooled_on_time;
        assert!(w.lower <= w.point() && w.point() <= w.upper);
        assert!(agg.meets_target(agg.on_time_lower_bound()));
        assert!(!agg.meets_target(w.upper + 1e-6));

        // A wider interval is harder to pass.
        let strict = Replicator::new().confidence_z(3.0).run(&s, &[1, 2, 3, 4, 5, 6]).unwrap();
        assert!(strict.on_time_lower_bound() <= agg.on_time_lower_bound());
    }

    #[test]
    fn more_workers_raise_the_bound() {
        let one = replicate(&scenario(12.0, 1), &[1, 2, 3, 4]).unwrap();
        let three = replicate(&scenario(12.0, 3), &[1, 2, 3, 4]).unwrap();
        assert!(three.on_time_lower_bound() >= one.on_time_lower_bound());
        assert!(three.utilization.mean < one.utilization.mean);
    }

    #[test]
    fn quiet_course_meets_any_target() {
        let agg = replicate(&scenario(0.0, 2), &[1, 2, 3]).unwrap();
        assert_eq!(agg.on_time_rate.mean, 1.0);
        assert_eq!(agg.on_time_rate.std_dev, 0.0);
        assert!(agg.meets_target(1.0));
    }

    #[test]
    fn policy_override() {
        let s = scenario(12.0, 2);
        let agg = Replicator::new().policy(Arc::new(AppendOnly)).run(&s, &[1, 2]).unwrap();
        assert_eq!(agg.policy, "append_only");
        assert_eq!(replicate(&s, &[1]).unwrap().policy, "min_added_latency");
    }

    #[test]
    fn timed_out_runs_are_discarded() {
        let s = scenario(60.0, 2);
        let err = Replicator::new()
            .timeout(Duration::ZERO)
            .run(&s, &[1, 2, 3])
            .unwrap_err();
        assert_eq!(err, ReplicateError::AllTimedOut { timed_out: 3 });
    }

    #[test]
    fn bad_settings_rejected() {
        let s = scenario(6.0, 1);
        assert_eq!(replicate(&s, &[]).unwrap_err(), ReplicateError::NoSeeds);
        let err = Replicator::new().confidence_z(0.0).run(&s, &[1]).unwrap_err();
        assert!(matches!(
            err,
            ReplicateError::Config(ConfigError::InvalidParameter { name: "confidence_z", .. })
        ));
    }
}
