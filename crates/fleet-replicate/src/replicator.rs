//! Running many seeds of one scenario and reducing them.

use std::sync::Arc;
use std::time::Duration;

use fleet_core::ConfigError;
use fleet_dispatch::DispatchPolicy;
use fleet_sim::{OutcomeRecord, RunLimits, Scenario, SimResult, simulate_limited};

use crate::{MetricSummary, ReplicateError, ReplicateResult, WilsonInterval};

/// Two-sided 95 % normal quantile.
pub const DEFAULT_CONFIDENCE_Z: f64 = 1.96;

// ── AggregatedOutcome ─────────────────────────────────────────────────────────

/// The reduction of N completed replications.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregatedOutcome {
    pub policy:       String,
    pub worker_count: u32,
    /// Seeds of the completed replications, in the order given.
    pub seeds:        Vec<u64>,
    /// Replications abandoned at the wall-clock limit and left out.
    pub timed_out:    u32,

    pub on_time_rate:           MetricSummary,
    pub failure_rate:           MetricSummary,
    pub latency_mean:           MetricSummary,
    pub latency_p50:            MetricSummary,
    pub latency_p90:            MetricSummary,
    pub utilization:            MetricSummary,
    pub orders_per_worker_hour: MetricSummary,

    /// On-time deliveries over generated orders, pooled across replications.
    pub pooled_on_time: WilsonInterval,

    pub records: Vec<OutcomeRecord>,
}

impl AggregatedOutcome {
    pub fn replications(&self) -> u32 {
        self.records.len() as u32
    }

    /// Conservative estimate of the on-time rate.
    pub fn on_time_lower_bound(&self) -> f64 {
        self.pooled_on_time.lower
    }

    /// `true` if even the pessimistic end of the interval reaches `target`.
    pub fn meets_target(&self, target: f64) -> bool {
        self.pooled_on_time.lower >= target
    }

    fn reduce(scenario: &Scenario, records: Vec<OutcomeRecord>, timed_out: u32, z: f64) -> Self {
        let metric = |f: fn(&OutcomeRecord) -> f64| {
            let samples: Vec<f64> = records.iter().map(f).collect();
            MetricSummary::from_samples(&samples)
        };
        let on_time:   u64 = records.iter().map(|r| r.on_time as u64).sum();
        let generated: u64 = records.iter().map(|r| r.generated as u64).sum();

        Self {
            policy:                 scenario.policy().name().to_string(),
            worker_count:           scenario.worker_count(),
            seeds:                  records.iter().map(|r| r.seed).collect(),
            timed_out,
            on_time_rate:           metric(|r| r.on_time_rate),
            failure_rate:           metric(|r| r.failure_rate),
            latency_mean:           metric(|r| r.latency.mean),
            latency_p50:            metric(|r| r.latency.p50 as f64),
            latency_p90:            metric(|r| r.latency.p90 as f64),
            utilization:            metric(|r| r.mean_utilization),
            orders_per_worker_hour: metric(|r| r.orders_per_worker_hour),
            pooled_on_time:         WilsonInterval::new(on_time, generated, z),
            records,
        }
    }
}

// ── Replicator ────────────────────────────────────────────────────────────────

/// Runs one replication per seed and reduces the records.
///
/// Replications share nothing mutable: each builds its own state from the
/// scenario's read-only network, oracle and generator.  With the `parallel`
/// feature they run on Rayon's thread pool; results are gathered in seed
/// order either way, so the aggregate is the same.
///
/// # Example
///
/// ```rust,ignore
/// let agg = Replicator::new()
///     .timeout(Duration::from_secs(30))
///     .run(&scenario, &(0..32).collect::<Vec<_>>())?;
/// if agg.meets_target(0.95) { /* staff this way */ }
/// ```
#[derive(Clone)]
pub struct Replicator {
    timeout:      Option<Duration>,
    confidence_z: f64,
    policy:       Option<Arc<dyn DispatchPolicy>>,
}

impl Default for Replicator {
    fn default() -> Self {
        Self { timeout: None, confidence_z: DEFAULT_CONFIDENCE_Z, policy: None }
    }
}

impl Replicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abandon and discard any replication running longer than `limit`.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Normal quantile of the on-time confidence interval.
    pub fn confidence_z(mut self, z: f64) -> Self {
        self.confidence_z = z;
        self
    }

    /// Dispatch with `policy` instead of the scenario's own.
    pub fn policy(mut self, policy: Arc<dyn DispatchPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn run(&self, scenario: &Scenario, seeds: &[u64]) -> ReplicateResult<AggregatedOutcome> {
        if seeds.is_empty() {
            return Err(ReplicateError::NoSeeds);
        }
        if !(self.confidence_z.is_finite() && self.confidence_z > 0.0) {
            return Err(ConfigError::invalid(
                "confidence_z",
                format!("must be positive, got {}", self.confidence_z),
            )
            .into());
        }

        let overridden;
        let scenario = match &self.policy {
            Some(p) => {
                overridden = scenario.with_policy(Arc::clone(p));
                &overridden
            }
            None => scenario,
        };
        let limits = RunLimits { wall_clock: self.timeout };

        let results = run_all(scenario, seeds, &limits);

        let mut records   = Vec::with_capacity(seeds.len());
        let mut timed_out = 0u32;
        for (&seed, result) in seeds.iter().zip(results) {
            match result? {
                Some(record) => records.push(record),
                None => {
                    log::warn!("seed {seed}: replication timed out and was discarded");
                    timed_out += 1;
                }
            }
        }
        if records.is_empty() {
            return Err(ReplicateError::AllTimedOut { timed_out });
        }

        let agg = AggregatedOutcome::reduce(scenario, records, timed_out, self.confidence_z);
        log::info!(
            "{} workers, {}: {} replications ({} timed out), on-time {:.3} ± {:.3}, lower bound {:.3}",
            agg.worker_count,
            agg.policy,
            agg.replications(),
            timed_out,
            agg.on_time_rate.mean,
            agg.on_time_rate.std_dev,
            agg.on_time_lower_bound(),
        );
        Ok(agg)
    }
}

/// One result per seed, in seed order.
#[cfg(not(feature = "parallel"))]
fn run_all(scenario: &Scenario, seeds: &[u64], limits: &RunLimits) -> Vec<SimResult<Option<OutcomeRecord>>> {
    seeds
        .iter()
        .map(|&seed| simulate_limited(scenario, seed, limits))
        .collect()
}

#[cfg(feature = "parallel")]
fn run_all(scenario: &Scenario, seeds: &[u64], limits: &RunLimits) -> Vec<SimResult<Option<OutcomeRecord>>> {
    use rayon::prelude::*;

    // `collect` on an indexed parallel iterator keeps input order.
    seeds
        .par_iter()
        .map(|&seed| simulate_limited(scenario, seed, limits))
        .collect()
}
