//! The validated, read-only input of a replication.

use std::sync::Arc;

use fleet_core::{ConfigError, SimTime};
use fleet_demand::{CustomerDrift, DemandConfig, DemandGenerator, PrepTime, RateProfile};
use fleet_dispatch::{DispatchConfig, DispatchPolicy, MinAddedLatency};
use fleet_spatial::{CostModel, TravelTimeOracle, WaypointNetwork};

use crate::SimResult;

/// Extra time after the last order's deadline before the window closes.
pub const DEFAULT_CLOSE_GRACE_SECS: u64 = 15 * 60;

/// Slack allowed when checking the oracle's triangle inequality.
pub const DEFAULT_TRIANGLE_TOLERANCE_SECS: u64 = 1;

// ── Scenario ──────────────────────────────────────────────────────────────────

/// Everything one replication reads and nothing it writes.
///
/// Cloning is cheap: the network, oracle, generator and policy are shared
/// behind `Arc`s, so sweep variants built with [`with_worker_count`] and
/// [`with_demand_scale`] reuse the precomputed travel-time table.
///
/// [`with_worker_count`]: Scenario::with_worker_count
/// [`with_demand_scale`]: Scenario::with_demand_scale
#[derive(Clone)]
pub struct Scenario {
    network:      Arc<WaypointNetwork>,
    oracle:       Arc<TravelTimeOracle>,
    generator:    Arc<DemandGenerator>,
    policy:       Arc<dyn DispatchPolicy>,
    worker_count: u32,
    dispatch:     DispatchConfig,
    horizon:      SimTime,
}

impl Scenario {
    pub fn builder(network: Arc<WaypointNetwork>, profile: RateProfile) -> ScenarioBuilder {
        ScenarioBuilder::new(network, profile)
    }

    pub fn network(&self) -> &WaypointNetwork {
        &self.network
    }

    pub fn oracle(&self) -> &TravelTimeOracle {
        &self.oracle
    }

    pub fn generator(&self) -> &DemandGenerator {
        &self.generator
    }

    pub fn demand(&self) -> &DemandConfig {
        self.generator.config()
    }

    pub fn policy(&self) -> &dyn DispatchPolicy {
        self.policy.as_ref()
    }

    pub fn worker_count(&self) -> u32 {
        self.worker_count
    }

    pub fn dispatch(&self) -> &DispatchConfig {
        &self.dispatch
    }

    /// Time of the `service_window_close` event.
    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    /// The same scenario staffed with `n` workers.
    pub fn with_worker_count(&self, n: u32) -> SimResult<Self> {
        if n == 0 {
            return Err(ConfigError::invalid("worker_count", "must be at least 1").into());
        }
        Ok(Self { worker_count: n, ..self.clone() })
    }

    /// The same scenario dispatched by `policy`.
    pub fn with_policy(&self, policy: Arc<dyn DispatchPolicy>) -> Self {
        Self { policy, ..self.clone() }
    }

    /// The same scenario with every demand bucket multiplied by `factor`.
    pub fn with_demand_scale(&self, factor: f64) -> SimResult<Self> {
        let demand = self.demand();
        let config = DemandConfig {
            profile: demand.profile.scaled(factor)?,
            ..demand.clone()
        };
        let generator = DemandGenerator::new(config, Arc::clone(&self.network), &self.oracle)?;
        Ok(Self { generator: Arc::new(generator), ..self.clone() })
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("nodes", &self.network.node_count())
            .field("workers", &self.worker_count)
            .field("policy", &self.policy.name())
            .field("dispatch", &self.dispatch)
            .field("horizon", &self.horizon)
            .finish_non_exhaustive()
    }
}

// ── ScenarioBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Scenario`].
///
/// # Optional inputs (have defaults)
///
/// | Method                    | Default                           |
/// |---------------------------|-----------------------------------|
/// | `.worker_count(n)`        | 1                                 |
/// | `.sla_secs(s)`            | 30 min                            |
/// | `.queue_ceiling(c)`       | 4                                 |
/// | `.speed_mps(v)`           | surveyed edge times               |
/// | `.prep(p)`                | 8 min + U[0, 4 min]               |
/// | `.policy(p)`              | [`MinAddedLatency`]               |
/// | `.close_grace_secs(s)`    | 15 min                            |
///
/// # Example
///
/// ```rust,ignore
/// let scenario = Scenario::builder(network, RateProfile::hourly(&[12.0; 6])?)
///     .worker_count(3)
///     .sla_secs(25 * 60)
///     .queue_ceiling(3)
///     .build()?;
/// let record = simulate(&scenario, 42)?;
/// ```
pub struct ScenarioBuilder {
    network:            Arc<WaypointNetwork>,
    demand:             DemandConfig,
    cost_model:         CostModel,
    worker_count:       u32,
    dispatch:           DispatchConfig,
    policy:             Arc<dyn DispatchPolicy>,
    close_grace_secs:   u64,
    triangle_tolerance: u64,
}

impl ScenarioBuilder {
    pub fn new(network: Arc<WaypointNetwork>, profile: RateProfile) -> Self {
        Self {
            network,
            demand:             DemandConfig::new(profile),
            cost_model:         CostModel::Reference,
            worker_count:       1,
            dispatch:           DispatchConfig::default(),
            policy:             Arc::new(MinAddedLatency),
            close_grace_secs:   DEFAULT_CLOSE_GRACE_SECS,
            triangle_tolerance: DEFAULT_TRIANGLE_TOLERANCE_SECS,
        }
    }

    pub fn worker_count(mut self, n: u32) -> Self {
        self.worker_count = n;
        self
    }

    pub fn sla_secs(mut self, secs: u64) -> Self {
        self.demand.sla_secs = secs;
        self
    }

    pub fn sla_minutes(self, minutes: u64) -> Self {
        self.sla_secs(minutes * 60)
    }

    pub fn queue_ceiling(mut self, ceiling: u32) -> Self {
        self.dispatch.queue_ceiling = ceiling;
        self
    }

    /// Derive every edge's travel time from its length at `mps`.
    pub fn speed_mps(mut self, mps: f32) -> Self {
        self.cost_model = CostModel::Speed { mps };
        self
    }

    pub fn cost_model(mut self, model: CostModel) -> Self {
        self.cost_model = model;
        self
    }

    pub fn prep(mut self, prep: PrepTime) -> Self {
        self.demand.prep = prep;
        self
    }

    pub fn drift(mut self, drift: CustomerDrift) -> Self {
        self.demand.drift = Some(drift);
        self
    }

    pub fn origin_weights(mut self, weights: Vec<f64>) -> Self {
        self.demand.origin_weights = Some(weights);
        self
    }

    /// Replace every dispatch knob at once.
    pub fn dispatch(mut self, config: DispatchConfig) -> Self {
        self.dispatch = config;
        self
    }

    pub fn capacity(mut self, capacity: u32) -> Self {
        self.dispatch.capacity = capacity;
        self
    }

    pub fn handoff_secs(mut self, secs: u64) -> Self {
        self.dispatch.handoff_secs = secs;
        self
    }

    pub fn reject_late(mut self, on: bool) -> Self {
        self.dispatch.reject_late = on;
        self
    }

    pub fn retask_while_returning(mut self, on: bool) -> Self {
        self.dispatch.retask_while_returning = on;
        self
    }

    pub fn policy(mut self, policy: Arc<dyn DispatchPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn close_grace_secs(mut self, secs: u64) -> Self {
        self.close_grace_secs = secs;
        self
    }

    pub fn triangle_tolerance_secs(mut self, secs: u64) -> Self {
        self.triangle_tolerance = secs;
        self
    }

    /// Validate every input, precompute the travel-time table and return a
    /// ready-to-run [`Scenario`].
    pub fn build(self) -> SimResult<Scenario> {
        if self.worker_count == 0 {
            return Err(ConfigError::invalid("worker_count", "must be at least 1").into());
        }
        self.dispatch.validate()?;

        let oracle = TravelTimeOracle::build(&self.network, self.cost_model)?;
        oracle.check_triangle_inequality(self.triangle_tolerance)?;

        let horizon = self
            .demand
            .profile
            .end()
            .offset(self.demand.sla_secs)
            .offset(self.close_grace_secs);
        let generator = DemandGenerator::new(self.demand, Arc::clone(&self.network), &oracle)?;

        log::debug!(
            "scenario built: {} nodes, {} workers, policy {}, horizon {horizon}",
            self.network.node_count(),
            self.worker_count,
            self.policy.name(),
        );

        Ok(Scenario {
            network:      self.network,
            oracle:       Arc::new(oracle),
            generator:    Arc::new(generator),
            policy:       self.policy,
            worker_count: self.worker_count,
            dispatch:     self.dispatch,
            horizon,
        })
    }
}
