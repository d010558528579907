//! Summary statistics across replications.

/// Mean, spread and range of one metric over the completed replications.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricSummary {
    pub n:       u32,
    pub mean:    f64,
    /// Sample standard deviation (`n − 1` denominator); zero for `n < 2`.
    pub std_dev: f64,
    pub min:     f64,
    pub max:     f64,
}

impl MetricSummary {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let std_dev = if samples.len() < 2 {
            0.0
        } else {
            (samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };
        Self {
            n: samples.len() as u32,
            mean,
            std_dev,
            min: samples.iter().copied().fold(f64::INFINITY, f64::min),
            max: samples.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }

    /// Standard error of the mean.
    pub fn std_error(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.std_dev / (self.n as f64).sqrt()
        }
    }
}

/// Wilson score interval for a binomial proportion.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WilsonInterval {
    pub successes: u64,
    pub trials:    u64,
    pub center:    f64,
    pub lower:     f64,
    pub upper:     f64,
}

impl WilsonInterval {
    /// Interval for `successes` out of `trials` at normal quantile `z`.
    ///
    /// With no trials there is nothing to miss, so the interval collapses
    /// to `[1, 1]`, matching the on-time rate of a run without orders.
    pub fn new(successes: u64, trials: u64, z: f64) -> Self {
        debug_assert!(successes <= trials);
        if trials == 0 {
            return Self { successes, trials, center: 1.0, lower: 1.0, upper: 1.0 };
        }
        let n  = trials as f64;
        let p  = successes as f64 / n;
        let z2 = z * z;
        let denom  = 1.0 + z2 / n;
        let center = (p + z2 / (2.0 * n)) / denom;
        let half   = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
        Self {
            successes,
            trials,
            center,
            lower: (center - half).max(0.0),
            upper: (center + half).min(1.0),
        }
    }

    /// Observed proportion.
    pub fn point(&self) -> f64 {
        if self.trials == 0 {
            1.0
        } else {
            self.successes as f64 / self.trials as f64
        }
    }
}
