//! Time-of-day demand profiles.
//!
//! A [`RateProfile`] maps contiguous or gapped time buckets to an expected
//! number of orders.  How many orders actually fall into a bucket in one
//! replication is decided by the profile's [`CountSampling`]:
//!
//! - `Poisson`: each bucket independently draws `Poisson(expected)`.
//! - `FixedTotal(n)`: exactly `n` orders per day, each placed in a bucket
//!   drawn with probability proportional to the bucket's expectation.

use rand::distributions::{Distribution, WeightedIndex};
use rand_distr::Poisson;

use fleet_core::{ConfigError, ConfigResult, SimRng, SimTime, time::SECS_PER_HOUR};

// ── RateBucket ────────────────────────────────────────────────────────────────

/// Half-open interval `[start, end)` with its expected order count.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateBucket {
    pub start:           SimTime,
    pub end:             SimTime,
    pub expected_orders: f64,
}

impl RateBucket {
    pub fn new(start: SimTime, end: SimTime, expected_orders: f64) -> Self {
        Self { start, end, expected_orders }
    }

    #[inline]
    pub fn width_secs(&self) -> u64 {
        self.end.since(self.start)
    }
}

// ── CountSampling ─────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CountSampling {
    /// Independent Poisson count per bucket.
    #[default]
    Poisson,
    /// Exactly this many orders, spread across buckets by weighted draw.
    FixedTotal(u32),
}

// ── RateProfile ───────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RateProfile {
    /// Sorted by `start`, non-overlapping.
    buckets:  Vec<RateBucket>,
    sampling: CountSampling,
}

impl RateProfile {
    /// Sort `buckets` by start time and validate.
    pub fn new(mut buckets: Vec<RateBucket>, sampling: CountSampling) -> ConfigResult<Self> {
        buckets.sort_by_key(|b| b.start);
        let profile = Self { buckets, sampling };
        profile.validate()?;
        Ok(profile)
    }

    /// A flat `rate_per_hour` between `open` and `close`, in hourly buckets.
    ///
    /// A trailing partial hour gets a proportional share of the rate.
    pub fn uniform(rate_per_hour: f64, open: SimTime, close: SimTime) -> ConfigResult<Self> {
        if close <= open {
            return Err(ConfigError::InvalidBucket {
                index:  0,
                reason: format!("service closes at {close}, before it opens at {open}"),
            });
        }
        let mut buckets = Vec::new();
        let mut start = open;
        while start < close {
            let end = start.offset(SECS_PER_HOUR).min(close);
            let share = end.since(start) as f64 / SECS_PER_HOUR as f64;
            buckets.push(RateBucket::new(start, end, rate_per_hour * share));
            start = end;
        }
        Self::new(buckets, CountSampling::Poisson)
    }

    /// One bucket per hour starting at `T+0`, with the given expectations.
    pub fn hourly(expected_per_hour: &[f64]) -> ConfigResult<Self> {
        let buckets = expected_per_hour
            .iter()
            .enumerate()
            .map(|(h, &e)| {
                RateBucket::new(
                    SimTime::from_hours(h as u64),
                    SimTime::from_hours(h as u64 + 1),
                    e,
                )
            })
            .collect();
        Self::new(buckets, CountSampling::Poisson)
    }

    /// Replace the count-sampling mode.
    pub fn with_sampling(mut self, sampling: CountSampling) -> ConfigResult<Self> {
        self.sampling = sampling;
        self.validate()?;
        Ok(self)
    }

    /// Every expectation (and a fixed total) multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> ConfigResult<Self> {
        if !(factor.is_finite() && factor >= 0.0) {
            return Err(ConfigError::invalid(
                "demand_scale",
                format!("must be a non-negative number, got {factor}"),
            ));
        }
        let buckets = self
            .buckets
            .iter()
            .map(|b| RateBucket { expected_orders: b.expected_orders * factor, ..*b })
            .collect();
        let sampling = match self.sampling {
            CountSampling::Poisson       => CountSampling::Poisson,
            CountSampling::FixedTotal(n) => {
                CountSampling::FixedTotal((n as f64 * factor).round() as u32)
            }
        };
        let scaled = Self { buckets, sampling };
        scaled.validate()?;
        Ok(scaled)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.buckets.is_empty() {
            return Err(ConfigError::EmptyRateProfile);
        }
        for (index, b) in self.buckets.iter().enumerate() {
            if b.end <= b.start {
                return Err(ConfigError::InvalidBucket {
                    index,
                    reason: format!("ends at {} but starts at {}", b.end, b.start),
                });
            }
            if !(b.expected_orders.is_finite() && b.expected_orders >= 0.0) {
                return Err(ConfigError::InvalidBucket {
                    index,
                    reason: format!("expected orders must be non-negative, got {}", b.expected_orders),
                });
            }
            if index > 0 && b.start < self.buckets[index - 1].end {
                return Err(ConfigError::OverlappingBuckets { index });
            }
        }
        if let CountSampling::FixedTotal(n) = self.sampling {
            if n > 0 && self.expected_total() <= 0.0 {
                return Err(ConfigError::invalid(
                    "fixed_total",
                    "a positive total needs at least one bucket with positive weight",
                ));
            }
        }
        Ok(())
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn buckets(&self) -> &[RateBucket] {
        &self.buckets
    }

    pub fn sampling(&self) -> CountSampling {
        self.sampling
    }

    /// Start of the first bucket.
    pub fn start(&self) -> SimTime {
        self.buckets.first().map_or(SimTime::ZERO, |b| b.start)
    }

    /// End of the last bucket: the last instant an order can arrive.
    pub fn end(&self) -> SimTime {
        self.buckets.last().map_or(SimTime::ZERO, |b| b.end)
    }

    /// Sum of bucket expectations (or the fixed total).
    pub fn expected_total(&self) -> f64 {
        self.buckets.iter().map(|b| b.expected_orders).sum()
    }

    // ── Sampling ──────────────────────────────────────────────────────────

    /// Draw one replication's order count for every bucket.
    pub fn sample_counts(&self, rng: &mut SimRng) -> Vec<u32> {
        let mut counts = vec![0u32; self.buckets.len()];
        match self.sampling {
            CountSampling::Poisson => {
                for (count, b) in counts.iter_mut().zip(&self.buckets) {
                    // Poisson::new rejects a zero mean; such buckets stay empty.
                    if let Ok(dist) = Poisson::new(b.expected_orders) {
                        *count = dist.sample(rng.inner()) as u32;
                    }
                }
            }
            CountSampling::FixedTotal(n) => {
                let weights = self.buckets.iter().map(|b| b.expected_orders);
                if let Ok(dist) = WeightedIndex::new(weights) {
                    for _ in 0..n {
                        counts[dist.sample(rng.inner())] += 1;
                    }
                }
            }
        }
        counts
    }
}
