//! Simulated time.
//!
//! # Design
//!
//! Time is a whole number of seconds since the service window opened
//! (`SimTime::ZERO`).  Integer time keeps every schedule comparison exact,
//! which is what makes two runs with the same seed bit-identical: there is no
//! floating-point accumulation anywhere on the event path.
//!
//! Sub-second travel costs are rounded *up* by the travel-time oracle, so a
//! worker is never modelled as arriving earlier than it physically could.

use std::fmt;

/// Seconds per minute / hour, spelled out once.
pub const SECS_PER_MINUTE: u64 = 60;
pub const SECS_PER_HOUR:   u64 = 3_600;

// ── SimTime ───────────────────────────────────────────────────────────────────

/// An absolute simulation timestamp in seconds.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub const MAX:  SimTime = SimTime(u64::MAX);

    #[inline]
    pub fn from_secs(secs: u64) -> Self {
        SimTime(secs)
    }

    #[inline]
    pub fn from_minutes(minutes: u64) -> Self {
        SimTime(minutes * SECS_PER_MINUTE)
    }

    #[inline]
    pub fn from_hours(hours: u64) -> Self {
        SimTime(hours * SECS_PER_HOUR)
    }

    #[inline]
    pub fn secs(self) -> u64 {
        self.0
    }

    /// Timestamp `secs` seconds after `self` (saturating at `MAX`).
    #[inline]
    pub fn offset(self, secs: u64) -> SimTime {
        SimTime(self.0.saturating_add(secs))
    }

    /// Seconds elapsed from `earlier` to `self`; zero if `earlier` is later.
    #[inline]
    pub fn since(self, earlier: SimTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Fractional minutes, for reporting only.
    #[inline]
    pub fn as_minutes_f64(self) -> f64 {
        self.0 as f64 / SECS_PER_MINUTE as f64
    }
}

impl std::ops::Add<u64> for SimTime {
    type Output = SimTime;
    #[inline]
    fn add(self, rhs: u64) -> SimTime {
        self.offset(rhs)
    }
}

impl std::ops::Sub for SimTime {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: SimTime) -> u64 {
        self.since(rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = self.0 / SECS_PER_HOUR;
        let m = (self.0 % SECS_PER_HOUR) / SECS_PER_MINUTE;
        let s = self.0 % SECS_PER_MINUTE;
        write!(f, "T+{h:02}:{m:02}:{s:02}")
    }
}

// ── SimClock ──────────────────────────────────────────────────────────────────

/// The replication's notion of "now" plus the horizon it must not run past.
///
/// Owned by the event queue; cheap to copy.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SimClock {
    now:     SimTime,
    horizon: SimTime,
}

impl SimClock {
    pub fn new(horizon: SimTime) -> Self {
        Self { now: SimTime::ZERO, horizon }
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        self.now
    }

    #[inline]
    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    /// Move the clock forward to `t`.  Time never runs backwards.
    #[inline]
    pub fn advance_to(&mut self, t: SimTime) {
        debug_assert!(t >= self.now, "clock moved backwards: {t} < {}", self.now);
        self.now = self.now.max(t);
    }

    /// `true` once `t` lies strictly beyond the horizon.
    #[inline]
    pub fn is_beyond_horizon(&self, t: SimTime) -> bool {
        t > self.horizon
    }
}

impl fmt::Display for SimClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.now, self.horizon)
    }
}
