// Copyright 2026 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic host time.
//!
//! [`HostTime`] is a nanosecond count since the epoch of the [`HostClock`]
//! that produced it. Stamps from different clocks are not comparable; the
//! scheduler and compositor of one host share a clock so their trace events
//! line up.

use core::fmt;
use core::ops::{Add, Sub};
use std::time::{Duration, Instant};

/// A point in time, in nanoseconds since a [`HostClock`] epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Returns the value in (fractional) microseconds.
    #[inline]
    #[must_use]
    pub fn micros(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Returns the time elapsed between `earlier` and `self`, or zero if
    /// `earlier` is after `self`.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(duration_nanos(rhs)))
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Source of [`HostTime`] stamps.
///
/// Cloning shares the epoch.
#[derive(Clone, Copy, Debug)]
pub struct HostClock {
    epoch: Instant,
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock {
    /// Creates a clock whose epoch is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Returns the current time.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.at(Instant::now())
    }

    /// Converts an [`Instant`] to a stamp on this clock, saturating at the
    /// epoch.
    #[must_use]
    pub fn at(&self, instant: Instant) -> HostTime {
        HostTime(duration_nanos(
            instant.saturating_duration_since(self.epoch),
        ))
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "u64 nanoseconds cover centuries of uptime; the cast saturates first"
)]
fn duration_nanos(duration: Duration) -> u64 {
    duration.as_nanos().min(u128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let clock = HostClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a, "later reading must not precede earlier one");
    }

    #[test]
    fn instants_before_epoch_saturate() {
        let before = Instant::now();
        let clock = HostClock::new();
        assert_eq!(clock.at(before), HostTime(0));
    }

    #[test]
    fn host_time_duration_ops() {
        let t = HostTime(1_000);
        assert_eq!((t + Duration::from_nanos(200)).nanos(), 1_200);
        assert_eq!(t - HostTime(400), Duration::from_nanos(600));
        assert_eq!(t.saturating_duration_since(HostTime(1_500)), Duration::ZERO);
        assert!((HostTime(2_500).micros() - 2.5).abs() < f64::EPSILON);
    }
}
