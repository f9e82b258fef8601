//! Time types for capture streams.
//!
//! Depth and segmentation frames arrive on independent clocks that share an
//! epoch. Timestamps are kept as integer nanoseconds so that ordering and
//! window comparisons are exact.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nanosecond-precision capture timestamp.
///
/// # Example
///
/// ```
/// use sensor_types::Timestamp;
///
/// let ts = Timestamp::from_secs_f64(1.5);
/// assert!((ts.as_secs_f64() - 1.5).abs() < 1e-9);
/// assert_eq!(ts, Timestamp::from_nanos(1_500_000_000));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Timestamp {
    nanos: u64,
}

impl Timestamp {
    /// Creates a timestamp from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Creates a timestamp from seconds.
    ///
    /// Negative and `NaN` inputs clamp to zero. The value is rounded to the
    /// nearest nanosecond so that decimal literals such as `1.03` land on the
    /// expected tick.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn from_secs_f64(secs: f64) -> Self {
        let nanos = (secs * 1e9).round().max(0.0) as u64;
        Self { nanos }
    }

    /// Returns the timestamp as nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.nanos
    }

    /// Returns the timestamp as seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / 1e9
    }

    /// Returns the zero timestamp.
    #[must_use]
    pub const fn zero() -> Self {
        Self { nanos: 0 }
    }

    /// Subtracts a duration, clamping at zero.
    #[must_use]
    pub const fn saturating_sub(self, duration: Duration) -> Self {
        Self {
            nanos: self.nanos.saturating_sub(duration.nanos),
        }
    }

    /// Adds a duration, clamping at `u64::MAX` nanoseconds.
    #[must_use]
    pub const fn saturating_add(self, duration: Duration) -> Self {
        Self {
            nanos: self.nanos.saturating_add(duration.nanos),
        }
    }

    /// Returns the absolute distance between two timestamps.
    #[must_use]
    pub const fn abs_diff(self, other: Self) -> Duration {
        Duration::from_nanos(self.nanos.abs_diff(other.nanos))
    }

    /// Returns true if `other` lies within `tolerance` of this timestamp
    /// (inclusive on both sides).
    ///
    /// # Example
    ///
    /// ```
    /// use sensor_types::{Duration, Timestamp};
    ///
    /// let depth = Timestamp::from_secs_f64(1.030);
    /// let mask = Timestamp::from_secs_f64(1.000);
    /// assert!(depth.is_within(mask, Duration::from_secs_f64(1.0 / 15.0)));
    /// ```
    #[must_use]
    pub const fn is_within(self, other: Self, tolerance: Duration) -> bool {
        self.nanos.abs_diff(other.nanos) <= tolerance.nanos
    }
}

/// A non-negative span of time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Duration {
    nanos: u64,
}

impl Duration {
    /// Creates a duration from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Creates a duration from milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self {
            nanos: millis * 1_000_000,
        }
    }

    /// Creates a duration from seconds. Negative input clamps to zero.
    #[must_use]
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn from_secs_f64(secs: f64) -> Self {
        let nanos = (secs * 1e9).round().max(0.0) as u64;
        Self { nanos }
    }

    /// Returns the duration as nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.nanos
    }

    /// Returns the duration as seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / 1e9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_from_secs_rounds_to_nearest_tick() {
        assert_eq!(Timestamp::from_secs_f64(1.03).as_nanos(), 1_030_000_000);
        assert_eq!(Timestamp::from_secs_f64(1.5).as_nanos(), 1_500_000_000);
    }

    #[test]
    fn timestamp_negative_clamps_to_zero() {
        assert_eq!(Timestamp::from_secs_f64(-2.0), Timestamp::zero());
        assert_eq!(Timestamp::from_secs_f64(f64::NAN), Timestamp::zero());
    }

    #[test]
    fn timestamp_saturating_ops() {
        let ts = Timestamp::from_nanos(1000);
        assert_eq!(
            ts.saturating_sub(Duration::from_nanos(400)),
            Timestamp::from_nanos(600)
        );
        assert_eq!(ts.saturating_sub(Duration::from_nanos(5000)), Timestamp::zero());
        assert_eq!(
            ts.saturating_add(Duration::from_nanos(1)),
            Timestamp::from_nanos(1001)
        );
    }

    #[test]
    fn timestamp_window_is_inclusive() {
        let tol = Duration::from_nanos(100);
        let a = Timestamp::from_nanos(1000);

        assert!(a.is_within(Timestamp::from_nanos(1100), tol));
        assert!(a.is_within(Timestamp::from_nanos(900), tol));
        assert!(!a.is_within(Timestamp::from_nanos(1101), tol));
        assert_eq!(a.abs_diff(Timestamp::from_nanos(300)), Duration::from_nanos(700));
    }

    #[test]
    fn duration_conversions() {
        let d = Duration::from_millis(1500);
        assert_eq!(d.as_nanos(), 1_500_000_000);
        assert!((d.as_secs_f64() - 1.5).abs() < 1e-9);
        assert_eq!(Duration::from_secs_f64(-1.0), Duration::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn timestamp_serialization() {
        let ts = Timestamp::from_nanos(1_500_000_000);
        let json = serde_json::to_string(&ts).unwrap_or_default();
        let parsed: Result<Timestamp, _> = serde_json::from_str(&json);
        assert_eq!(parsed.ok(), Some(ts));
    }
}
