//! Timestamp matching between a buffered stream and a driving stream.

use sensor_types::{Duration, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::buffer::StreamBuffer;
use crate::error::{FusionError, Result};

/// Default match tolerance: one frame at 15 Hz.
pub const DEFAULT_TOLERANCE_SECS: f64 = 1.0 / 15.0;

/// Default number of pending items kept before the oldest is evicted.
pub const DEFAULT_MAX_PENDING: usize = 64;

/// Policy for matching pending items against a driving timestamp.
///
/// # Example
///
/// ```
/// use sensor_fusion::SyncPolicy;
///
/// let policy = SyncPolicy::default().with_tolerance_secs(0.05);
/// assert!(policy.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncPolicy {
    /// Maximum `|pending - driving|` for a match, in seconds (inclusive).
    pub tolerance_secs: f64,
    /// Maximum number of pending items.
    pub max_pending: usize,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

impl SyncPolicy {
    /// Sets the match tolerance.
    #[must_use]
    pub const fn with_tolerance_secs(mut self, tolerance_secs: f64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Sets the pending queue bound.
    #[must_use]
    pub const fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Returns the tolerance as a [`Duration`].
    #[must_use]
    pub fn tolerance(&self) -> Duration {
        Duration::from_secs_f64(self.tolerance_secs)
    }

    /// Checks the policy for usable values.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::InvalidConfig`] if the tolerance is negative or
    /// not finite, or the pending bound is zero.
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance_secs.is_finite() || self.tolerance_secs < 0.0 {
            return Err(FusionError::invalid_config(format!(
                "tolerance must be a non-negative number of seconds, got {}",
                self.tolerance_secs
            )));
        }
        if self.max_pending == 0 {
            return Err(FusionError::invalid_config("max_pending must be positive"));
        }
        Ok(())
    }
}

/// Outcome of one [`FrameSynchronizer::process`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Pending items handed to the match callback.
    pub matched: usize,
    /// Pending items dropped because they fell behind the match window.
    pub expired: usize,
    /// Pending items left queued for later driving timestamps.
    pub remaining: usize,
}

/// Matches a buffered stream against a driving stream by timestamp.
///
/// Items from the slower or irregular stream are [`enqueue`]d as they
/// arrive. Each call to [`process`] with a driving timestamp `t` walks the
/// queue in timestamp order:
///
/// - items older than `t - tolerance` are dropped as expired,
/// - items within `[t - tolerance, t + tolerance]` are removed and handed to
///   the callback,
/// - the walk stops at the first item newer than `t + tolerance`; it and
///   everything after it stay queued.
///
/// No item is ever matched twice.
///
/// [`enqueue`]: FrameSynchronizer::enqueue
/// [`process`]: FrameSynchronizer::process
///
/// # Example
///
/// ```
/// use sensor_fusion::{FrameSynchronizer, SyncPolicy};
/// use sensor_types::Timestamp;
///
/// let mut sync = FrameSynchronizer::new(SyncPolicy::default());
/// sync.enqueue(Timestamp::from_secs_f64(1.000), "mask");
///
/// let mut matched = Vec::new();
/// let report = sync.process(Timestamp::from_secs_f64(1.030), |_, item| matched.push(item));
///
/// assert_eq!(report.matched, 1);
/// assert_eq!(matched, ["mask"]);
/// ```
#[derive(Debug, Clone)]
pub struct FrameSynchronizer<T> {
    tolerance: Duration,
    pending: StreamBuffer<T>,
    evicted: usize,
}

impl<T> Default for FrameSynchronizer<T> {
    fn default() -> Self {
        Self::new(SyncPolicy::default())
    }
}

impl<T> FrameSynchronizer<T> {
    /// Creates a synchronizer with the given policy.
    #[must_use]
    pub fn new(policy: SyncPolicy) -> Self {
        Self {
            tolerance: policy.tolerance(),
            pending: StreamBuffer::new(policy.max_pending),
            evicted: 0,
        }
    }

    /// Returns the match tolerance.
    #[must_use]
    pub const fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Returns the number of queued items.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Returns the queued items in timestamp order.
    pub fn pending(&self) -> impl Iterator<Item = &(Timestamp, T)> {
        self.pending.iter()
    }

    /// Returns how many items were evicted because the queue was full.
    #[must_use]
    pub const fn evicted(&self) -> usize {
        self.evicted
    }

    /// Queues an item at its sorted position.
    ///
    /// If the queue is full, the oldest of the queued and incoming items is
    /// dropped and logged.
    pub fn enqueue(&mut self, timestamp: Timestamp, item: T) {
        if let Some((dropped, _)) = self.pending.push(timestamp, item) {
            self.evicted += 1;
            warn!(
                timestamp_ns = dropped.as_nanos(),
                capacity = self.pending.capacity(),
                "pending queue full, evicted oldest item"
            );
        }
    }

    /// Matches queued items against a driving timestamp.
    ///
    /// `on_match` receives each matched item with its own timestamp, in
    /// increasing timestamp order.
    pub fn process<F>(&mut self, timestamp: Timestamp, mut on_match: F) -> SyncReport
    where
        F: FnMut(Timestamp, T),
    {
        let earliest = timestamp.saturating_sub(self.tolerance);
        let latest = timestamp.saturating_add(self.tolerance);
        let mut report = SyncReport::default();

        while let Some((pending_ts, _)) = self.pending.oldest() {
            let pending_ts = *pending_ts;
            if pending_ts > latest {
                break;
            }
            let Some((pending_ts, item)) = self.pending.pop_oldest() else {
                break;
            };
            if pending_ts < earliest {
                report.expired += 1;
            } else {
                report.matched += 1;
                on_match(pending_ts, item);
            }
        }

        report.remaining = self.pending.len();
        report
    }

    /// Drops all queued items and resets the eviction counter.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.evicted = 0;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Timestamp {
        Timestamp::from_secs_f64(s)
    }

    fn collect(sync: &mut FrameSynchronizer<u32>, at: f64) -> (SyncReport, Vec<u32>) {
        let mut out = Vec::new();
        let report = sync.process(secs(at), |_, item| out.push(item));
        (report, out)
    }

    #[test]
    fn policy_defaults() {
        let policy = SyncPolicy::default();
        assert!((policy.tolerance_secs - 1.0 / 15.0).abs() < 1e-12);
        assert_eq!(policy.max_pending, DEFAULT_MAX_PENDING);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn policy_rejects_bad_values() {
        assert!(SyncPolicy::default().with_tolerance_secs(-0.1).validate().is_err());
        assert!(SyncPolicy::default().with_tolerance_secs(f64::NAN).validate().is_err());
        assert!(SyncPolicy::default().with_max_pending(0).validate().is_err());
    }

    #[test]
    fn matches_within_tolerance() {
        let mut sync = FrameSynchronizer::new(SyncPolicy::default());
        sync.enqueue(secs(1.000), 7);

        let (report, items) = collect(&mut sync, 1.030);
        assert_eq!(items, [7]);
        assert_eq!(report.matched, 1);
        assert_eq!(report.remaining, 0);
    }

    #[test]
    fn future_items_stay_queued_and_stale_items_expire() {
        let mut sync = FrameSynchronizer::new(SyncPolicy::default());
        sync.enqueue(secs(1.000), 1);

        let (report, items) = collect(&mut sync, 0.800);
        assert!(items.is_empty());
        assert_eq!(report.remaining, 1);

        let (report, items) = collect(&mut sync, 1.200);
        assert!(items.is_empty());
        assert_eq!(report.expired, 1);
        assert_eq!(sync.pending_len(), 0);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let policy = SyncPolicy::default().with_tolerance_secs(0.1);
        let mut sync = FrameSynchronizer::new(policy);
        sync.enqueue(secs(0.9), 1);
        sync.enqueue(secs(1.1), 2);

        let (_, items) = collect(&mut sync, 1.0);
        assert_eq!(items, [1, 2]);
    }

    #[test]
    fn scan_stops_at_first_future_item() {
        let policy = SyncPolicy::default().with_tolerance_secs(0.05);
        let mut sync = FrameSynchronizer::new(policy);
        sync.enqueue(secs(2.0), 3);
        sync.enqueue(secs(0.5), 1);
        sync.enqueue(secs(1.0), 2);

        let (report, items) = collect(&mut sync, 1.0);
        assert_eq!(items, [2]);
        assert_eq!(report.expired, 1);
        assert_eq!(report.remaining, 1);
        assert_eq!(sync.pending().next().map(|(_, v)| *v), Some(3));
    }

    #[test]
    fn items_are_never_matched_twice() {
        let mut sync = FrameSynchronizer::new(SyncPolicy::default());
        sync.enqueue(secs(1.0), 1);

        let (_, first) = collect(&mut sync, 1.0);
        let (_, second) = collect(&mut sync, 1.01);
        assert_eq!(first, [1]);
        assert!(second.is_empty());
    }

    #[test]
    fn full_queue_evicts_oldest() {
        let policy = SyncPolicy::default().with_max_pending(2);
        let mut sync = FrameSynchronizer::new(policy);
        sync.enqueue(secs(1.0), 1);
        sync.enqueue(secs(2.0), 2);
        sync.enqueue(secs(3.0), 3);

        assert_eq!(sync.evicted(), 1);
        assert_eq!(sync.pending_len(), 2);

        sync.clear();
        assert_eq!(sync.evicted(), 0);
        assert_eq!(sync.pending_len(), 0);
    }

    #[test]
    fn full_queue_drops_late_arrival() {
        let policy = SyncPolicy::default().with_max_pending(2);
        let mut sync = FrameSynchronizer::new(policy);
        sync.enqueue(secs(2.0), 2);
        sync.enqueue(secs(3.0), 3);
        sync.enqueue(secs(1.0), 1);

        assert_eq!(sync.evicted(), 1);
        let (_, matched) = collect(&mut sync, 2.0);
        assert_eq!(matched, [2]);
        assert_eq!(sync.pending_len(), 1);
    }

    #[test]
    fn tolerance_near_zero_timestamp_saturates() {
        let mut sync = FrameSynchronizer::new(SyncPolicy::default());
        sync.enqueue(Timestamp::zero(), 1);

        let (_, items) = collect(&mut sync, 0.01);
        assert_eq!(items, [1]);
    }
}
