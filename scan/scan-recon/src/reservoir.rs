//! Bounded uniform point sampling per object.
//!
//! Each tracked object owns an [`ObjectAccumulator`] that keeps a uniform
//! random sample of every point ever offered to it (Algorithm R). Memory is
//! fixed by the capacity regardless of how long the capture runs.

use rand::Rng;
use sensor_types::ObjectId;

/// A sampled point: world-space position and encoded confidence.
pub type SampledPoint = ([f32; 3], u8);

/// Reservoir of sampled points for one object.
///
/// # Invariants
///
/// - `len() <= capacity()`
/// - `total_seen() >= len() as u64`
/// - after `n` appends, each appended point is retained with probability
///   `min(1, capacity / n)`
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use scan_recon::ObjectAccumulator;
///
/// let mut rng = StdRng::seed_from_u64(1);
/// let mut acc = ObjectAccumulator::new("cup".into(), 2);
/// for i in 0..5 {
///     acc.append([i as f32, 0.0, 0.0], 255, &mut rng);
/// }
///
/// assert_eq!(acc.len(), 2);
/// assert_eq!(acc.total_seen(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct ObjectAccumulator {
    id: ObjectId,
    label: Option<String>,
    points: Vec<[f32; 3]>,
    confidences: Vec<u8>,
    total_seen: u64,
    capacity: usize,
}

impl ObjectAccumulator {
    /// Creates an empty accumulator holding at most `capacity` points
    /// (minimum 1).
    #[must_use]
    pub fn new(id: ObjectId, capacity: usize) -> Self {
        Self {
            id,
            label: None,
            points: Vec::new(),
            confidences: Vec::new(),
            total_seen: 0,
            capacity: capacity.max(1),
        }
    }

    /// Returns the object identifier.
    #[must_use]
    pub const fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Returns the semantic label, if one has been seen.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Sets the label if none is recorded yet.
    pub fn adopt_label(&mut self, label: Option<&str>) {
        if self.label.is_none() {
            self.label = label.map(str::to_owned);
        }
    }

    /// Returns the maximum number of retained points.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of retained points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if no point is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the number of points ever offered.
    #[must_use]
    pub const fn total_seen(&self) -> u64 {
        self.total_seen
    }

    /// Returns the retained positions.
    #[must_use]
    pub fn points(&self) -> &[[f32; 3]] {
        &self.points
    }

    /// Returns the retained confidences, parallel to [`points`](Self::points).
    #[must_use]
    pub fn confidences(&self) -> &[u8] {
        &self.confidences
    }

    /// Iterates over retained `(position, confidence)` pairs.
    pub fn samples(&self) -> impl ExactSizeIterator<Item = SampledPoint> + '_ {
        self.points
            .iter()
            .copied()
            .zip(self.confidences.iter().copied())
    }

    /// Offers one point to the reservoir.
    ///
    /// While the reservoir is filling the point is always kept. Afterwards a
    /// uniform index `r` in `[0, total_seen)` is drawn; the point replaces
    /// slot `r` when `r < capacity` and is discarded otherwise.
    pub fn append<R: Rng + ?Sized>(&mut self, point: [f32; 3], confidence: u8, rng: &mut R) {
        self.total_seen += 1;

        if self.points.len() < self.capacity {
            self.points.push(point);
            self.confidences.push(confidence);
            return;
        }

        let r = rng.gen_range(0..self.total_seen);
        if let Ok(slot) = usize::try_from(r) {
            if slot < self.capacity {
                self.points[slot] = point;
                self.confidences[slot] = confidence;
            }
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss
)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn accumulator(capacity: usize) -> ObjectAccumulator {
        ObjectAccumulator::new(ObjectId::from("obj"), capacity)
    }

    #[test]
    fn test_fill_phase_keeps_everything_in_order() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut acc = accumulator(10);
        for i in 0..10u8 {
            acc.append([f32::from(i), 0.0, 0.0], i, &mut rng);
        }

        assert_eq!(acc.len(), 10);
        assert_eq!(acc.total_seen(), 10);
        let xs: Vec<f32> = acc.points().iter().map(|p| p[0]).collect();
        assert_eq!(xs, (0..10u8).map(f32::from).collect::<Vec<_>>());
        assert_eq!(acc.confidences(), (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn test_capacity_bounds_length() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut acc = accumulator(16);
        for i in 0..1000 {
            acc.append([i as f32, 0.0, 0.0], 1, &mut rng);
        }

        assert_eq!(acc.len(), 16);
        assert_eq!(acc.total_seen(), 1000);
        assert_eq!(acc.confidences().len(), acc.points().len());
        assert_eq!(acc.samples().len(), 16);
    }

    #[test]
    fn test_points_and_confidences_stay_paired() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut acc = accumulator(8);
        for i in 0..200u32 {
            let tag = u8::try_from(i % 256).unwrap();
            acc.append([f32::from(tag), 0.0, 0.0], tag, &mut rng);
        }

        for (point, confidence) in acc.samples() {
            assert_eq!(point[0], f32::from(confidence));
        }
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut acc = accumulator(0);
        acc.append([0.0; 3], 0, &mut rng);
        acc.append([1.0; 3], 0, &mut rng);

        assert_eq!(acc.capacity(), 1);
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn test_label_is_adopted_once() {
        let mut acc = accumulator(4);
        acc.adopt_label(None);
        assert_eq!(acc.label(), None);

        acc.adopt_label(Some("chair"));
        acc.adopt_label(Some("table"));
        assert_eq!(acc.label(), Some("chair"));
    }

    #[test]
    fn test_retention_is_uniform() {
        const CAPACITY: usize = 10;
        const STREAM: usize = 100;
        const TRIALS: usize = 4000;

        let mut rng = StdRng::seed_from_u64(42);
        let mut kept = [0usize; STREAM];

        for _ in 0..TRIALS {
            let mut acc = accumulator(CAPACITY);
            for i in 0..STREAM {
                acc.append([i as f32, 0.0, 0.0], 0, &mut rng);
            }
            for point in acc.points() {
                kept[point[0] as usize] += 1;
            }
        }

        let expected = CAPACITY as f64 / STREAM as f64;
        for (index, &count) in kept.iter().enumerate() {
            let frequency = count as f64 / TRIALS as f64;
            assert!(
                (frequency - expected).abs() < 0.03,
                "point {index} kept with frequency {frequency}, expected {expected}"
            );
        }
    }
}
