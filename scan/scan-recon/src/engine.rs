//! Reconstruction session driver.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use sensor_fusion::{FrameSynchronizer, MaskResampler, SyncReport};
use sensor_types::{DepthFrame, DepthMap, ObjectId, SegmentationFrame, SegmentationMask, Timestamp};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ReconError, ReconResult};
use crate::export::{point_cloud_file_name, save_point_cloud, write_index};
use crate::params::ReconstructionParams;
use crate::reservoir::ObjectAccumulator;
use crate::summary::{ObjectSummary, summarize};
use crate::unproject::{Unprojector, encode_confidence};

/// Counters describing what an engine has consumed since the last reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Depth frames passed to [`ReconstructionEngine::process`].
    pub depth_frames: usize,
    /// Depth frames that matched masks but could not be unprojected.
    pub depth_frames_skipped: usize,
    /// Segmentation frames passed to [`ReconstructionEngine::enqueue`].
    pub segmentation_frames: usize,
    /// Segmentation frames matched to a depth frame.
    pub frames_matched: usize,
    /// Segmentation frames dropped without a match.
    pub frames_expired: usize,
    /// Segmentation frames dropped because the pending queue was full.
    pub frames_evicted: usize,
    /// Masks skipped because they could not be resampled.
    pub masks_skipped: usize,
    /// Points offered to accumulators.
    pub points_offered: u64,
}

/// Result of a successful [`ReconstructionEngine::finalize`].
#[derive(Debug, Clone)]
pub struct ReconstructionOutput {
    /// Path of the written JSON index.
    pub index_path: PathBuf,
    /// Number of exported objects.
    pub object_count: usize,
    /// Summary of each exported object, in identifier order.
    pub summaries: Vec<ObjectSummary>,
}

/// Fuses depth and segmentation streams into per-object point clouds.
///
/// Segmentation frames are queued with [`enqueue`](Self::enqueue) and
/// matched against each depth frame given to [`process`](Self::process).
/// Matched mask pixels are unprojected into world space and sampled into a
/// bounded accumulator per object. [`finalize`](Self::finalize) writes one
/// point cloud per object plus a JSON index.
///
/// The engine is single-threaded: calls must be serialized by the host.
///
/// # Example
///
/// ```
/// use nalgebra::Matrix4;
/// use sensor_types::{
///     CameraIntrinsics, DepthFrame, DepthMap, MaskBuffer, SegmentationFrame,
///     SegmentationMask, Timestamp,
/// };
/// use scan_recon::{ReconstructionEngine, ReconstructionParams};
///
/// let mut engine = ReconstructionEngine::new(ReconstructionParams::default().with_seed(1)).unwrap();
/// let t = Timestamp::from_secs_f64(1.0);
///
/// engine.enqueue(SegmentationFrame::new(
///     t,
///     vec![SegmentationMask::new("obj1", MaskBuffer::full(2, 2))],
/// ));
/// engine.process(&DepthFrame::new(
///     t,
///     DepthMap::filled(2, 2, 2.0),
///     CameraIntrinsics::identity(),
///     Matrix4::identity(),
/// ));
///
/// assert_eq!(engine.accumulator(&"obj1".into()).unwrap().len(), 4);
/// ```
#[derive(Debug)]
pub struct ReconstructionEngine {
    params: ReconstructionParams,
    sync: FrameSynchronizer<Vec<SegmentationMask>>,
    accumulators: BTreeMap<ObjectId, ObjectAccumulator>,
    rng: StdRng,
    resampler: MaskResampler,
    stats: EngineStats,
}

impl Default for ReconstructionEngine {
    fn default() -> Self {
        Self::with_valid_params(ReconstructionParams::default())
    }
}

impl ReconstructionEngine {
    /// Creates an engine.
    ///
    /// # Errors
    ///
    /// Returns [`ReconError::InvalidConfig`] if the parameters are invalid.
    pub fn new(params: ReconstructionParams) -> ReconResult<Self> {
        params.validate()?;
        Ok(Self::with_valid_params(params))
    }

    fn with_valid_params(params: ReconstructionParams) -> Self {
        Self {
            sync: FrameSynchronizer::new(params.sync_policy()),
            accumulators: BTreeMap::new(),
            rng: seeded_rng(params.seed),
            resampler: MaskResampler::new(),
            stats: EngineStats::default(),
            params,
        }
    }

    /// Returns the engine parameters.
    #[must_use]
    pub const fn params(&self) -> &ReconstructionParams {
        &self.params
    }

    /// Returns counters since creation or the last reset.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            frames_evicted: self.sync.evicted(),
            ..self.stats
        }
    }

    /// Returns the accumulator for an object, if any point was assigned to it.
    #[must_use]
    pub fn accumulator(&self, id: &ObjectId) -> Option<&ObjectAccumulator> {
        self.accumulators.get(id)
    }

    /// Iterates over all accumulators in identifier order.
    pub fn accumulators(&self) -> impl Iterator<Item = &ObjectAccumulator> {
        self.accumulators.values()
    }

    /// Returns the number of segmentation frames waiting for a depth match.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.sync.pending_len()
    }

    /// Queues a segmentation frame for matching.
    pub fn enqueue(&mut self, frame: SegmentationFrame) {
        self.stats.segmentation_frames += 1;
        self.sync.enqueue(frame.timestamp, frame.masks);
    }

    /// Matches pending segmentation frames against a depth frame and
    /// accumulates the points of every matched mask.
    ///
    /// Bad masks and unusable depth frames are logged and skipped.
    pub fn process(&mut self, frame: &DepthFrame) -> SyncReport {
        self.stats.depth_frames += 1;

        let mut matched: Vec<(Timestamp, Vec<SegmentationMask>)> = Vec::new();
        let report = self
            .sync
            .process(frame.timestamp, |ts, masks| matched.push((ts, masks)));
        self.stats.frames_matched += report.matched;
        self.stats.frames_expired += report.expired;

        debug!(
            timestamp_ns = frame.timestamp.as_nanos(),
            matched = report.matched,
            expired = report.expired,
            pending = report.remaining,
            "processed depth frame"
        );

        if matched.is_empty() {
            return report;
        }

        let unprojector = match Unprojector::new(frame) {
            Ok(unprojector) => unprojector,
            Err(e) => {
                self.stats.depth_frames_skipped += 1;
                warn!(
                    timestamp_ns = frame.timestamp.as_nanos(),
                    error = %e,
                    "skipping depth frame"
                );
                return report;
            }
        };

        for (_, masks) in &matched {
            for mask in masks {
                if let Err(e) = self.integrate_mask(&unprojector, &frame.depth, mask) {
                    self.stats.masks_skipped += 1;
                    warn!(id = %mask.id, error = %e, "skipping mask");
                }
            }
        }
        report
    }

    /// Unprojects one mask's pixels into its object's accumulator.
    ///
    /// Returns the number of points offered.
    fn integrate_mask(
        &mut self,
        unprojector: &Unprojector<'_>,
        depth: &DepthMap,
        mask: &SegmentationMask,
    ) -> ReconResult<u64> {
        let grid = self.resampler.resample(&mask.mask, depth.width, depth.height)?;

        let created = !self.accumulators.contains_key(&mask.id);
        let capacity = self.params.max_points_per_object;
        let accumulator = self
            .accumulators
            .entry(mask.id.clone())
            .or_insert_with(|| ObjectAccumulator::new(mask.id.clone(), capacity));

        let width = depth.width as usize;
        let mut offered = 0u64;
        for (index, (&value, &d)) in grid.iter().zip(&depth.depths).enumerate() {
            if !self.params.accepts_mask_value(value) || !DepthMap::is_valid_depth(d) {
                continue;
            }
            let (x, y) = (index % width, index / width);
            let Ok(x) = u32::try_from(x) else { continue };
            let Ok(y) = u32::try_from(y) else { continue };

            let point = unprojector.world_point(x, y, d);
            let confidence =
                encode_confidence(unprojector.depth_confidence(index), value * mask.confidence);
            accumulator.append(point, confidence, &mut self.rng);
            offered += 1;
        }

        if offered > 0 {
            accumulator.adopt_label(mask.label.as_deref());
        } else if created {
            self.accumulators.remove(&mask.id);
        }
        self.stats.points_offered += offered;
        Ok(offered)
    }

    /// Discards all accumulators, pending frames, and counters.
    ///
    /// A seeded engine restarts its sampling sequence.
    pub fn reset(&mut self) {
        self.accumulators.clear();
        self.sync.clear();
        self.stats = EngineStats::default();
        self.rng = seeded_rng(self.params.seed);
        debug!("reconstruction engine reset");
    }

    /// Writes every non-empty object and the JSON index.
    ///
    /// Point clouds go to `output_dir`, created if absent. Objects whose file
    /// cannot be written are logged and left out of the index.
    ///
    /// Returns `None` if no object could be exported or the index could not
    /// be written.
    #[must_use]
    pub fn finalize(&self, output_dir: &Path, index_path: &Path) -> Option<ReconstructionOutput> {
        let objects: Vec<&ObjectAccumulator> =
            self.accumulators.values().filter(|a| !a.is_empty()).collect();
        if objects.is_empty() {
            info!("no objects to export");
            return None;
        }

        info!(
            objects = objects.len(),
            output_dir = %output_dir.display(),
            "finalizing reconstruction"
        );

        if let Err(e) = std::fs::create_dir_all(output_dir) {
            warn!(error = %ReconError::io(output_dir, e), "cannot create output directory");
            return None;
        }

        let mut summaries = Vec::with_capacity(objects.len());
        for accumulator in objects {
            match self.export_object(accumulator, output_dir) {
                Ok(Some(summary)) => summaries.push(summary),
                Ok(None) => {}
                Err(e) => warn!(id = %accumulator.id(), error = %e, "skipping object export"),
            }
        }

        if summaries.is_empty() {
            warn!("every object export failed");
            return None;
        }

        if let Err(e) = write_index(index_path, &summaries) {
            warn!(error = %e, "failed to write object index");
            return None;
        }

        info!(
            objects = summaries.len(),
            index = %index_path.display(),
            "reconstruction exported"
        );
        Some(ReconstructionOutput {
            index_path: index_path.to_path_buf(),
            object_count: summaries.len(),
            summaries,
        })
    }

    fn export_object(
        &self,
        accumulator: &ObjectAccumulator,
        output_dir: &Path,
    ) -> ReconResult<Option<ObjectSummary>> {
        let file_name = point_cloud_file_name(accumulator.id(), &self.params.point_file_extension);
        save_point_cloud(
            output_dir.join(&file_name),
            accumulator.samples(),
            self.params.float_precision,
        )?;
        Ok(summarize(accumulator, &file_name))
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}
