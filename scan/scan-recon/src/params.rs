//! Reconstruction parameters.

use std::path::Path;

use sensor_fusion::{DEFAULT_MAX_PENDING, DEFAULT_TOLERANCE_SECS, SyncPolicy};
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, ReconResult};

/// Default number of points retained per object.
pub const DEFAULT_MAX_POINTS: usize = 200_000;

/// Parameters for a reconstruction session.
///
/// Hosts can build these in code, or load them from a JSON file where any
/// omitted field takes its default.
///
/// # Example
///
/// ```
/// use scan_recon::ReconstructionParams;
///
/// let params = ReconstructionParams::from_json_str(r#"{ "max_points_per_object": 5000 }"#).unwrap();
/// assert_eq!(params.max_points_per_object, 5000);
/// assert_eq!(params.point_file_extension, "ply");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionParams {
    /// Reservoir capacity per object. Default: 200 000.
    pub max_points_per_object: usize,

    /// Maximum `|segmentation - depth|` timestamp distance for a match,
    /// in seconds. Default: 1/15.
    pub sync_tolerance_secs: f64,

    /// Minimum mask value for a pixel to belong to the object. Zero means
    /// any non-zero value. Default: 0.0.
    pub mask_threshold: f32,

    /// Pending segmentation frames kept before the oldest is evicted.
    /// Default: 64.
    pub max_pending_frames: usize,

    /// Extension of per-object point cloud files. Default: `"ply"`.
    pub point_file_extension: String,

    /// Decimal places written for point coordinates. Default: 6.
    pub float_precision: usize,

    /// Seed for the sampling RNG. `None` seeds from system entropy.
    pub seed: Option<u64>,
}

impl Default for ReconstructionParams {
    fn default() -> Self {
        Self {
            max_points_per_object: DEFAULT_MAX_POINTS,
            sync_tolerance_secs: DEFAULT_TOLERANCE_SECS,
            mask_threshold: 0.0,
            max_pending_frames: DEFAULT_MAX_PENDING,
            point_file_extension: "ply".to_string(),
            float_precision: 6,
            seed: None,
        }
    }
}

impl ReconstructionParams {
    /// Creates new parameters with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters for dense captures of a few large objects.
    #[must_use]
    pub fn high_density() -> Self {
        Self {
            max_points_per_object: 1_000_000,
            mask_threshold: 0.5,
            ..Self::default()
        }
    }

    /// Parameters for sessions with many objects on constrained devices.
    #[must_use]
    pub fn low_memory() -> Self {
        Self {
            max_points_per_object: 20_000,
            max_pending_frames: 16,
            float_precision: 4,
            ..Self::default()
        }
    }

    /// Sets the reservoir capacity per object.
    #[must_use]
    pub fn with_max_points(mut self, max_points: usize) -> Self {
        self.max_points_per_object = max_points;
        self
    }

    /// Sets the synchronization tolerance in seconds.
    #[must_use]
    pub fn with_sync_tolerance(mut self, secs: f64) -> Self {
        self.sync_tolerance_secs = secs;
        self
    }

    /// Sets the mask threshold.
    #[must_use]
    pub fn with_mask_threshold(mut self, threshold: f32) -> Self {
        self.mask_threshold = threshold;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Parses parameters from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values fail
    /// [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> ReconResult<Self> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Loads parameters from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> ReconResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ReconError::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// Checks the parameters for usable values.
    ///
    /// # Errors
    ///
    /// Returns [`ReconError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> ReconResult<()> {
        if self.max_points_per_object == 0 {
            return Err(ReconError::invalid_config(
                "max_points_per_object must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&self.mask_threshold) {
            return Err(ReconError::invalid_config(format!(
                "mask_threshold must be in [0, 1], got {}",
                self.mask_threshold
            )));
        }
        if self.point_file_extension.is_empty()
            || self.point_file_extension.contains(['/', '\\', '.'])
        {
            return Err(ReconError::invalid_config(format!(
                "invalid point file extension {:?}",
                self.point_file_extension
            )));
        }
        self.sync_policy()
            .validate()
            .map_err(|e| ReconError::invalid_config(e.to_string()))?;
        Ok(())
    }

    /// Returns the synchronization policy implied by these parameters.
    #[must_use]
    pub const fn sync_policy(&self) -> SyncPolicy {
        SyncPolicy {
            tolerance_secs: self.sync_tolerance_secs,
            max_pending: self.max_pending_frames,
        }
    }

    /// Returns true if a mask value marks a pixel as part of the object.
    #[must_use]
    #[inline]
    pub fn accepts_mask_value(&self, value: f32) -> bool {
        value > 0.0 && value >= self.mask_threshold
    }
}
