//! Depth sensor types.
//!
//! A [`DepthFrame`] bundles everything one depth sample carries: the depth
//! map itself, the optional per-pixel confidence levels, the camera
//! calibration and the camera pose at capture time.

use nalgebra::Matrix4;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CameraIntrinsics, SensorError, Timestamp};

/// Highest discrete level in a [`ConfidenceMap`].
pub const MAX_CONFIDENCE_LEVEL: u8 = 2;

/// Per-pixel depth in meters.
///
/// Stored in row-major order: `depths[y * width + x]`. Non-finite and
/// non-positive values mark pixels without a measurement.
///
/// # Example
///
/// ```
/// use sensor_types::DepthMap;
///
/// let map = DepthMap::filled(4, 3, 1.5);
/// assert_eq!(map.pixel_count(), 12);
/// assert_eq!(map.get(3, 2), Some(1.5));
/// assert_eq!(map.get(4, 0), None);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DepthMap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major depth values in meters.
    pub depths: Vec<f32>,
}

impl DepthMap {
    /// Creates a depth map, checking the buffer length.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::BufferSizeMismatch`] if `depths` does not hold
    /// exactly `width * height` values.
    pub fn new(width: u32, height: u32, depths: Vec<f32>) -> Result<Self, SensorError> {
        let map = Self {
            width,
            height,
            depths,
        };
        map.validate()?;
        Ok(map)
    }

    /// Creates a depth map with every pixel set to `depth`.
    #[must_use]
    pub fn filled(width: u32, height: u32, depth: f32) -> Self {
        Self {
            width,
            height,
            depths: vec![depth; width as usize * height as usize],
        }
    }

    /// Returns the number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Checks that the buffer matches the declared dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::BufferSizeMismatch`] on mismatch.
    pub fn validate(&self) -> Result<(), SensorError> {
        if self.depths.len() == self.pixel_count() {
            Ok(())
        } else {
            Err(SensorError::buffer_mismatch(
                self.pixel_count(),
                self.depths.len(),
            ))
        }
    }

    /// Gets the depth at a pixel, or `None` if out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.depths
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Returns true if a depth value is a usable measurement.
    #[must_use]
    pub fn is_valid_depth(depth: f32) -> bool {
        depth.is_finite() && depth > 0.0
    }

    /// Counts pixels with a usable measurement.
    #[must_use]
    pub fn valid_pixel_count(&self) -> usize {
        self.depths
            .iter()
            .filter(|&&d| Self::is_valid_depth(d))
            .count()
    }
}

/// Per-pixel discrete depth reliability (`0..=2`).
///
/// Level `n` maps to a confidence of `n / 2`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConfidenceMap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major confidence levels.
    pub levels: Vec<u8>,
}

impl ConfidenceMap {
    /// Creates a confidence map with every pixel at `level`.
    #[must_use]
    pub fn filled(width: u32, height: u32, level: u8) -> Self {
        Self {
            width,
            height,
            levels: vec![level; width as usize * height as usize],
        }
    }

    /// Returns the level at a flat index, or `None` if out of bounds.
    #[must_use]
    pub fn level_at(&self, index: usize) -> Option<u8> {
        self.levels.get(index).copied()
    }

    /// Converts a discrete level to a confidence in `[0, 1]`.
    ///
    /// Levels above [`MAX_CONFIDENCE_LEVEL`] saturate at `1.0`.
    #[must_use]
    pub fn level_to_confidence(level: u8) -> f32 {
        f32::from(level.min(MAX_CONFIDENCE_LEVEL)) / f32::from(MAX_CONFIDENCE_LEVEL)
    }

    /// Returns true if this map has the same resolution as `depth`
    /// and a correctly sized buffer.
    #[must_use]
    pub fn matches(&self, depth: &DepthMap) -> bool {
        self.width == depth.width
            && self.height == depth.height
            && self.levels.len() == depth.pixel_count()
    }
}

/// One depth sample with calibration and pose.
///
/// # Example
///
/// ```
/// use nalgebra::Matrix4;
/// use sensor_types::{CameraIntrinsics, DepthFrame, DepthMap, Timestamp};
///
/// let frame = DepthFrame::new(
///     Timestamp::from_secs_f64(0.5),
///     DepthMap::filled(2, 2, 2.0),
///     CameraIntrinsics::identity(),
///     Matrix4::identity(),
/// );
/// assert!(frame.confidence.is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DepthFrame {
    /// Capture time.
    pub timestamp: Timestamp,
    /// Depth in meters.
    pub depth: DepthMap,
    /// Optional per-pixel reliability, same resolution as `depth`.
    pub confidence: Option<ConfidenceMap>,
    /// Camera calibration.
    pub intrinsics: CameraIntrinsics,
    /// Camera-to-world rigid transform.
    pub camera_to_world: Matrix4<f64>,
}

impl DepthFrame {
    /// Creates a frame without a confidence map.
    #[must_use]
    pub fn new(
        timestamp: Timestamp,
        depth: DepthMap,
        intrinsics: CameraIntrinsics,
        camera_to_world: Matrix4<f64>,
    ) -> Self {
        Self {
            timestamp,
            depth,
            confidence: None,
            intrinsics,
            camera_to_world,
        }
    }

    /// Attaches a confidence map.
    #[must_use]
    pub fn with_confidence(mut self, confidence: ConfidenceMap) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
