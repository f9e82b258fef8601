//! Depth pixel to world point conversion.

// Pixel indices are bounded by u32 image dimensions.
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use nalgebra::{Matrix3, Matrix4, Vector3, Vector4};
use sensor_types::{ConfidenceMap, DepthFrame, SensorError};

use crate::error::ReconResult;

/// Unprojects pixels of one depth frame into world space.
///
/// Built once per frame: the inverse intrinsics and the pixel scale are
/// computed up front so the per-pixel path does no allocation or inversion.
///
/// # Example
///
/// ```
/// use nalgebra::Matrix4;
/// use sensor_types::{CameraIntrinsics, DepthFrame, DepthMap, Timestamp};
/// use scan_recon::Unprojector;
///
/// let frame = DepthFrame::new(
///     Timestamp::zero(),
///     DepthMap::filled(2, 2, 2.0),
///     CameraIntrinsics::identity(),
///     Matrix4::identity(),
/// );
/// let unprojector = Unprojector::new(&frame).unwrap();
/// let point = unprojector.world_point(1, 1, 2.0);
/// assert_eq!(point, [2.0, 2.0, 2.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Unprojector<'a> {
    inverse_intrinsics: Matrix3<f64>,
    camera_to_world: Matrix4<f64>,
    scale: (f64, f64),
    confidence: Option<&'a ConfidenceMap>,
}

impl<'a> Unprojector<'a> {
    /// Prepares unprojection for a depth frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the depth buffer does not match its dimensions,
    /// the confidence map has a different resolution, or the intrinsic
    /// matrix is singular.
    pub fn new(frame: &'a DepthFrame) -> ReconResult<Self> {
        frame.depth.validate()?;

        if let Some(confidence) = &frame.confidence {
            if !confidence.matches(&frame.depth) {
                return Err(SensorError::resolution_mismatch(
                    (frame.depth.width, frame.depth.height),
                    (confidence.width, confidence.height),
                )
                .into());
            }
        }

        let inverse_intrinsics = frame
            .intrinsics
            .inverse_matrix()
            .ok_or(SensorError::SingularIntrinsics)?;

        Ok(Self {
            inverse_intrinsics,
            camera_to_world: frame.camera_to_world,
            scale: frame
                .intrinsics
                .scale_from(frame.depth.width, frame.depth.height),
            confidence: frame.confidence.as_ref(),
        })
    }

    /// Returns the camera-space point for a depth pixel.
    #[must_use]
    #[inline]
    pub fn camera_point(&self, x: u32, y: u32, depth: f32) -> Vector3<f64> {
        let pixel = Vector3::new(f64::from(x) * self.scale.0, f64::from(y) * self.scale.1, 1.0);
        self.inverse_intrinsics * pixel * f64::from(depth)
    }

    /// Returns the world-space point for a depth pixel.
    #[must_use]
    #[inline]
    pub fn world_point(&self, x: u32, y: u32, depth: f32) -> [f32; 3] {
        let camera = self.camera_point(x, y, depth);
        let world = self.camera_to_world * Vector4::new(camera.x, camera.y, camera.z, 1.0);
        [world.x as f32, world.y as f32, world.z as f32]
    }

    /// Returns the depth confidence in `[0, 1]` at a flat pixel index.
    ///
    /// Frames without a confidence map report `1.0`.
    #[must_use]
    #[inline]
    pub fn depth_confidence(&self, index: usize) -> f32 {
        self.confidence
            .and_then(|map| map.level_at(index))
            .map_or(1.0, ConfidenceMap::level_to_confidence)
    }
}

/// Combines depth and mask confidence into one byte.
///
/// Both factors are clamped to `[0, 1]`; the product is scaled to
/// `0..=255` and rounded.
#[must_use]
#[inline]
pub fn encode_confidence(depth_confidence: f32, mask_confidence: f32) -> u8 {
    let mask = if mask_confidence.is_nan() {
        0.0
    } else {
        mask_confidence.clamp(0.0, 1.0)
    };
    let combined = (depth_confidence * mask).clamp(0.0, 1.0);
    if combined.is_nan() {
        return 0;
    }
    (combined * 255.0).round() as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sensor_types::{CameraIntrinsics, DepthMap, Timestamp};

    fn frame(intrinsics: CameraIntrinsics, pose: Matrix4<f64>) -> DepthFrame {
        DepthFrame::new(Timestamp::zero(), DepthMap::filled(4, 4, 1.0), intrinsics, pose)
    }

    #[test]
    fn test_identity_camera_scales_by_depth() {
        let frame = frame(CameraIntrinsics::identity(), Matrix4::identity());
        let unprojector = Unprojector::new(&frame).unwrap();

        assert_eq!(unprojector.world_point(0, 0, 2.0), [0.0, 0.0, 2.0]);
        assert_eq!(unprojector.world_point(3, 1, 0.5), [1.5, 0.5, 0.5]);
    }

    #[test]
    fn test_pinhole_ray_through_principal_point() {
        let intrinsics = CameraIntrinsics::new(500.0, 500.0, 2.0, 2.0, 0, 0);
        let frame = frame(intrinsics, Matrix4::identity());
        let unprojector = Unprojector::new(&frame).unwrap();

        let point = unprojector.world_point(2, 2, 3.0);
        assert_relative_eq!(point[0], 0.0);
        assert_relative_eq!(point[1], 0.0);
        assert_relative_eq!(point[2], 3.0);
    }

    #[test]
    fn test_pixels_scaled_to_reference_resolution() {
        // Calibrated at 8x8, depth delivered at 4x4.
        let intrinsics = CameraIntrinsics::new(1.0, 1.0, 0.0, 0.0, 8, 8);
        let frame = frame(intrinsics, Matrix4::identity());
        let unprojector = Unprojector::new(&frame).unwrap();

        let camera = unprojector.camera_point(1, 3, 1.0);
        assert_relative_eq!(camera.x, 2.0);
        assert_relative_eq!(camera.y, 6.0);
    }

    #[test]
    fn test_pose_translates_points() {
        let pose = Matrix4::new_translation(&Vector3::new(1.0, -2.0, 0.5));
        let frame = frame(CameraIntrinsics::identity(), pose);
        let unprojector = Unprojector::new(&frame).unwrap();

        assert_eq!(unprojector.world_point(0, 0, 1.0), [1.0, -2.0, 1.5]);
    }

    #[test]
    fn test_singular_intrinsics_rejected() {
        let intrinsics = CameraIntrinsics::new(0.0, 1.0, 0.0, 0.0, 0, 0);
        let frame = frame(intrinsics, Matrix4::identity());
        assert!(Unprojector::new(&frame).is_err());
    }

    #[test]
    fn test_confidence_map_must_match_depth() {
        let frame = frame(CameraIntrinsics::identity(), Matrix4::identity())
            .with_confidence(ConfidenceMap::filled(2, 2, 2));
        assert!(Unprojector::new(&frame).is_err());
    }

    #[test]
    fn test_depth_confidence_levels() {
        let mut map = ConfidenceMap::filled(4, 4, 2);
        map.levels[1] = 1;
        map.levels[2] = 0;
        let frame = frame(CameraIntrinsics::identity(), Matrix4::identity()).with_confidence(map);
        let unprojector = Unprojector::new(&frame).unwrap();

        assert_relative_eq!(unprojector.depth_confidence(0), 1.0);
        assert_relative_eq!(unprojector.depth_confidence(1), 0.5);
        assert_relative_eq!(unprojector.depth_confidence(2), 0.0);

        let plain = self::frame(CameraIntrinsics::identity(), Matrix4::identity());
        let unprojector = Unprojector::new(&plain).unwrap();
        assert_relative_eq!(unprojector.depth_confidence(5), 1.0);
    }

    #[test]
    fn test_encode_confidence() {
        assert_eq!(encode_confidence(1.0, 1.0), 255);
        assert_eq!(encode_confidence(0.5, 0.5), 64);
        assert_eq!(encode_confidence(1.0, 2.0), 255);
        assert_eq!(encode_confidence(1.0, -0.5), 0);
        assert_eq!(encode_confidence(1.0, f32::NAN), 0);
        assert_eq!(encode_confidence(0.0, 1.0), 0);
    }
}
