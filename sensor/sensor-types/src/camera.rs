//! Camera calibration and pixel encodings.

use nalgebra::{Matrix3, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pixel encoding of a raw image buffer.
///
/// Segmentation masks arrive in whatever format the segmentation source
/// produces; only the single-channel encodings can be read as per-pixel
/// confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ImageEncoding {
    /// Grayscale 8-bit (1 byte per pixel).
    #[default]
    Gray8,
    /// Grayscale 16-bit, little-endian (2 bytes per pixel).
    Gray16,
    /// Grayscale 32-bit float, little-endian (4 bytes per pixel).
    GrayF32,
    /// RGBA 8-bit per channel (4 bytes per pixel).
    Rgba8,
    /// BGRA 8-bit per channel (4 bytes per pixel).
    Bgra8,
    /// RGB 8-bit per channel (3 bytes per pixel).
    Rgb8,
    /// Bi-planar YUV 4:2:0 (Y plane + interleaved UV).
    Nv12,
}

impl ImageEncoding {
    /// Returns the number of bytes per pixel.
    ///
    /// Returns `None` for planar formats.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Gray8 => Some(1),
            Self::Gray16 => Some(2),
            Self::Rgb8 => Some(3),
            Self::GrayF32 | Self::Rgba8 | Self::Bgra8 => Some(4),
            Self::Nv12 => None,
        }
    }

    /// Returns true for single-channel encodings.
    #[must_use]
    pub const fn is_single_channel(self) -> bool {
        matches!(self, Self::Gray8 | Self::Gray16 | Self::GrayF32)
    }

    /// Returns the expected buffer size for an image of the given size.
    #[must_use]
    pub const fn buffer_size(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self.bytes_per_pixel() {
            Some(bpp) => pixels * bpp,
            None => pixels * 3 / 2,
        }
    }

    /// Returns a short name for log messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Gray8 => "gray8",
            Self::Gray16 => "gray16",
            Self::GrayF32 => "grayf32",
            Self::Rgba8 => "rgba8",
            Self::Bgra8 => "bgra8",
            Self::Rgb8 => "rgb8",
            Self::Nv12 => "nv12",
        }
    }
}

/// Camera intrinsic parameters (pinhole model with optional skew).
///
/// The intrinsic matrix is
///
/// ```text
/// | fx  s  cx |
/// |  0 fy  cy |
/// |  0  0   1 |
/// ```
///
/// `width`/`height` record the resolution the matrix was calibrated at.
/// Depth maps are frequently delivered at a lower resolution than the color
/// image the intrinsics describe, so pixel coordinates are rescaled into this
/// reference resolution before unprojection. A zero reference resolution
/// means the intrinsics already match the depth map.
///
/// # Example
///
/// ```
/// use sensor_types::CameraIntrinsics;
///
/// let k = CameraIntrinsics::new(500.0, 500.0, 320.0, 240.0, 640, 480);
/// let ray = k.inverse_matrix().map(|inv| inv * nalgebra::Vector3::new(320.0, 240.0, 1.0));
/// assert!(ray.is_some_and(|r| r.x.abs() < 1e-12 && r.y.abs() < 1e-12));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraIntrinsics {
    /// Focal length in pixels (x direction).
    pub fx: f64,
    /// Focal length in pixels (y direction).
    pub fy: f64,
    /// Principal point x-coordinate in pixels.
    pub cx: f64,
    /// Principal point y-coordinate in pixels.
    pub cy: f64,
    /// Axis skew.
    pub skew: f64,
    /// Reference image width in pixels.
    pub width: u32,
    /// Reference image height in pixels.
    pub height: u32,
}

impl CameraIntrinsics {
    /// Creates intrinsics without skew.
    #[must_use]
    pub const fn new(fx: f64, fy: f64, cx: f64, cy: f64, width: u32, height: u32) -> Self {
        Self {
            fx,
            fy,
            cx,
            cy,
            skew: 0.0,
            width,
            height,
        }
    }

    /// Identity intrinsics: unit focal lengths, principal point at the
    /// origin, and no reference resolution.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new(1.0, 1.0, 0.0, 0.0, 0, 0)
    }

    /// Builds intrinsics from a 3×3 matrix.
    ///
    /// The bottom row is assumed to be `[0, 0, 1]`.
    #[must_use]
    pub fn from_matrix(k: &Matrix3<f64>, width: u32, height: u32) -> Self {
        Self {
            fx: k[(0, 0)],
            fy: k[(1, 1)],
            cx: k[(0, 2)],
            cy: k[(1, 2)],
            skew: k[(0, 1)],
            width,
            height,
        }
    }

    /// Returns the 3×3 intrinsic matrix.
    #[must_use]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, self.skew, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    /// Returns the inverse intrinsic matrix, or `None` if it is singular.
    #[must_use]
    pub fn inverse_matrix(&self) -> Option<Matrix3<f64>> {
        self.matrix().try_inverse()
    }

    /// Returns true if a reference resolution is recorded.
    #[must_use]
    pub const fn has_reference_resolution(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Returns the factors mapping a `width × height` grid into the
    /// reference resolution.
    ///
    /// Returns `(1.0, 1.0)` when no reference resolution is recorded or the
    /// target grid is empty.
    #[must_use]
    pub fn scale_from(&self, width: u32, height: u32) -> (f64, f64) {
        if !self.has_reference_resolution() || width == 0 || height == 0 {
            return (1.0, 1.0);
        }
        (
            f64::from(self.width) / f64::from(width),
            f64::from(self.height) / f64::from(height),
        )
    }

    /// Projects a camera-space point to pixel coordinates.
    ///
    /// Returns `None` if the point is behind the camera (Z <= 0).
    #[must_use]
    pub fn project(&self, point: &Vector3<f64>) -> Option<[f64; 2]> {
        if point.z <= 0.0 {
            return None;
        }
        let pixel = self.matrix() * (point / point.z);
        Some([pixel.x, pixel.y])
    }
}

impl Default for CameraIntrinsics {
    fn default() -> Self {
        Self::identity()
    }
}
