//! Error types for capture data.

use thiserror::Error;

use crate::ImageEncoding;

/// Errors raised when validating capture data.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Buffer size does not match the declared dimensions.
    #[error("buffer size mismatch: expected {expected}, got {actual}")]
    BufferSizeMismatch {
        /// Expected buffer size.
        expected: usize,
        /// Actual buffer size.
        actual: usize,
    },

    /// Two grids that must share a resolution do not.
    #[error("resolution mismatch: expected {expected:?}, got {actual:?}")]
    ResolutionMismatch {
        /// Expected `(width, height)`.
        expected: (u32, u32),
        /// Actual `(width, height)`.
        actual: (u32, u32),
    },

    /// Pixel encoding cannot be interpreted for the requested purpose.
    #[error("unsupported encoding: {}", encoding.name())]
    UnsupportedEncoding {
        /// The rejected encoding.
        encoding: ImageEncoding,
    },

    /// Camera calibration cannot be inverted.
    #[error("singular camera intrinsics")]
    SingularIntrinsics,
}

impl SensorError {
    /// Creates a buffer size mismatch error.
    #[must_use]
    pub const fn buffer_mismatch(expected: usize, actual: usize) -> Self {
        Self::BufferSizeMismatch { expected, actual }
    }

    /// Creates a resolution mismatch error.
    #[must_use]
    pub const fn resolution_mismatch(expected: (u32, u32), actual: (u32, u32)) -> Self {
        Self::ResolutionMismatch { expected, actual }
    }

    /// Creates an unsupported encoding error.
    #[must_use]
    pub const fn unsupported(encoding: ImageEncoding) -> Self {
        Self::UnsupportedEncoding { encoding }
    }
}
