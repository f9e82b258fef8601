//! Error types for sensor-fusion crate.

use sensor_types::SensorError;
use thiserror::Error;

/// Errors that can occur in sensor fusion operations.
#[derive(Debug, Error)]
pub enum FusionError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An image with no pixels was supplied or requested.
    #[error("empty image: {width}x{height}")]
    EmptyImage {
        /// Image width.
        width: u32,
        /// Image height.
        height: u32,
    },

    /// Input data failed validation.
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

impl FusionError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates an empty image error.
    #[must_use]
    pub const fn empty_image(width: u32, height: u32) -> Self {
        Self::EmptyImage { width, height }
    }
}

/// Result type for sensor fusion operations.
pub type Result<T> = std::result::Result<T, FusionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_types::ImageEncoding;

    #[test]
    fn error_invalid_config() {
        let err = FusionError::invalid_config("tolerance must be positive");
        assert!(err.to_string().contains("invalid configuration"));
    }

    #[test]
    fn error_empty_image() {
        let err = FusionError::empty_image(0, 4);
        assert_eq!(err.to_string(), "empty image: 0x4");
    }

    #[test]
    fn error_from_sensor() {
        let err: FusionError = SensorError::unsupported(ImageEncoding::Nv12).into();
        assert!(err.to_string().contains("nv12"));
    }
}
