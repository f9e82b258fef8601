//! Error types for reconstruction operations.

use std::path::PathBuf;

use sensor_fusion::FusionError;
use sensor_types::SensorError;
use thiserror::Error;

/// Result type for reconstruction operations.
pub type ReconResult<T> = Result<T, ReconError>;

/// Errors that can occur while reconstructing or exporting objects.
#[derive(Debug, Error)]
pub enum ReconError {
    /// Invalid parameter value.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Depth frame cannot be unprojected.
    #[error("invalid depth frame: {0}")]
    InvalidFrame(#[from] SensorError),

    /// Mask could not be aligned to the depth grid.
    #[error("mask alignment failed: {0}")]
    Alignment(#[from] FusionError),

    /// I/O error during file operations.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Point cloud file could not be parsed.
    #[error("point cloud parse error at line {line}: {reason}")]
    PointCloudParse {
        /// One-based line number.
        line: usize,
        /// Description of the problem.
        reason: String,
    },
}

impl ReconError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Creates an I/O error tagged with the path involved.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a point cloud parse error.
    #[must_use]
    pub fn parse(line: usize, reason: impl Into<String>) -> Self {
        Self::PointCloudParse {
            line,
            reason: reason.into(),
        }
    }
}
