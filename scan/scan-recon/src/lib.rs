//! Per-object point cloud reconstruction from depth and segmentation streams.
//!
//! A capture session feeds two streams into a [`ReconstructionEngine`]:
//! segmentation frames (one mask per tracked object) and depth frames with
//! calibration and pose. The engine matches them in time, unprojects every
//! masked depth pixel into world space, and keeps a bounded uniform sample
//! of points per object.
//!
//! # Pipeline
//!
//! - [`Unprojector`] - Depth pixel plus intrinsics and pose to world point
//! - [`ObjectAccumulator`] - Fixed-capacity reservoir of points per object
//! - [`OrientedBoundingBox`] - Principal-axis box with a right-handed basis
//! - [`ObjectSummary`] - Centroid, confidence and box for the JSON index
//! - [`save_point_cloud`] / [`read_point_cloud`] - ASCII PLY per object
//!
//! # Example
//!
//! ```
//! use nalgebra::Matrix4;
//! use sensor_types::{
//!     CameraIntrinsics, DepthFrame, DepthMap, MaskBuffer, SegmentationFrame,
//!     SegmentationMask, Timestamp,
//! };
//! use scan_recon::{ReconstructionEngine, ReconstructionParams};
//!
//! let mut engine = ReconstructionEngine::new(ReconstructionParams::default()).unwrap();
//!
//! engine.enqueue(SegmentationFrame::new(
//!     Timestamp::from_secs_f64(1.0),
//!     vec![SegmentationMask::new("chair", MaskBuffer::full(4, 4)).with_label("chair")],
//! ));
//! engine.process(&DepthFrame::new(
//!     Timestamp::from_secs_f64(1.02),
//!     DepthMap::filled(4, 4, 1.5),
//!     CameraIntrinsics::identity(),
//!     Matrix4::identity(),
//! ));
//!
//! let dir = std::env::temp_dir().join("scan-recon-doc");
//! let output = engine.finalize(&dir, &dir.join("objects.json")).unwrap();
//! assert_eq!(output.object_count, 1);
//! assert_eq!(output.summaries[0].point_count, 16);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod engine;
mod error;
mod export;
mod obb;
mod params;
mod reservoir;
mod summary;
mod unproject;

pub use engine::{EngineStats, ReconstructionEngine, ReconstructionOutput};
pub use error::{ReconError, ReconResult};
pub use export::{
    point_cloud_file_name, read_point_cloud, save_point_cloud, write_index, write_point_cloud,
};
pub use obb::{MIN_FIT_POINTS, OrientedBoundingBox, centroid};
pub use params::{DEFAULT_MAX_POINTS, ReconstructionParams};
pub use reservoir::{ObjectAccumulator, SampledPoint};
pub use summary::{BoundingBoxSummary, ObjectSummary, average_confidence, summarize};
pub use unproject::{Unprojector, encode_confidence};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        ObjectAccumulator, ObjectSummary, OrientedBoundingBox, ReconError, ReconResult,
        ReconstructionEngine, ReconstructionOutput, ReconstructionParams,
    };
}
