//! Capture-side data types for object scanning.
//!
//! This crate defines the inputs a capture session hands to the
//! reconstruction pipeline:
//!
//! - [`DepthFrame`] - Depth map, optional confidence map, intrinsics and pose
//! - [`SegmentationFrame`] - Per-object masks for one video frame
//! - [`SegmentationMask`] / [`MaskBuffer`] - One object's mask and its raw pixels
//! - [`ObjectId`] - Stable identifier for a tracked object
//!
//! # Time
//!
//! All frames use [`Timestamp`] for nanosecond-precision timing so that
//! depth and segmentation streams can be matched in `sensor-fusion`.
//!
//! # Example
//!
//! ```
//! use sensor_types::{MaskBuffer, SegmentationFrame, SegmentationMask, Timestamp};
//!
//! let frame = SegmentationFrame::new(
//!     Timestamp::from_secs_f64(1.0),
//!     vec![SegmentationMask::new("chair", MaskBuffer::full(4, 4)).with_label("chair")],
//! );
//!
//! assert_eq!(frame.masks.len(), 1);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod camera;
mod depth;
mod error;
mod segmentation;
mod time;

pub use camera::{CameraIntrinsics, ImageEncoding};
pub use depth::{ConfidenceMap, DepthFrame, DepthMap, MAX_CONFIDENCE_LEVEL};
pub use error::SensorError;
pub use segmentation::{MaskBuffer, ObjectId, SegmentationFrame, SegmentationMask};
pub use time::{Duration, Timestamp};
