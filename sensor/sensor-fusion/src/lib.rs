//! Stream alignment for object scanning.
//!
//! This crate lines up the two capture streams that feed reconstruction:
//!
//! # Temporal Alignment
//!
//! - [`StreamBuffer`] - Bounded, timestamp-sorted queue of pending items
//! - [`FrameSynchronizer`] - Matches queued items against a driving stream
//!   within a tolerance window, expiring items that fall behind
//! - [`SyncPolicy`] / [`SyncReport`] - Matching configuration and outcome
//!
//! # Spatial Alignment
//!
//! - [`decode_mask`] - Raw mask pixels to confidence in `[0, 1]`
//! - [`resample_mask`] - Mask confidence resampled onto the depth grid
//! - [`MaskResampler`] - Resampling with buffers reused across masks
//!
//! # Example
//!
//! ```
//! use sensor_fusion::{FrameSynchronizer, SyncPolicy};
//! use sensor_types::Timestamp;
//!
//! let mut sync = FrameSynchronizer::new(SyncPolicy::default());
//! sync.enqueue(Timestamp::from_secs_f64(1.0), 42);
//!
//! let report = sync.process(Timestamp::from_secs_f64(1.2), |_, _| {});
//! assert_eq!(report.expired, 1);
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod buffer;
mod error;
mod resample;
mod sync;

pub use buffer::StreamBuffer;
pub use error::{FusionError, Result};
pub use resample::{MaskResampler, decode_mask, resample_mask};
pub use sync::{
    DEFAULT_MAX_PENDING, DEFAULT_TOLERANCE_SECS, FrameSynchronizer, SyncPolicy, SyncReport,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        FrameSynchronizer, FusionError, MaskResampler, StreamBuffer, SyncPolicy, SyncReport,
        decode_mask, resample_mask,
    };
}
