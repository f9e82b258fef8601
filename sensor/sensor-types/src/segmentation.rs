//! Segmentation source types.
//!
//! A segmentation source emits [`SegmentationFrame`]s at its own cadence.
//! Each frame carries one [`SegmentationMask`] per object visible in the
//! underlying video frame.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ImageEncoding, SensorError, Timestamp};

/// Stable identifier of a tracked object.
///
/// Identifiers compare and order by their string form, which keeps output
/// listings deterministic across runs.
///
/// # Example
///
/// ```
/// use sensor_types::ObjectId;
///
/// let a = ObjectId::from("obj1");
/// let b = ObjectId::new("obj1");
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "obj1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ObjectId(String);

impl ObjectId {
    /// Creates an identifier from any string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Creates a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self::from(Uuid::new_v4())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<Uuid> for ObjectId {
    fn from(id: Uuid) -> Self {
        Self(id.hyphenated().to_string())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw 2D mask image as produced by the segmentation source.
///
/// The buffer is row-major with tightly packed rows. Multi-byte encodings
/// are little-endian.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MaskBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel encoding.
    pub encoding: ImageEncoding,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl MaskBuffer {
    /// Creates a mask buffer, checking the buffer length.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::BufferSizeMismatch`] if `data` does not match
    /// the size implied by `encoding`.
    pub fn new(
        width: u32,
        height: u32,
        encoding: ImageEncoding,
        data: Vec<u8>,
    ) -> Result<Self, SensorError> {
        let mask = Self {
            width,
            height,
            encoding,
            data,
        };
        mask.validate()?;
        Ok(mask)
    }

    /// Creates an 8-bit mask from per-pixel values.
    #[must_use]
    pub fn gray8(width: u32, height: u32, values: Vec<u8>) -> Self {
        Self {
            width,
            height,
            encoding: ImageEncoding::Gray8,
            data: values,
        }
    }

    /// Creates a float mask from per-pixel confidences.
    #[must_use]
    pub fn gray_f32(width: u32, height: u32, values: &[f32]) -> Self {
        Self {
            width,
            height,
            encoding: ImageEncoding::GrayF32,
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    /// Creates a mask with every pixel fully set.
    #[must_use]
    pub fn full(width: u32, height: u32) -> Self {
        Self::gray8(width, height, vec![u8::MAX; width as usize * height as usize])
    }

    /// Returns the number of pixels.
    #[must_use]
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Checks that the buffer matches the declared dimensions and encoding.
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::BufferSizeMismatch`] on mismatch.
    pub fn validate(&self) -> Result<(), SensorError> {
        let expected = self.encoding.buffer_size(self.width, self.height);
        if self.data.len() == expected {
            Ok(())
        } else {
            Err(SensorError::buffer_mismatch(expected, self.data.len()))
        }
    }
}

/// One object's spatial extent within one video frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentationMask {
    /// Object identifier.
    pub id: ObjectId,
    /// Optional semantic label supplied by the segmentation source.
    pub label: Option<String>,
    /// Per-pixel membership confidence.
    pub mask: MaskBuffer,
    /// Overall detection confidence in `[0, 1]`.
    pub confidence: f32,
}

impl SegmentationMask {
    /// Creates an unlabeled mask with full detection confidence.
    #[must_use]
    pub fn new(id: impl Into<ObjectId>, mask: MaskBuffer) -> Self {
        Self {
            id: id.into(),
            label: None,
            mask,
            confidence: 1.0,
        }
    }

    /// Sets the semantic label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the detection confidence.
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }
}

/// All masks produced for one video frame.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentationFrame {
    /// Capture time of the underlying video frame.
    pub timestamp: Timestamp,
    /// Per-object masks.
    pub masks: Vec<SegmentationMask>,
}

impl SegmentationFrame {
    /// Creates a frame from its masks.
    #[must_use]
    pub const fn new(timestamp: Timestamp, masks: Vec<SegmentationMask>) -> Self {
        Self { timestamp, masks }
    }

    /// Returns true if the frame carries no masks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }
}
