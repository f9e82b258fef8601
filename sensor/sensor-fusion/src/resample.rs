//! Mask decoding and resampling onto the depth grid.
//!
//! Segmentation masks rarely share the depth map's resolution. Before a
//! mask can gate depth pixels it is decoded to per-pixel confidence in
//! `[0, 1]` and resampled to the depth map's width and height.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use sensor_types::{ImageEncoding, MaskBuffer, SensorError};

use crate::error::{FusionError, Result};

/// Decodes a mask into per-pixel confidence values in `[0, 1]`.
///
/// `out` is cleared and refilled, so callers can reuse one buffer across
/// masks. Supported encodings:
///
/// - [`ImageEncoding::Gray8`]: `value / 255`
/// - [`ImageEncoding::Gray16`]: `value / 65535`
/// - [`ImageEncoding::GrayF32`]: value clamped to `[0, 1]`, `NaN` as `0`
///
/// # Errors
///
/// Returns [`FusionError::Sensor`] if the buffer size does not match the
/// declared dimensions or the encoding is not single-channel.
pub fn decode_mask(mask: &MaskBuffer, out: &mut Vec<f32>) -> Result<()> {
    if !mask.encoding.is_single_channel() {
        return Err(SensorError::unsupported(mask.encoding).into());
    }
    mask.validate()?;

    out.clear();
    out.reserve(mask.pixel_count());
    let row_bytes = mask.encoding.buffer_size(mask.width, 1);
    if row_bytes == 0 {
        return Ok(());
    }

    for row in mask.data.chunks_exact(row_bytes) {
        match mask.encoding {
            ImageEncoding::Gray8 => {
                out.extend(row.iter().map(|&v| f32::from(v) / f32::from(u8::MAX)));
            }
            ImageEncoding::Gray16 => out.extend(
                row.chunks_exact(2)
                    .map(|b| f32::from(u16::from_le_bytes([b[0], b[1]])) / f32::from(u16::MAX)),
            ),
            ImageEncoding::GrayF32 => out.extend(row.chunks_exact(4).map(|b| {
                let v = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
                if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
            })),
            other => return Err(SensorError::unsupported(other).into()),
        }
    }
    Ok(())
}

/// Resamples a mask to `width × height` confidence values.
///
/// When the mask already has the target resolution it is decoded row by row
/// with no filtering. Otherwise the decoded confidences are resized with a
/// triangle (bilinear) filter, which averages over the source footprint
/// when shrinking.
///
/// `out` is cleared and refilled with exactly `width * height` values.
///
/// # Errors
///
/// Returns an error if the mask cannot be decoded (see [`decode_mask`]) or
/// either the mask or the target grid is empty.
///
/// # Example
///
/// ```
/// use sensor_fusion::resample_mask;
/// use sensor_types::MaskBuffer;
///
/// let mask = MaskBuffer::full(8, 6);
/// let mut grid = Vec::new();
/// resample_mask(&mask, 4, 3, &mut grid).unwrap();
///
/// assert_eq!(grid.len(), 12);
/// assert!(grid.iter().all(|&v| (v - 1.0).abs() < 1e-5));
/// ```
pub fn resample_mask(mask: &MaskBuffer, width: u32, height: u32, out: &mut Vec<f32>) -> Result<()> {
    resample_into(mask, width, height, &mut Vec::new(), out)
}

/// Mask resampler that keeps its buffers between calls.
///
/// Decoding and resizing reuse the same allocations for every mask, so a
/// long capture session does not allocate per mask once the buffers have
/// grown to the largest mask seen.
///
/// # Example
///
/// ```
/// use sensor_fusion::MaskResampler;
/// use sensor_types::MaskBuffer;
///
/// let mut resampler = MaskResampler::new();
/// let grid = resampler.resample(&MaskBuffer::full(8, 6), 4, 3).unwrap();
/// assert_eq!(grid.len(), 12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MaskResampler {
    decoded: Vec<f32>,
    grid: Vec<f32>,
}

impl MaskResampler {
    /// Creates a resampler with empty buffers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            decoded: Vec::new(),
            grid: Vec::new(),
        }
    }

    /// Resamples a mask to `width × height` confidence values.
    ///
    /// The returned slice is valid until the next call.
    ///
    /// # Errors
    ///
    /// Same as [`resample_mask`].
    pub fn resample(&mut self, mask: &MaskBuffer, width: u32, height: u32) -> Result<&[f32]> {
        resample_into(mask, width, height, &mut self.decoded, &mut self.grid)?;
        Ok(&self.grid)
    }

    /// Returns the capacity of the decode buffer.
    #[must_use]
    pub fn decode_capacity(&self) -> usize {
        self.decoded.capacity()
    }
}

fn resample_into(
    mask: &MaskBuffer,
    width: u32,
    height: u32,
    decoded: &mut Vec<f32>,
    out: &mut Vec<f32>,
) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(FusionError::empty_image(width, height));
    }
    if mask.width == 0 || mask.height == 0 {
        return Err(FusionError::empty_image(mask.width, mask.height));
    }

    if mask.width == width && mask.height == height {
        return decode_mask(mask, out);
    }

    decode_mask(mask, decoded)?;
    let source: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_raw(mask.width, mask.height, std::mem::take(decoded))
            .ok_or_else(|| SensorError::buffer_mismatch(mask.pixel_count(), 0))?;

    let resized = imageops::resize(&source, width, height, FilterType::Triangle);
    *decoded = source.into_raw();
    out.clear();
    out.extend(resized.as_raw().iter().map(|v| v.clamp(0.0, 1.0)));
    Ok(())
}
