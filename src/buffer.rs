use alloc::vec::Vec;
use std::collections::BTreeSet;

use rgb::RGB8;

use crate::color::{Rgbf, pack};
use crate::error::QuantizeError;

/// A width×height grid of RGB pixels, row-major, no alpha.
///
/// Dimensions are fixed at construction. The quantizers never modify an input
/// buffer; they always build a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<RGB8>,
}

impl PixelBuffer {
    /// Wrap decoded pixels. `pixels.len()` must equal `width * height`.
    pub fn new(width: usize, height: usize, pixels: Vec<RGB8>) -> Result<Self, QuantizeError> {
        validate_dimensions(pixels.len(), width, height)?;
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// A buffer where every pixel is `color`.
    pub fn filled(width: usize, height: usize, color: RGB8) -> Result<Self, QuantizeError> {
        let len = width
            .checked_mul(height)
            .ok_or(QuantizeError::DimensionMismatch {
                len: 0,
                width,
                height,
            })?;
        Self::new(width, height, alloc::vec![color; len])
    }

    /// Build from tightly packed 8-bit RGB bytes, as produced by most decoders.
    pub fn from_rgb_bytes(width: usize, height: usize, bytes: &[u8]) -> Result<Self, QuantizeError> {
        if bytes.len() % 3 != 0 {
            return Err(QuantizeError::DimensionMismatch {
                len: bytes.len() / 3,
                width,
                height,
            });
        }
        let pixels = bytes
            .chunks_exact(3)
            .map(|c| RGB8::new(c[0], c[1], c[2]))
            .collect();
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[RGB8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<RGB8> {
        self.pixels
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Pixel at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<RGB8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Packed RGB bytes for handing to an encoder.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for p in &self.pixels {
            out.extend_from_slice(&[p.r, p.g, p.b]);
        }
        out
    }

    /// Number of distinct colors present.
    pub fn distinct_colors(&self) -> usize {
        self.pixels.iter().map(|&p| pack(p)).collect::<BTreeSet<_>>().len()
    }
}

pub(crate) fn validate_dimensions(
    len: usize,
    width: usize,
    height: usize,
) -> Result<(), QuantizeError> {
    if width == 0 || height == 0 {
        return Err(QuantizeError::ZeroDimension);
    }
    if width.checked_mul(height) != Some(len) {
        return Err(QuantizeError::DimensionMismatch { len, width, height });
    }
    Ok(())
}

/// Running per-channel sum and member count for one cluster.
///
/// Lets a centroid be computed without keeping the member pixels around.
/// Sums are f64 so large clusters accumulate without drift.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ColorSum {
    r: f64,
    g: f64,
    b: f64,
    count: u64,
}

impl ColorSum {
    /// Add `count` pixels of `color`.
    #[inline]
    pub fn add(&mut self, color: RGB8, count: u64) {
        let n = count as f64;
        self.r += color.r as f64 * n;
        self.g += color.g as f64 * n;
        self.b += color.b as f64 * n;
        self.count += count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Per-channel arithmetic mean, or `None` for an empty cluster.
    pub fn mean(&self) -> Option<Rgbf> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(Rgbf::new(
            (self.r / n) as f32,
            (self.g / n) as f32,
            (self.b / n) as f32,
        ))
    }
}
