//! Bounds-checked random access over a decoded province raster
//!
//! The raster is scanned over millions of pixels during index builds, so
//! the decoded image is copied once into an owned contiguous RGB buffer
//! and all reads are plain row-stride arithmetic. The buffer is read-only
//! for its whole lifetime.

use crate::models::Rgb;
use image::RgbImage;
use std::path::Path;

const CHANNELS: usize = 3;

/// An owned, immutable RGB pixel buffer.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    /// Bytes per row.
    stride: usize,
}

impl PixelBuffer {
    /// Decode a raster file into a pixel buffer. Any format the `image`
    /// crate understands works; pixels are converted to RGB8.
    pub fn from_path(path: &Path) -> Result<Self, image::ImageError> {
        let decoded = image::open(path)?.into_rgb8();
        Ok(Self::from_image(decoded))
    }

    /// Take ownership of an already decoded image.
    pub fn from_image(image: RgbImage) -> Self {
        let width = image.width();
        let height = image.height();
        Self {
            data: image.into_raw(),
            width,
            height,
            stride: width as usize * CHANNELS,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Read the pixel color at `(x, y)`.
    ///
    /// Out-of-range coordinates return `None`, the defined sentinel for
    /// "outside the raster" — never a panic or an error. `None` is used
    /// instead of a reserved color because every RGB triple (black
    /// included) is a legal province color.
    pub fn get(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = y as usize * self.stride + x as usize * CHANNELS;
        Some(Rgb([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ]))
    }

    /// One full scan line as raw RGB bytes, for sequential scans that
    /// should not pay the per-pixel bounds check.
    ///
    /// # Panics
    /// Panics if `y` is out of range; scan loops are expected to iterate
    /// `0..height()`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.stride]
    }

    /// Decode one pixel out of a scan line returned by [`row`](Self::row).
    pub fn pixel_in_row(row: &[u8], x: u32) -> Rgb {
        let offset = x as usize * CHANNELS;
        Rgb([row[offset], row[offset + 1], row[offset + 2]])
    }
}
