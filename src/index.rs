//! Sparse coordinate-to-province index
//!
//! Built by sampling the raster on a fixed stride, then densified on
//! demand by locator queries. Entries are only ever added, never removed.
//! A full-resolution index of a multi-megapixel raster is too slow to
//! build eagerly; the stride keeps build latency bounded while the
//! write-through densification fills in the points users actually query.

use crate::legend::LegendTable;
use crate::models::Rgb;
use crate::raster::PixelBuffer;
use rayon::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Cooperative cancellation flag, shared between the interactive side and
/// a background build. Honored at scan-row granularity.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The build was cancelled before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("spatial index build cancelled")]
pub struct BuildCancelled;

/// Sparse `(x, y) -> province id` mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpatialIndex {
    entries: HashMap<(u32, u32), i32>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, x: u32, y: u32, province_id: i32) {
        self.entries.insert((x, y), province_id);
    }

    pub fn get(&self, x: u32, y: u32) -> Option<i32> {
        self.entries.get(&(x, y)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest indexed entry within `radius` pixels (Euclidean), or `None`.
    ///
    /// The first enumerated entry achieving the strict minimum distance
    /// wins; for equidistant entries the winner depends on map iteration
    /// order, which is unspecified. Callers get "a deterministic nearest
    /// point" only when the minimum is unique.
    pub fn nearest_within(&self, x: u32, y: u32, radius: u32) -> Option<i32> {
        let limit = u64::from(radius) * u64::from(radius);
        let mut best: Option<(u64, i32)> = None;
        for (&(ex, ey), &id) in &self.entries {
            let dx = i64::from(ex) - i64::from(x);
            let dy = i64::from(ey) - i64::from(y);
            let dist = (dx * dx + dy * dy) as u64;
            if dist > limit {
                continue;
            }
            match best {
                Some((current, _)) if dist >= current => {}
                _ => best = Some((dist, id)),
            }
        }
        best.map(|(_, id)| id)
    }
}

/// Builds a [`SpatialIndex`] by regular sampling of a raster.
#[derive(Debug, Clone, Copy)]
pub struct IndexBuilder {
    stride: u32,
    tolerance: u8,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self { stride: Self::DEFAULT_STRIDE, tolerance: 0 }
    }
}

impl IndexBuilder {
    /// Every 10th pixel on both axes: the latency/completeness trade the
    /// locator's fallback chain is designed around.
    pub const DEFAULT_STRIDE: u32 = 10;

    pub fn new() -> Self {
        Self::default()
    }

    /// Sampling stride in pixels, both axes. Clamped to at least 1.
    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Per-channel color tolerance for legend lookups during the scan.
    ///
    /// Non-zero tolerance turns every unmatched sample into a scan of the
    /// whole legend table, so it stays 0 unless the raster is known to
    /// carry off-palette colors (e.g. recompressed sources).
    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Scan `raster` and index every sampled pixel whose color resolves in
    /// `legend`. Unresolvable samples are left unindexed.
    ///
    /// Rows are processed in parallel; `cancel` is checked once per row.
    pub fn build(
        &self,
        raster: &PixelBuffer,
        legend: &LegendTable,
        cancel: &CancelToken,
    ) -> Result<SpatialIndex, BuildCancelled> {
        let stride = self.stride;
        let tolerance = self.tolerance;
        let sample_rows: Vec<u32> = (0..raster.height()).step_by(stride as usize).collect();

        let entries: Vec<((u32, u32), i32)> = sample_rows
            .par_iter()
            .flat_map_iter(|&y| {
                let mut row_entries = Vec::new();
                if !cancel.is_cancelled() {
                    let row = raster.row(y);
                    for x in (0..raster.width()).step_by(stride as usize) {
                        let color = PixelBuffer::pixel_in_row(row, x);
                        if let Some(p) = lookup(legend, color, tolerance) {
                            row_entries.push(((x, y), p));
                        }
                    }
                }
                row_entries
            })
            .collect();

        if cancel.is_cancelled() {
            return Err(BuildCancelled);
        }

        let mut index = SpatialIndex::new();
        for ((x, y), id) in entries {
            index.insert(x, y, id);
        }
        Ok(index)
    }
}

fn lookup(legend: &LegendTable, color: Rgb, tolerance: u8) -> Option<i32> {
    legend
        .get_by_color(color)
        .or_else(|| {
            if tolerance > 0 {
                legend.find_within_tolerance(color, tolerance)
            } else {
                None
            }
        })
        .map(|p| p.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::parse_legend;
    use image::RgbImage;
    use std::io::Cursor;

    fn two_province_legend() -> LegendTable {
        let input = "id;r;g;b;kind;coastal;terrain;continent\n\
                     1;255;0;0;land;1;hills;Europa\n\
                     2;0;0;255;sea;0;ocean;unknown";
        parse_legend(Cursor::new(input)).table
    }

    /// 40x40 raster: left half red (province 1), right half blue (province 2).
    fn split_raster() -> PixelBuffer {
        let image = RgbImage::from_fn(40, 40, |x, _| {
            if x < 20 {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([0, 0, 255])
            }
        });
        PixelBuffer::from_image(image)
    }

    #[test]
    fn test_build_samples_on_stride() {
        let index = IndexBuilder::new()
            .build(&split_raster(), &two_province_legend(), &CancelToken::new())
            .unwrap();
        // 4x4 sample grid at stride 10
        assert_eq!(index.len(), 16);
        assert_eq!(index.get(0, 0), Some(1));
        assert_eq!(index.get(10, 20), Some(1));
        assert_eq!(index.get(20, 0), Some(2));
        assert_eq!(index.get(30, 30), Some(2));
        // Off-grid points are not indexed
        assert_eq!(index.get(5, 5), None);
    }

    #[test]
    fn test_build_skips_unmatched_colors() {
        let image = RgbImage::from_pixel(20, 20, image::Rgb([7, 7, 7]));
        let raster = PixelBuffer::from_image(image);
        let index = IndexBuilder::new()
            .build(&raster, &two_province_legend(), &CancelToken::new())
            .unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_build_with_tolerance_matches_near_colors() {
        let image = RgbImage::from_pixel(20, 20, image::Rgb([250, 3, 2]));
        let raster = PixelBuffer::from_image(image);
        let legend = two_province_legend();

        let exact = IndexBuilder::new()
            .build(&raster, &legend, &CancelToken::new())
            .unwrap();
        assert!(exact.is_empty());

        let fuzzy = IndexBuilder::new()
            .with_tolerance(5)
            .build(&raster, &legend, &CancelToken::new())
            .unwrap();
        assert_eq!(fuzzy.get(0, 0), Some(1));
    }

    #[test]
    fn test_build_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = IndexBuilder::new().build(&split_raster(), &two_province_legend(), &cancel);
        assert_eq!(result, Err(BuildCancelled));
    }

    #[test]
    fn test_stride_one_indexes_every_pixel() {
        let image = RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]));
        let raster = PixelBuffer::from_image(image);
        let index = IndexBuilder::new()
            .with_stride(1)
            .build(&raster, &two_province_legend(), &CancelToken::new())
            .unwrap();
        assert_eq!(index.len(), 16);
    }

    #[test]
    fn test_nearest_within_radius() {
        let mut index = SpatialIndex::new();
        index.insert(10, 10, 1);
        index.insert(40, 40, 2);

        assert_eq!(index.nearest_within(12, 11, 15), Some(1));
        assert_eq!(index.nearest_within(38, 42, 15), Some(2));
        // Nothing within radius
        assert_eq!(index.nearest_within(25, 25, 5), None);
    }

    #[test]
    fn test_nearest_prefers_strict_minimum() {
        let mut index = SpatialIndex::new();
        index.insert(0, 0, 1);
        index.insert(4, 0, 2);
        // (3, 0): distance 3 to province 1, 1 to province 2
        assert_eq!(index.nearest_within(3, 0, 15), Some(2));
    }

    #[test]
    fn test_nearest_exact_point_is_distance_zero() {
        let mut index = SpatialIndex::new();
        index.insert(5, 5, 9);
        assert_eq!(index.nearest_within(5, 5, 1), Some(9));
    }
}
