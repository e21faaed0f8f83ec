//! Screen-point to province resolution
//!
//! Queries run against the sparse index first and fall back to raster
//! pixels only when needed. Stages, in order:
//!
//! 1. exact hit in the sparse index;
//! 2. nearest indexed entry within a bounded radius;
//! 3. direct pixel read plus exact legend lookup, densifying the index
//!    with the new entry for future queries;
//! 4. no match — the query answers "unknown", never an error.
//!
//! Coordinates are raster-pixel space; zoom conversion is the caller's
//! problem. The index lives behind a mutex so interactive queries can
//! densify it while other readers are active.

use crate::index::SpatialIndex;
use crate::legend::LegendTable;
use crate::models::Province;
use crate::raster::PixelBuffer;
use std::sync::{Mutex, PoisonError};

/// Default nearest-neighbor search radius, in raster pixels.
pub const DEFAULT_SEARCH_RADIUS: u32 = 15;

/// Resolves raster coordinates to province records.
pub struct ProvinceLocator<'a> {
    legend: &'a LegendTable,
    raster: &'a PixelBuffer,
    index: &'a Mutex<SpatialIndex>,
    radius: u32,
}

impl<'a> ProvinceLocator<'a> {
    pub fn new(
        legend: &'a LegendTable,
        raster: &'a PixelBuffer,
        index: &'a Mutex<SpatialIndex>,
    ) -> Self {
        Self { legend, raster, index, radius: DEFAULT_SEARCH_RADIUS }
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    /// Resolve `(x, y)` to the owning province, or `None` when no stage
    /// of the fallback chain finds one.
    pub fn locate(&self, x: u32, y: u32) -> Option<&'a Province> {
        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(id) = index.get(x, y) {
            return self.legend.get_by_id(id);
        }

        if let Some(id) = index.nearest_within(x, y, self.radius) {
            return self.legend.get_by_id(id);
        }

        // Direct pixel read; on success the index learns the point.
        let color = self.raster.get(x, y)?;
        let province = self.legend.get_by_color(color)?;
        index.insert(x, y, province.id);
        Some(province)
    }

    /// Resolve strictly by the pixel under `(x, y)`, bypassing the index
    /// and without densifying it.
    pub fn locate_exact(&self, x: u32, y: u32) -> Option<&'a Province> {
        let color = self.raster.get(x, y)?;
        self.legend.get_by_color(color)
    }
}
