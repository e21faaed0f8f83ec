//! provmap - province map identification and caching engine
//!
//! This library provides functionality to:
//! - Parse `;`-separated province legend (definition) files
//! - Resolve raster coordinates to province records through a sparse,
//!   self-densifying spatial index
//! - Derive naval-base overlay markers from buildings and state history
//!   files, with mod-over-base override composition
//! - Persist the legend table across runs behind an mtime-fingerprinted
//!   cache

pub mod buildings;
pub mod cache;
pub mod cli;
pub mod index;
pub mod legend;
pub mod locator;
pub mod models;
pub mod raster;
pub mod session;
pub mod source;
pub mod states;

pub use index::{CancelToken, IndexBuilder, SpatialIndex};
pub use legend::LegendTable;
pub use locator::ProvinceLocator;
pub use models::{NavalBaseMarker, Province, ProvinceKind, Rgb};
pub use raster::PixelBuffer;
pub use session::{MapSession, SessionConfig, SessionError};
pub use source::{ContentSource, SourcePair};
