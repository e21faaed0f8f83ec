//! Per-content-source map session orchestration
//!
//! A [`MapSession`] owns everything derived from one active content
//! source: the legend table, the decoded raster, the sparse spatial
//! index, and the naval-base overlay. Loading is long-running (raster
//! decode plus a stride scan of potentially millions of pixels) and is
//! meant to run off the interactive thread; [`spawn_load`] is the
//! background hand-off point. Queries afterwards are cheap and safe to
//! run from the interactive side — the index mutex covers the
//! write-through densification they perform.
//!
//! Only two conditions abort initialization: a source file that cannot
//! be found in either content source, and a raster that cannot be
//! decoded. Everything else degrades to warnings on the loaded session.

use crate::buildings::{parse_buildings, BuildingTable};
use crate::cache;
use crate::index::{BuildCancelled, CancelToken, IndexBuilder, SpatialIndex};
use crate::legend::{parse_legend, LegendTable};
use crate::locator::{ProvinceLocator, DEFAULT_SEARCH_RADIUS};
use crate::models::{NavalBaseMarker, Province, StateHistory, Warning};
use crate::raster::PixelBuffer;
use crate::source::{SourcePair, BUILDINGS_FILE, PROVINCES_RASTER, PROVINCE_LEGEND};
use crate::states::{load_states, naval_base_markers};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use thiserror::Error;

/// Fatal session-initialization failures, distinguishable so a UI can
/// report which source file is the problem.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("province raster '{PROVINCES_RASTER}' not found in any content source")]
    MissingRaster,
    #[error("province legend '{PROVINCE_LEGEND}' not found in any content source")]
    MissingLegend,
    #[error("cannot decode province raster '{path}': {source}")]
    UnreadableRaster {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Cancelled(#[from] BuildCancelled),
}

/// Everything a session load needs to know.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub sources: SourcePair,
    /// Root directory for per-source cache directories; `None` disables
    /// caching entirely.
    pub cache_root: Option<PathBuf>,
    pub stride: u32,
    pub tolerance: u8,
    pub search_radius: u32,
}

impl SessionConfig {
    pub fn new(sources: SourcePair) -> Self {
        Self {
            sources,
            cache_root: None,
            stride: IndexBuilder::DEFAULT_STRIDE,
            tolerance: 0,
            search_radius: DEFAULT_SEARCH_RADIUS,
        }
    }

    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    pub fn with_stride(mut self, stride: u32) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_search_radius(mut self, radius: u32) -> Self {
        self.search_radius = radius;
        self
    }
}

/// A fully loaded map session for one content source.
#[derive(Debug)]
pub struct MapSession {
    legend: LegendTable,
    raster: PixelBuffer,
    index: Mutex<SpatialIndex>,
    buildings: BuildingTable,
    states: BTreeMap<i32, StateHistory>,
    markers: Vec<NavalBaseMarker>,
    warnings: Vec<Warning>,
    loaded_from_cache: bool,
    search_radius: u32,
}

impl MapSession {
    /// Run the full load sequence. Blocking; call from a worker thread
    /// or through [`spawn_load`].
    pub fn load(config: SessionConfig, cancel: &CancelToken) -> Result<Self, SessionError> {
        let sources = &config.sources;
        let raster_path = sources
            .resolve(PROVINCES_RASTER)
            .ok_or(SessionError::MissingRaster)?;
        let legend_path = sources
            .resolve(PROVINCE_LEGEND)
            .ok_or(SessionError::MissingLegend)?;

        let mut warnings = Vec::new();
        let cache_dir = config
            .cache_root
            .as_ref()
            .map(|root| root.join(sources.primary.cache_dir_name()));

        let (mut legend, loaded_from_cache) = load_legend(
            &legend_path,
            &raster_path,
            cache_dir.as_deref(),
            &mut warnings,
        )?;
        if legend.is_empty() {
            warnings.push(Warning::new(format!(
                "no provinces parsed from '{}'",
                legend_path.display()
            )));
        }

        let raster = PixelBuffer::from_path(&raster_path).map_err(|source| {
            SessionError::UnreadableRaster { path: raster_path.clone(), source }
        })?;

        let index = IndexBuilder::new()
            .with_stride(config.stride)
            .with_tolerance(config.tolerance)
            .build(&raster, &legend, cancel)?;

        let buildings = load_buildings(sources, &mut warnings);

        let states_result = load_states(
            &sources.primary_states_dir(),
            sources.base_states_dir().as_deref(),
        );
        warnings.extend(states_result.warnings);
        for state in states_result.states.values() {
            for &province_id in &state.provinces {
                legend.assign_state(province_id, state.id);
            }
        }

        let markers = naval_base_markers(&states_result.states, &buildings, &mut warnings);

        Ok(Self {
            legend,
            raster,
            index: Mutex::new(index),
            buildings,
            states: states_result.states,
            markers,
            warnings,
            loaded_from_cache,
            search_radius: config.search_radius,
        })
    }

    /// Run [`load`](Self::load) on a background thread. The returned
    /// handle is the single synchronization point: join it from wherever
    /// results should be displayed.
    pub fn spawn_load(
        config: SessionConfig,
        cancel: CancelToken,
    ) -> thread::JoinHandle<Result<MapSession, SessionError>> {
        thread::spawn(move || MapSession::load(config, &cancel))
    }

    /// Resolve a raster-space coordinate to its province.
    pub fn locate(&self, x: u32, y: u32) -> Option<&Province> {
        ProvinceLocator::new(&self.legend, &self.raster, &self.index)
            .with_radius(self.search_radius)
            .locate(x, y)
    }

    /// Resolve strictly by pixel color, without touching the index.
    pub fn province_at_exact(&self, x: u32, y: u32) -> Option<&Province> {
        ProvinceLocator::new(&self.legend, &self.raster, &self.index).locate_exact(x, y)
    }

    pub fn legend(&self) -> &LegendTable {
        &self.legend
    }

    pub fn raster(&self) -> &PixelBuffer {
        &self.raster
    }

    pub fn buildings(&self) -> &BuildingTable {
        &self.buildings
    }

    pub fn states(&self) -> &BTreeMap<i32, StateHistory> {
        &self.states
    }

    pub fn markers(&self) -> &[NavalBaseMarker] {
        &self.markers
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn loaded_from_cache(&self) -> bool {
        self.loaded_from_cache
    }

    /// Number of entries currently in the sparse index (sampling plus
    /// densification so far).
    pub fn indexed_points(&self) -> usize {
        self.index
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Legend via cache when valid, else a fresh parse plus a best-effort
/// cache write. Returns the table and whether the cache supplied it.
fn load_legend(
    legend_path: &std::path::Path,
    raster_path: &std::path::Path,
    cache_dir: Option<&std::path::Path>,
    warnings: &mut Vec<Warning>,
) -> Result<(LegendTable, bool), SessionError> {
    if let Some(dir) = cache_dir {
        if cache::is_valid(dir, raster_path, legend_path) {
            if let Some(table) = cache::load(dir) {
                return Ok((table, true));
            }
            // Valid metadata but unreadable payload: rebuild
            warnings.push(Warning::new(format!(
                "cache payload in '{}' unreadable, rebuilding",
                dir.display()
            )));
        }
    }

    let file = File::open(legend_path).map_err(|source| SessionError::Io {
        path: legend_path.to_path_buf(),
        source,
    })?;
    let parsed = parse_legend(BufReader::new(file));
    warnings.extend(parsed.warnings);

    if let Some(dir) = cache_dir {
        if let Err(e) = cache::create(dir, raster_path, legend_path, &parsed.table) {
            warnings.push(Warning::new(format!(
                "cannot write cache '{}': {}",
                dir.display(),
                e
            )));
        }
    }

    Ok((parsed.table, false))
}

fn load_buildings(sources: &SourcePair, warnings: &mut Vec<Warning>) -> BuildingTable {
    let Some(path) = sources.resolve(BUILDINGS_FILE) else {
        warnings.push(Warning::new(format!(
            "buildings file '{}' not found, overlay disabled",
            BUILDINGS_FILE
        )));
        return BuildingTable::default();
    };
    match File::open(&path) {
        Ok(file) => {
            let parsed = parse_buildings(BufReader::new(file));
            warnings.extend(parsed.warnings);
            parsed.table
        }
        Err(e) => {
            warnings.push(Warning::new(format!(
                "cannot read '{}': {}",
                path.display(),
                e
            )));
            BuildingTable::default()
        }
    }
}
