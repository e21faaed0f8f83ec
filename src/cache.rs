//! On-disk legend cache
//!
//! Each content source gets a cache directory holding a metadata file
//! (`cache.json`: schema version, source fingerprints, creation time,
//! entry count) and a payload file (`legend.json`: the serialized legend
//! table). Fingerprints are modification time plus byte length — cheap to
//! compute and good enough to detect edits, without re-reading a
//! multi-megabyte raster on every launch.
//!
//! Writes are atomic per file (temp file + rename) and ordered payload
//! first, metadata last, so a torn `create` never leaves a directory that
//! `is_valid` accepts. Any read failure degrades to a cache miss; the
//! caller's fallback is always a full rebuild.

use crate::legend::LegendTable;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Bumped whenever the payload or metadata layout changes.
pub const SCHEMA_VERSION: u32 = 1;

pub const METADATA_FILENAME: &str = "cache.json";
pub const PAYLOAD_FILENAME: &str = "legend.json";

/// Error during cache creation. Reads never error — they miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] io::Error),
    #[error("cache serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cheap change-detection proxy for one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub mtime_secs: u64,
    pub len: u64,
}

impl Fingerprint {
    pub fn of(path: &Path) -> io::Result<Self> {
        let meta = fs::metadata(path)?;
        let mtime_secs = meta
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Ok(Self { mtime_secs, len: meta.len() })
    }
}

/// Metadata written alongside the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub version: u32,
    /// Unix seconds at creation time.
    pub created_at: u64,
    pub raster: Fingerprint,
    pub legend: Fingerprint,
    pub entry_count: usize,
}

/// True only when the cache directory holds a readable, current-schema
/// metadata file whose fingerprints match the source files on disk and
/// whose payload file exists.
pub fn is_valid(cache_dir: &Path, raster_path: &Path, legend_path: &Path) -> bool {
    let Some(metadata) = read_metadata(cache_dir) else {
        return false;
    };
    if metadata.version != SCHEMA_VERSION {
        return false;
    }
    if !cache_dir.join(PAYLOAD_FILENAME).exists() {
        return false;
    }
    let (Ok(raster), Ok(legend)) = (Fingerprint::of(raster_path), Fingerprint::of(legend_path))
    else {
        return false;
    };
    metadata.raster == raster && metadata.legend == legend
}

/// Serialize `table` plus metadata into `cache_dir`, creating it if
/// needed. Payload lands before metadata; each file is written to a
/// sibling temp file and renamed into place.
pub fn create(
    cache_dir: &Path,
    raster_path: &Path,
    legend_path: &Path,
    table: &LegendTable,
) -> Result<(), CacheError> {
    fs::create_dir_all(cache_dir)?;

    write_atomic(&cache_dir.join(PAYLOAD_FILENAME), table)?;

    let metadata = CacheMetadata {
        version: SCHEMA_VERSION,
        created_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0),
        raster: Fingerprint::of(raster_path)?,
        legend: Fingerprint::of(legend_path)?,
        entry_count: table.len(),
    };
    write_atomic(&cache_dir.join(METADATA_FILENAME), &metadata)?;

    Ok(())
}

/// Deserialize the cached legend table, or `None` on any failure.
pub fn load(cache_dir: &Path) -> Option<LegendTable> {
    let file = File::open(cache_dir.join(PAYLOAD_FILENAME)).ok()?;
    serde_json::from_reader(BufReader::new(file)).ok()
}

/// Read the metadata file, if present and readable.
pub fn read_metadata(cache_dir: &Path) -> Option<CacheMetadata> {
    let file = File::open(cache_dir.join(METADATA_FILENAME)).ok()?;
    serde_json::from_reader(BufReader::new(file)).ok()
}

/// Remove the cache directory and everything in it. Missing directory is
/// not an error.
pub fn clear(cache_dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(cache_dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), CacheError> {
    let tmp = path.with_extension("tmp");
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, value)?;
        // Flush before rename so the rename publishes complete content
        use std::io::Write;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
