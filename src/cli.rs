//! Command-line interface implementation
//!
//! A small inspection surface over the library: parse and summarize a
//! content source, resolve a coordinate to a province, and manage the
//! legend cache. The GUI shell that normally drives a session lives
//! elsewhere; this is the development surface.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::cache;
use crate::index::CancelToken;
use crate::models::Warning;
use crate::session::{MapSession, SessionConfig};
use crate::source::{source_from_root, SourcePair, PROVINCES_RASTER, PROVINCE_LEGEND};

const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// provmap - province map identification and caching engine
#[derive(Parser)]
#[command(name = "provmap")]
#[command(about = "Inspect province maps, legends and naval-base overlays for mod content")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Treat warnings as errors
    #[arg(long, global = true)]
    pub strict: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a content source and print a summary
    Info {
        /// Root directory of the mod (or base game)
        root: PathBuf,

        /// Base-game root the mod overrides
        #[arg(long)]
        base: Option<PathBuf>,
    },

    /// Resolve a raster coordinate to its province
    Locate {
        /// Root directory of the mod (or base game)
        root: PathBuf,

        /// Base-game root the mod overrides
        #[arg(long)]
        base: Option<PathBuf>,

        #[arg(short, long)]
        x: u32,

        #[arg(short, long)]
        y: u32,

        /// Sampling stride for the spatial index build
        #[arg(long, default_value = "10")]
        stride: u32,

        /// Per-channel color tolerance for legend lookups
        #[arg(long, default_value = "0")]
        tolerance: u8,

        /// Nearest-neighbor search radius in pixels
        #[arg(long, default_value = "15")]
        radius: u32,
    },

    /// Build, check or remove the legend cache for a content source
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Parse the legend and write a fresh cache
    Build {
        root: PathBuf,
        #[arg(long)]
        cache_dir: PathBuf,
    },
    /// Report whether the cache is valid against the current sources
    Status {
        root: PathBuf,
        #[arg(long)]
        cache_dir: PathBuf,
    },
    /// Remove the cache directory
    Clear {
        root: PathBuf,
        #[arg(long)]
        cache_dir: PathBuf,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { root, base } => run_info(&root, base.as_deref(), cli.strict),
        Commands::Locate { root, base, x, y, stride, tolerance, radius } => {
            run_locate(&root, base.as_deref(), x, y, stride, tolerance, radius, cli.strict)
        }
        Commands::Cache { action } => run_cache(action, cli.strict),
    }
}

fn sources(root: &Path, base: Option<&Path>) -> SourcePair {
    match base {
        Some(base) => SourcePair::with_base(source_from_root(root), source_from_root(base)),
        None => SourcePair::standalone(source_from_root(root)),
    }
}

fn report_warnings(warnings: &[Warning], strict: bool) -> Option<ExitCode> {
    for warning in warnings {
        eprintln!("Warning: {}", warning);
    }
    (strict && !warnings.is_empty()).then(|| ExitCode::from(EXIT_ERROR))
}

fn load_session(config: SessionConfig, strict: bool) -> Result<MapSession, ExitCode> {
    let session = match MapSession::load(config, &CancelToken::new()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };
    if let Some(code) = report_warnings(session.warnings(), strict) {
        return Err(code);
    }
    Ok(session)
}

fn run_info(root: &Path, base: Option<&Path>, strict: bool) -> ExitCode {
    let config = SessionConfig::new(sources(root, base));
    let session = match load_session(config, strict) {
        Ok(s) => s,
        Err(code) => return code,
    };

    println!(
        "raster: {}x{} pixels",
        session.raster().width(),
        session.raster().height()
    );
    println!("provinces: {}", session.legend().len());
    let coastal = session.legend().iter().filter(|p| p.is_coastal()).count();
    let water = session.legend().iter().filter(|p| p.kind.is_water()).count();
    println!("  coastal: {}, water: {}", coastal, water);
    println!("indexed points: {}", session.indexed_points());
    println!("building positions: {}", session.buildings().len());
    println!("states: {}", session.states().len());
    println!("naval base markers: {}", session.markers().len());

    ExitCode::from(EXIT_SUCCESS)
}

#[allow(clippy::too_many_arguments)]
fn run_locate(
    root: &Path,
    base: Option<&Path>,
    x: u32,
    y: u32,
    stride: u32,
    tolerance: u8,
    radius: u32,
    strict: bool,
) -> ExitCode {
    if stride == 0 {
        eprintln!("Error: stride must be at least 1");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let config = SessionConfig::new(sources(root, base))
        .with_stride(stride)
        .with_tolerance(tolerance)
        .with_search_radius(radius);
    let session = match load_session(config, strict) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match session.locate(x, y) {
        Some(p) => {
            println!(
                "province {} at ({}, {}): kind={:?} coastal={} terrain={} continent={} state={}",
                p.id, x, y, p.kind, p.coastal, p.terrain, p.continent, p.state_id
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        None => {
            println!("no province at ({}, {})", x, y);
            ExitCode::from(EXIT_SUCCESS)
        }
    }
}

fn run_cache(action: CacheAction, strict: bool) -> ExitCode {
    match action {
        CacheAction::Build { root, cache_dir } => {
            let config = SessionConfig::new(sources(&root, None)).with_cache_root(&cache_dir);
            let session = match load_session(config, strict) {
                Ok(s) => s,
                Err(code) => return code,
            };
            println!(
                "cached {} provinces under '{}'",
                session.legend().len(),
                cache_dir.display()
            );
            ExitCode::from(EXIT_SUCCESS)
        }
        CacheAction::Status { root, cache_dir } => {
            let pair = sources(&root, None);
            let dir = cache_dir.join(pair.primary.cache_dir_name());
            let (Some(raster), Some(legend)) =
                (pair.resolve(PROVINCES_RASTER), pair.resolve(PROVINCE_LEGEND))
            else {
                eprintln!("Error: source files not found under '{}'", root.display());
                return ExitCode::from(EXIT_INVALID_ARGS);
            };

            if cache::is_valid(&dir, &raster, &legend) {
                match cache::read_metadata(&dir) {
                    Some(meta) => println!(
                        "valid: {} provinces, schema v{}, created at {}",
                        meta.entry_count, meta.version, meta.created_at
                    ),
                    None => println!("valid"),
                }
                ExitCode::from(EXIT_SUCCESS)
            } else {
                println!("stale or missing");
                ExitCode::from(EXIT_ERROR)
            }
        }
        CacheAction::Clear { root, cache_dir } => {
            let pair = sources(&root, None);
            let dir = cache_dir.join(pair.primary.cache_dir_name());
            match cache::clear(&dir) {
                Ok(()) => {
                    println!("cleared '{}'", dir.display());
                    ExitCode::from(EXIT_SUCCESS)
                }
                Err(e) => {
                    eprintln!("Error: cannot clear '{}': {}", dir.display(), e);
                    ExitCode::from(EXIT_ERROR)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_structure_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_locate_args() {
        let cli = Cli::parse_from([
            "provmap", "locate", "/tmp/mod", "-x", "100", "-y", "200", "--stride", "5",
        ]);
        match cli.command {
            Commands::Locate { x, y, stride, tolerance, radius, .. } => {
                assert_eq!((x, y), (100, 200));
                assert_eq!(stride, 5);
                assert_eq!(tolerance, 0);
                assert_eq!(radius, 15);
            }
            _ => panic!("expected locate"),
        }
    }

    #[test]
    fn test_strict_flag_is_global() {
        let cli = Cli::parse_from(["provmap", "info", "/tmp/mod", "--strict"]);
        assert!(cli.strict);
    }
}
