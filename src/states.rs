//! Region (state) history scanning and naval-base marker derivation
//!
//! State history files are loosely structured script; this module does
//! pattern extraction only, not a full grammar. Extracted per file:
//! `id = <int>`, `name = "<string>"`, `owner = <TAG>`,
//! `provinces = { <int> ... }`, and repeated
//! `<province-id> = { naval_base = <level> }` entries. Everything else
//! in a file is ignored.
//!
//! An active mod overrides the base game per state id: a file defining
//! state N in the primary source suppresses any base-game file for N.

use crate::buildings::BuildingTable;
use crate::models::{NavalBaseMarker, StateHistory, Warning};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

fn id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bid\s*=\s*(\d+)").unwrap())
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"\bname\s*=\s*"([^"]*)""#).unwrap())
}

fn owner_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bowner\s*=\s*([A-Za-z0-9]{3})").unwrap())
}

fn provinces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bprovinces\s*=\s*\{([^}]*)\}").unwrap())
}

fn naval_base_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+)\s*=\s*\{\s*naval_base\s*=\s*(\d+)\s*\}").unwrap())
}

/// Result of scanning one or two state directories.
#[derive(Debug, Clone, Default)]
pub struct StatesScanResult {
    /// States keyed by id; a primary-source file wins over a base file.
    pub states: BTreeMap<i32, StateHistory>,
    pub warnings: Vec<Warning>,
}

/// Extract a state history from file text. Returns `None` when no state
/// id can be recovered from either the body or the filename's leading
/// digits.
pub fn parse_state_file(text: &str, filename: &str) -> Option<StateHistory> {
    let id = id_re()
        .captures(text)
        .and_then(|c| c[1].parse().ok())
        .or_else(|| id_from_filename(filename))?;

    let name = name_re().captures(text).map(|c| c[1].to_string());
    let owner = owner_re().captures(text).map(|c| c[1].to_string());

    let provinces = provinces_re()
        .captures(text)
        .map(|c| {
            c[1].split_whitespace()
                .filter_map(|t| t.parse().ok())
                .collect()
        })
        .unwrap_or_default();

    let naval_bases = naval_base_re()
        .captures_iter(text)
        .filter_map(|c| Some((c[1].parse().ok()?, c[2].parse().ok()?)))
        .collect();

    Some(StateHistory { id, name, owner, provinces, naval_bases })
}

/// Leading digits of a filename like `123-Some State.txt`.
fn id_from_filename(filename: &str) -> Option<i32> {
    let digits: String = filename.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Scan a primary state directory and optionally a base-game one.
///
/// Missing or unreadable directories and files produce warnings, never
/// errors: a mod without a `history/states` directory has no overlay, but
/// the condition is still reported.
pub fn load_states(primary_dir: &Path, base_dir: Option<&Path>) -> StatesScanResult {
    let mut result = StatesScanResult::default();

    // Base first so primary entries replace them.
    if let Some(dir) = base_dir {
        scan_dir(dir, &mut result);
    }
    let mut primary = StatesScanResult::default();
    scan_dir(primary_dir, &mut primary);
    result.warnings.extend(primary.warnings);
    for (id, state) in primary.states {
        result.states.insert(id, state);
    }

    result
}

fn scan_dir(dir: &Path, result: &mut StatesScanResult) {
    if !dir.is_dir() {
        result.warnings.push(Warning::new(format!(
            "state directory '{}' not found, overlay has no states from it",
            dir.display()
        )));
        return;
    }

    let pattern = dir.join("*.txt");
    let paths = match glob::glob(&pattern.to_string_lossy()) {
        Ok(paths) => paths,
        Err(e) => {
            result
                .warnings
                .push(Warning::new(format!("bad state glob '{}': {}", pattern.display(), e)));
            return;
        }
    };

    for entry in paths {
        let path = match entry {
            Ok(p) => p,
            Err(e) => {
                result.warnings.push(Warning::new(format!("state scan: {}", e)));
                continue;
            }
        };
        let text = match fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) => {
                result
                    .warnings
                    .push(Warning::new(format!("cannot read '{}': {}", path.display(), e)));
                continue;
            }
        };
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match parse_state_file(&text, &filename) {
            Some(state) => {
                result.states.insert(state.id, state);
            }
            None => result
                .warnings
                .push(Warning::new(format!("no state id in '{}'", path.display()))),
        }
    }
}

/// Derive naval-base overlay markers from scanned states.
///
/// Only entries with level >= 1 become markers. The marker position is
/// the state's naval-base building slot, projected onto the map plane as
/// `(x, z)`. States with naval-base levels but no matching slot are
/// skipped with a warning — a marker at an undefined position helps
/// nobody.
pub fn naval_base_markers(
    states: &BTreeMap<i32, StateHistory>,
    buildings: &BuildingTable,
    warnings: &mut Vec<Warning>,
) -> Vec<NavalBaseMarker> {
    let mut markers = Vec::new();

    for state in states.values() {
        let active: Vec<_> = state
            .naval_bases
            .iter()
            .filter(|&&(_, level)| level >= 1)
            .collect();
        if active.is_empty() {
            continue;
        }

        let Some(slot) = buildings.naval_base_for(state.id) else {
            warnings.push(Warning::new(format!(
                "state {} has naval bases but no naval_base building position",
                state.id
            )));
            continue;
        };

        for &&(province_id, level) in &active {
            markers.push(NavalBaseMarker {
                province_id,
                state_id: state.id,
                level,
                x: slot.x,
                y: slot.z,
            });
        }
    }

    markers
}
