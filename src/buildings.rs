//! Buildings file parsing
//!
//! Flat `;`-separated records, no header:
//! `stateId;buildingKind;x;y;z;rotation;adjacentSeaProvinceId`.
//! Lines starting with `//` or `#`, and blank lines, are ignored.
//! Malformed lines are skipped with a warning, mirroring the legend
//! parser's policy.

use crate::models::{BuildingPosition, Warning};
use std::io::BufRead;

/// The kind token for naval-base building slots.
pub const NAVAL_BASE_KIND: &str = "naval_base";

/// Result of a buildings-file parse.
#[derive(Debug, Clone, Default)]
pub struct BuildingsParseResult {
    pub table: BuildingTable,
    pub warnings: Vec<Warning>,
}

/// All building placements from one buildings file, file order preserved.
#[derive(Debug, Clone, Default)]
pub struct BuildingTable {
    positions: Vec<BuildingPosition>,
}

impl BuildingTable {
    pub fn positions(&self) -> &[BuildingPosition] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The naval-base slot for a state: first matching record in file
    /// order. At most one per state is meaningful; extras are ignored.
    pub fn naval_base_for(&self, state_id: i32) -> Option<&BuildingPosition> {
        self.positions
            .iter()
            .find(|p| p.state_id == state_id && p.kind == NAVAL_BASE_KIND)
    }

    /// All placements for a state, any kind.
    pub fn for_state<'a>(
        &'a self,
        state_id: i32,
    ) -> impl Iterator<Item = &'a BuildingPosition> {
        self.positions.iter().filter(move |p| p.state_id == state_id)
    }
}

/// Parse a buildings file.
pub fn parse_buildings<R: BufRead>(reader: R) -> BuildingsParseResult {
    let mut result = BuildingsParseResult::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_number = idx + 1;
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                result
                    .warnings
                    .push(Warning::at_line(format!("read error: {}", e), line_number));
                break;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('#') {
            continue;
        }

        match parse_record(trimmed) {
            Ok(position) => result.table.positions.push(position),
            Err(message) => result.warnings.push(Warning::at_line(message, line_number)),
        }
    }

    result
}

fn parse_record(line: &str) -> Result<BuildingPosition, String> {
    let fields: Vec<&str> = line.split(';').map(str::trim).collect();
    if fields.len() < 6 {
        return Err(format!("expected at least 6 fields, found {}", fields.len()));
    }

    let state_id: i32 = fields[0]
        .parse()
        .map_err(|_| format!("invalid state id '{}'", fields[0]))?;
    let kind = fields[1].to_string();
    if kind.is_empty() {
        return Err("empty building kind".to_string());
    }
    let coord = |i: usize| -> Result<f32, String> {
        fields[i]
            .parse()
            .map_err(|_| format!("invalid coordinate '{}'", fields[i]))
    };

    // The adjacent-sea field is optional and 0 means "none" in the source
    // format.
    let adjacent_sea_id = match fields.get(6) {
        Some(t) if !t.is_empty() => {
            let id: i32 = t
                .parse()
                .map_err(|_| format!("invalid adjacent sea id '{}'", t))?;
            (id != 0).then_some(id)
        }
        _ => None,
    };

    Ok(BuildingPosition {
        state_id,
        kind,
        x: coord(2)?,
        y: coord(3)?,
        z: coord(4)?,
        rotation: coord(5)?,
        adjacent_sea_id,
    })
}
