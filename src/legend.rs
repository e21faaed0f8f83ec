//! Legend (province definition) file parsing
//!
//! The legend is a `;`-separated table, one header line then one record
//! per line: `id;r;g;b;kind;coastal;terrain;continent`. Trailing fields
//! are optional. Malformed lines are skipped with a warning, never fatal;
//! the parser always returns whatever it accumulated.

use crate::models::{Province, ProvinceKind, Rgb, Warning, NO_STATE, UNKNOWN_FIELD};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::BufRead;

/// Result of a legend parse.
#[derive(Debug, Clone, Default)]
pub struct LegendParseResult {
    pub table: LegendTable,
    pub warnings: Vec<Warning>,
}

/// The in-memory legend: province records addressable by exact color and
/// by id.
///
/// Colors are unique within a table; registering a record whose color is
/// already present replaces the earlier record (last writer wins, matching
/// the source file semantics). Serializes as the plain record list; the
/// lookup maps are rebuilt on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Province>", into = "Vec<Province>")]
pub struct LegendTable {
    provinces: Vec<Province>,
    by_color: HashMap<Rgb, usize>,
    by_id: HashMap<i32, usize>,
}

impl LegendTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a province. A record with the same color replaces the
    /// existing one in place.
    pub fn insert(&mut self, province: Province) {
        match self.by_color.get(&province.color).copied() {
            Some(slot) => {
                let old = std::mem::replace(&mut self.provinces[slot], province);
                if self.by_id.get(&old.id) == Some(&slot) {
                    self.by_id.remove(&old.id);
                }
                self.by_id.insert(self.provinces[slot].id, slot);
            }
            None => {
                let slot = self.provinces.len();
                self.by_color.insert(province.color, slot);
                self.by_id.insert(province.id, slot);
                self.provinces.push(province);
            }
        }
    }

    pub fn get_by_color(&self, color: Rgb) -> Option<&Province> {
        self.by_color.get(&color).map(|&i| &self.provinces[i])
    }

    pub fn get_by_id(&self, id: i32) -> Option<&Province> {
        self.by_id.get(&id).map(|&i| &self.provinces[i])
    }

    /// Find the first record (file order) whose color is within `tolerance`
    /// on every channel. `tolerance` 0 is an exact-match lookup and uses
    /// the color map directly.
    pub fn find_within_tolerance(&self, color: Rgb, tolerance: u8) -> Option<&Province> {
        if tolerance == 0 {
            return self.get_by_color(color);
        }
        self.provinces
            .iter()
            .find(|p| p.color.channel_distance(color) <= tolerance)
    }

    /// Records in file order.
    pub fn iter(&self) -> impl Iterator<Item = &Province> {
        self.provinces.iter()
    }

    pub fn len(&self) -> usize {
        self.provinces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.provinces.is_empty()
    }

    /// Assign an owning state to a province, if the table knows the id.
    pub(crate) fn assign_state(&mut self, province_id: i32, state_id: i32) {
        if let Some(&slot) = self.by_id.get(&province_id) {
            self.provinces[slot].state_id = state_id;
        }
    }
}

impl From<Vec<Province>> for LegendTable {
    fn from(records: Vec<Province>) -> Self {
        let mut table = LegendTable::new();
        for province in records {
            table.insert(province);
        }
        table
    }
}

impl From<LegendTable> for Vec<Province> {
    fn from(table: LegendTable) -> Self {
        table.provinces
    }
}

impl PartialEq for LegendTable {
    fn eq(&self, other: &Self) -> bool {
        self.provinces == other.provinces
    }
}

/// Parse a legend file. The first line is the column header and is always
/// skipped. Lines that fail to parse produce a warning and are skipped.
///
/// A zero-record result is not an error here; callers decide how to
/// report the "no provinces" state.
pub fn parse_legend<R: BufRead>(reader: R) -> LegendParseResult {
    let mut result = LegendParseResult::default();

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

        // Header line
        if line_number == 1 {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        match parse_record(&line) {
            Ok(province) => result.table.insert(province),
            Err(message) => result.warnings.push(Warning::at_line(message, line_number)),
        }
    }

    result
}

/// Parse one record line. Errors are messages, not types: they only ever
/// become warnings.
fn parse_record(line: &str) -> Result<Province, String> {
    let fields: Vec<&str> = line.split(';').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(format!("expected at least 4 fields, found {}", fields.len()));
    }

    let id: i32 = fields[0]
        .parse()
        .map_err(|_| format!("invalid province id '{}'", fields[0]))?;
    let channel = |i: usize| -> Result<u8, String> {
        fields[i]
            .parse()
            .map_err(|_| format!("invalid color channel '{}'", fields[i]))
    };
    let color = Rgb::new(channel(1)?, channel(2)?, channel(3)?);

    let kind = fields
        .get(4)
        .map(|t| ProvinceKind::from_token(t))
        .unwrap_or_default();
    let coastal = fields.get(5).is_some_and(|t| *t == "1");
    let text_field = |i: usize| -> String {
        match fields.get(i) {
            Some(t) if !t.is_empty() => (*t).to_string(),
            _ => UNKNOWN_FIELD.to_string(),
        }
    };

    Ok(Province {
        id,
        color,
        kind,
        coastal,
        terrain: text_field(6),
        continent: text_field(7),
        state_id: NO_STATE,
        adjacent: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "id;r;g;b;kind;coastal;terrain;continent";

    fn parse(body: &str) -> LegendParseResult {
        parse_legend(Cursor::new(format!("{}\n{}", HEADER, body)))
    }

    #[test]
    fn test_parse_single_record() {
        let result = parse("1;255;0;0;land;1;hills;Europa");
        assert!(result.warnings.is_empty());
        assert_eq!(result.table.len(), 1);

        let p = result.table.get_by_color(Rgb::new(255, 0, 0)).unwrap();
        assert_eq!(p.id, 1);
        assert_eq!(p.kind, ProvinceKind::Land);
        assert!(p.is_coastal());
        assert_eq!(p.terrain, "hills");
        assert_eq!(p.continent, "Europa");
        assert!(p.adjacent.is_empty());
    }

    #[test]
    fn test_parse_determinism() {
        let body = "1;255;0;0;land;1;hills;Europa\n2;0;0;255;sea;0;ocean;";
        let a = parse(body);
        let b = parse(body);
        let ja = serde_json::to_string(&a.table).unwrap();
        let jb = serde_json::to_string(&b.table).unwrap();
        assert_eq!(ja, jb);
    }

    #[test]
    fn test_trailing_fields_default() {
        let result = parse("5;10;20;30");
        let p = result.table.get_by_id(5).unwrap();
        assert_eq!(p.kind, ProvinceKind::Unknown);
        assert!(!p.coastal);
        assert_eq!(p.terrain, UNKNOWN_FIELD);
        assert_eq!(p.continent, UNKNOWN_FIELD);
    }

    #[test]
    fn test_coastal_flag_strictness() {
        let result = parse("1;1;1;1;land;1\n2;2;2;2;land;true\n3;3;3;3;land;0");
        assert!(result.table.get_by_id(1).unwrap().coastal);
        assert!(!result.table.get_by_id(2).unwrap().coastal, "only \"1\" means coastal");
        assert!(!result.table.get_by_id(3).unwrap().coastal);
    }

    #[test]
    fn test_malformed_line_skipped_not_fatal() {
        // Line 3 of 5 records is truncated
        let body = "1;255;0;0;land;1;hills;Europa\n\
                    2;0;255;0;land;0;plains;Europa\n\
                    3;0;0\n\
                    4;0;0;255;sea;0;ocean;unknown\n\
                    5;10;10;10;lake;0;lake;unknown";
        let result = parse(body);
        assert_eq!(result.table.len(), 4);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].line, 4); // header occupies line 1
    }

    #[test]
    fn test_non_numeric_fields_skipped() {
        let result = parse("abc;1;2;3;land\n1;300;0;0;land\n2;1;2;3;land");
        // "abc" id and out-of-range channel both rejected
        assert_eq!(result.table.len(), 1);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].message.contains("abc"));
        assert!(result.warnings[1].message.contains("300"));
    }

    #[test]
    fn test_duplicate_color_last_wins() {
        let result = parse("1;9;9;9;land;0;a;b\n2;9;9;9;sea;1;c;d");
        assert_eq!(result.table.len(), 1);
        let p = result.table.get_by_color(Rgb::new(9, 9, 9)).unwrap();
        assert_eq!(p.id, 2);
        assert_eq!(p.kind, ProvinceKind::Sea);
        assert!(result.table.get_by_id(1).is_none());
    }

    #[test]
    fn test_empty_file_yields_empty_table() {
        let result = parse_legend(Cursor::new(HEADER));
        assert!(result.table.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_tolerance_zero_is_exact() {
        let result = parse("1;100;100;100;land\n2;104;100;100;land");
        let table = &result.table;
        assert!(table.find_within_tolerance(Rgb::new(101, 100, 100), 0).is_none());
        assert_eq!(table.find_within_tolerance(Rgb::new(100, 100, 100), 0).unwrap().id, 1);
    }

    #[test]
    fn test_tolerance_first_match_in_file_order() {
        let result = parse("1;100;100;100;land\n2;102;100;100;land");
        let p = result.table.find_within_tolerance(Rgb::new(101, 100, 100), 2).unwrap();
        assert_eq!(p.id, 1);
    }

    #[test]
    fn test_table_serde_roundtrip() {
        let result = parse("1;255;0;0;land;1;hills;Europa\n2;0;0;255;sea;0;ocean;unknown");
        let json = serde_json::to_string(&result.table).unwrap();
        let restored: LegendTable = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, result.table);
        assert_eq!(restored.get_by_color(Rgb::new(0, 0, 255)).unwrap().id, 2);
    }
}
