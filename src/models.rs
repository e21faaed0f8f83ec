//! Data models for map records (provinces, buildings, states)

use serde::{Deserialize, Serialize};

/// An exact 8-bit-per-channel RGB color, the join key between raster
/// pixels and province records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn r(&self) -> u8 {
        self.0[0]
    }

    pub fn g(&self) -> u8 {
        self.0[1]
    }

    pub fn b(&self) -> u8 {
        self.0[2]
    }

    /// Largest per-channel absolute difference to another color.
    pub fn channel_distance(&self, other: Rgb) -> u8 {
        self.0[0]
            .abs_diff(other.0[0])
            .max(self.0[1].abs_diff(other.0[1]))
            .max(self.0[2].abs_diff(other.0[2]))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

/// Province kind from the legend's free-text token.
///
/// Tokens are matched case-insensitively; anything unrecognized maps to
/// `Unknown` rather than failing the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProvinceKind {
    Land,
    Sea,
    Lake,
    #[default]
    Unknown,
}

impl ProvinceKind {
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "land" => ProvinceKind::Land,
            "sea" => ProvinceKind::Sea,
            "lake" => ProvinceKind::Lake,
            _ => ProvinceKind::Unknown,
        }
    }

    pub fn is_water(&self) -> bool {
        matches!(self, ProvinceKind::Sea | ProvinceKind::Lake)
    }
}

/// Sentinel value for "no owning state assigned".
pub const NO_STATE: i32 = -1;

/// Default string for absent terrain/continent fields.
pub const UNKNOWN_FIELD: &str = "unknown";

/// A single province record from the legend file.
///
/// Created once per legend parse and immutable afterwards. `color` is
/// unique within a table (last writer wins on duplicates).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Province {
    pub id: i32,
    pub color: Rgb,
    pub kind: ProvinceKind,
    pub coastal: bool,
    pub terrain: String,
    pub continent: String,
    /// Owning state id, or [`NO_STATE`] until a state history claims it.
    #[serde(default = "default_state_id")]
    pub state_id: i32,
    /// Adjacent province ids. The legend format carries no adjacency
    /// data, so this is always empty after parsing; it exists to keep
    /// the serialized record shape stable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adjacent: Vec<i32>,
}

fn default_state_id() -> i32 {
    NO_STATE
}

impl Province {
    pub fn is_coastal(&self) -> bool {
        self.coastal
    }
}

/// One building placement from the buildings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingPosition {
    pub state_id: i32,
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
    /// Province id of the adjacent sea tile, if the format supplied one.
    pub adjacent_sea_id: Option<i32>,
}

/// Extracted contents of one region (state) history file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateHistory {
    pub id: i32,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub provinces: Vec<i32>,
    /// `(province id, naval base level)` pairs, file order.
    pub naval_bases: Vec<(i32, u32)>,
}

/// A derived naval-base overlay marker, rebuilt every session.
#[derive(Debug, Clone, PartialEq)]
pub struct NavalBaseMarker {
    pub province_id: i32,
    pub state_id: i32,
    pub level: u32,
    /// Map-space position taken from the state's naval-base building slot.
    pub x: f32,
    pub y: f32,
}

/// A recoverable diagnostic from parsing or loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub message: String,
    /// 1-based source line, or 0 when not line-specific.
    pub line: usize,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), line: 0 }
    }

    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self { message: message.into(), line }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line > 0 {
            write!(f, "line {}: {}", self.line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_province() -> Province {
        Province {
            id: 1,
            color: Rgb::new(255, 0, 0),
            kind: ProvinceKind::Land,
            coastal: true,
            terrain: "hills".to_string(),
            continent: "Europa".to_string(),
            state_id: NO_STATE,
            adjacent: Vec::new(),
        }
    }

    #[test]
    fn test_province_roundtrip() {
        let province = sample_province();
        let json = serde_json::to_string(&province).unwrap();
        let parsed: Province = serde_json::from_str(&json).unwrap();
        assert_eq!(province, parsed);
    }

    #[test]
    fn test_province_defaults_on_deserialize() {
        // Older payloads may lack state_id/adjacent entirely
        let json = r#"{"id": 7, "color": [1,2,3], "kind": "sea",
                       "coastal": false, "terrain": "ocean", "continent": "unknown"}"#;
        let parsed: Province = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.state_id, NO_STATE);
        assert!(parsed.adjacent.is_empty());
        assert_eq!(parsed.kind, ProvinceKind::Sea);
    }

    #[test]
    fn test_kind_from_token() {
        assert_eq!(ProvinceKind::from_token("land"), ProvinceKind::Land);
        assert_eq!(ProvinceKind::from_token("SEA"), ProvinceKind::Sea);
        assert_eq!(ProvinceKind::from_token(" Lake "), ProvinceKind::Lake);
        assert_eq!(ProvinceKind::from_token("swamp"), ProvinceKind::Unknown);
        assert_eq!(ProvinceKind::from_token(""), ProvinceKind::Unknown);
    }

    #[test]
    fn test_kind_is_water() {
        assert!(ProvinceKind::Sea.is_water());
        assert!(ProvinceKind::Lake.is_water());
        assert!(!ProvinceKind::Land.is_water());
        assert!(!ProvinceKind::Unknown.is_water());
    }

    #[test]
    fn test_channel_distance() {
        let a = Rgb::new(10, 200, 30);
        let b = Rgb::new(12, 190, 30);
        assert_eq!(a.channel_distance(b), 10);
        assert_eq!(a.channel_distance(a), 0);
    }

    #[test]
    fn test_warning_display() {
        assert_eq!(Warning::at_line("bad id", 3).to_string(), "line 3: bad id");
        assert_eq!(Warning::new("no provinces").to_string(), "no provinces");
    }
}
