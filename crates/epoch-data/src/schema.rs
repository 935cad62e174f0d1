//! Serde data file structs for ruleset definitions.
//!
//! These structs define the on-disk format for ages, technologies, terrains,
//! improvements, resources and policies. They are deserialized from RON, JSON,
//! or TOML data files and then resolved into ruleset types by the loader.
//!
//! Yields are written as a `category -> amount` table using the snake_case
//! category names (`food`, `great_science`, ...).

use epoch_yields::YieldMode;
use serde::Deserialize;
use std::collections::BTreeMap;

// ===========================================================================
// Tech tree
// ===========================================================================

/// An age definition. File order is chronological order.
#[derive(Debug, Clone, Deserialize)]
pub struct AgeData {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// RGBA, each channel in `0.0..=1.0`.
    #[serde(default = "default_color")]
    pub color: [f32; 4],
}

fn default_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

/// A technology definition. Prerequisites may reference technologies defined
/// later in the same file.
#[derive(Debug, Clone, Deserialize)]
pub struct TechnologyData {
    pub key: String,
    /// Display name; defaults to the key.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    pub age: String,
    pub cost: u32,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

// ===========================================================================
// Map content
// ===========================================================================

/// A terrain type. Its yields are always the base stage.
#[derive(Debug, Clone, Deserialize)]
pub struct TerrainData {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub yields: BTreeMap<String, f64>,
    #[serde(default = "default_movement_cost")]
    pub movement_cost: f64,
    #[serde(default)]
    pub impassable: bool,
}

fn default_movement_cost() -> f64 {
    1.0
}

/// A tile improvement. An empty `terrains` list means any terrain.
#[derive(Debug, Clone, Deserialize)]
pub struct ImprovementData {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub yields: BTreeMap<String, f64>,
    #[serde(default = "default_additive")]
    pub mode: YieldMode,
    #[serde(default)]
    pub required_tech: Option<String>,
    #[serde(default)]
    pub terrains: Vec<String>,
}

/// A map resource. Same placement rules as improvements.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceData {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub yields: BTreeMap<String, f64>,
    #[serde(default = "default_additive")]
    pub mode: YieldMode,
    #[serde(default)]
    pub required_tech: Option<String>,
    #[serde(default)]
    pub terrains: Vec<String>,
}

fn default_additive() -> YieldMode {
    YieldMode::Additive
}

// ===========================================================================
// Empire-wide modifiers
// ===========================================================================

/// A policy. Percentages are fractions: `0.25` is +25%.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyData {
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub yields: BTreeMap<String, f64>,
    #[serde(default = "default_percentage")]
    pub mode: YieldMode,
    #[serde(default)]
    pub required_tech: Option<String>,
}

fn default_percentage() -> YieldMode {
    YieldMode::PercentageAdditive
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_ron_defaults() {
        let a: AgeData = ron::from_str(r#"(key: "ancient", name: "Ancient Era")"#).unwrap();
        assert_eq!(a.description, "");
        assert_eq!(a.color, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn technology_json() {
        let t: TechnologyData = serde_json::from_str(
            r#"{"key": "writing", "age": "ancient", "cost": 50, "prerequisites": ["pottery"]}"#,
        )
        .unwrap();
        assert_eq!(t.name, None);
        assert_eq!(t.prerequisites, vec!["pottery"]);
    }

    #[test]
    fn terrain_toml_defaults() {
        let t: TerrainData = toml::from_str(
            r#"
key = "plains"
yields = { food = 1.0, production = 1.0 }
"#,
        )
        .unwrap();
        assert_eq!(t.movement_cost, 1.0);
        assert!(!t.impassable);
        assert_eq!(t.yields["production"], 1.0);
    }

    #[test]
    fn improvement_mode_defaults_to_additive() {
        let i: ImprovementData =
            ron::from_str(r#"(key: "farm", yields: {"food": 1.0})"#).unwrap();
        assert_eq!(i.mode, YieldMode::Additive);
        assert!(i.terrains.is_empty());
        assert!(i.required_tech.is_none());
    }

    #[test]
    fn policy_mode_override() {
        let p: PolicyData = serde_json::from_str(
            r#"{"key": "mercantilism", "yields": {"gold": 0.5}, "mode": "percentage_cumulative"}"#,
        )
        .unwrap();
        assert_eq!(p.mode, YieldMode::PercentageCumulative);

        let p: PolicyData =
            serde_json::from_str(r#"{"key": "scholasticism", "yields": {"science": 0.2}}"#)
                .unwrap();
        assert_eq!(p.mode, YieldMode::PercentageAdditive);
    }
}
