//! The standard ruleset, built from static tables.
//!
//! Useful for tests and tools that need a playable ruleset without a data
//! directory. Data-driven games should use [`crate::load_ruleset`] instead.

use epoch_tech_tree::{Age, Color, TechTree, Technology};
use epoch_yields::{YieldCategory, YieldCategory::*, YieldMode, Yields};

use crate::ruleset::{Improvement, Policy, Resource, Ruleset, RulesetError, Terrain};

// ===========================================================================
// Tables
// ===========================================================================

const AGES: &[(&str, &str, Color)] = &[
    ("ancient", "Ancient Era", Color::rgba(0.55, 0.40, 0.25, 1.0)),
    ("classical", "Classical Era", Color::rgba(0.75, 0.60, 0.30, 1.0)),
    ("medieval", "Medieval Era", Color::rgba(0.45, 0.45, 0.55, 1.0)),
    ("renaissance", "Renaissance Era", Color::rgba(0.60, 0.30, 0.45, 1.0)),
    ("industrial", "Industrial Era", Color::rgba(0.35, 0.35, 0.35, 1.0)),
    ("modern", "Modern Era", Color::rgba(0.25, 0.50, 0.70, 1.0)),
    ("atomic", "Atomic Era", Color::rgba(0.30, 0.70, 0.40, 1.0)),
    ("information", "Information Era", Color::rgba(0.20, 0.60, 0.90, 1.0)),
    ("future", "Future Era", Color::rgba(0.80, 0.80, 1.00, 1.0)),
];

struct TechRow {
    key: &'static str,
    name: &'static str,
    age: &'static str,
    cost: u32,
    prerequisites: &'static [&'static str],
}

const fn tech(
    key: &'static str,
    name: &'static str,
    age: &'static str,
    cost: u32,
    prerequisites: &'static [&'static str],
) -> TechRow {
    TechRow {
        key,
        name,
        age,
        cost,
        prerequisites,
    }
}

const TECHNOLOGIES: &[TechRow] = &[
    tech("pottery", "Pottery", "ancient", 25, &[]),
    tech("animal_husbandry", "Animal Husbandry", "ancient", 25, &[]),
    tech("mining", "Mining", "ancient", 25, &[]),
    tech("sailing", "Sailing", "ancient", 50, &[]),
    tech("astrology", "Astrology", "ancient", 50, &[]),
    tech("irrigation", "Irrigation", "ancient", 50, &["pottery"]),
    tech("writing", "Writing", "ancient", 50, &["pottery"]),
    tech("archery", "Archery", "ancient", 35, &["animal_husbandry"]),
    tech("masonry", "Masonry", "ancient", 80, &["mining"]),
    tech("bronze_working", "Bronze Working", "ancient", 80, &["mining"]),
    tech("wheel", "The Wheel", "ancient", 80, &["mining"]),
    tech("celestial_navigation", "Celestial Navigation", "classical", 120, &["sailing", "astrology"]),
    tech("currency", "Currency", "classical", 120, &["writing"]),
    tech("horseback_riding", "Horseback Riding", "classical", 120, &["archery"]),
    tech("iron_working", "Iron Working", "classical", 120, &["bronze_working"]),
    tech("mathematics", "Mathematics", "classical", 200, &["currency"]),
    tech("construction", "Construction", "classical", 200, &["masonry", "horseback_riding"]),
    tech("engineering", "Engineering", "classical", 200, &["wheel"]),
    tech("apprenticeship", "Apprenticeship", "medieval", 290, &["currency", "mining"]),
    tech("education", "Education", "medieval", 390, &["apprenticeship", "mathematics"]),
    tech("banking", "Banking", "renaissance", 600, &["education"]),
    tech("astronomy", "Astronomy", "renaissance", 600, &["education"]),
    tech("industrialization", "Industrialization", "industrial", 930, &["banking"]),
    tech("scientific_theory", "Scientific Theory", "industrial", 930, &["astronomy"]),
    tech("electricity", "Electricity", "modern", 1250, &["industrialization"]),
    tech("computers", "Computers", "atomic", 1850, &["electricity", "scientific_theory"]),
    tech("robotics", "Robotics", "information", 2155, &["computers"]),
    tech("future_tech", "Future Tech", "future", 2500, &["robotics"]),
];

type YieldRow = &'static [(YieldCategory, f64)];

struct TerrainRow {
    key: &'static str,
    name: &'static str,
    movement_cost: f64,
    impassable: bool,
    yields: YieldRow,
}

const fn terrain(key: &'static str, name: &'static str, yields: YieldRow) -> TerrainRow {
    TerrainRow {
        key,
        name,
        movement_cost: 1.0,
        impassable: false,
        yields,
    }
}

const TERRAINS: &[TerrainRow] = &[
    terrain("grassland", "Grassland", &[(Food, 2.0)]),
    terrain("plains", "Plains", &[(Food, 1.0), (Production, 1.0)]),
    terrain("desert", "Desert", &[]),
    terrain("tundra", "Tundra", &[(Food, 1.0)]),
    terrain("snow", "Snow", &[]),
    TerrainRow {
        movement_cost: 2.0,
        ..terrain("hills", "Hills", &[(Production, 2.0)])
    },
    terrain("coast", "Coast", &[(Food, 1.0), (Gold, 1.0)]),
    terrain("ocean", "Ocean", &[(Food, 1.0)]),
    TerrainRow {
        impassable: true,
        ..terrain("mountains", "Mountains", &[])
    },
];

/// Improvements and resources share a shape.
struct PlacedRow {
    key: &'static str,
    name: &'static str,
    required_tech: Option<&'static str>,
    terrains: &'static [&'static str],
    yields: YieldRow,
}

const fn placed(
    key: &'static str,
    name: &'static str,
    required_tech: Option<&'static str>,
    terrains: &'static [&'static str],
    yields: YieldRow,
) -> PlacedRow {
    PlacedRow {
        key,
        name,
        required_tech,
        terrains,
        yields,
    }
}

const IMPROVEMENTS: &[PlacedRow] = &[
    placed("farm", "Farm", None, &["grassland", "plains", "hills"], &[(Food, 1.0)]),
    placed("mine", "Mine", Some("mining"), &["hills"], &[(Production, 1.0)]),
    placed("quarry", "Quarry", Some("mining"), &["plains", "desert", "hills"], &[(Production, 1.0)]),
    placed("pasture", "Pasture", Some("animal_husbandry"), &["grassland", "plains", "tundra"], &[(Production, 1.0)]),
    placed("plantation", "Plantation", Some("irrigation"), &["grassland", "plains"], &[(Gold, 2.0)]),
    placed("fishing_boats", "Fishing Boats", Some("sailing"), &["coast", "ocean"], &[(Food, 1.0)]),
];

const RESOURCES: &[PlacedRow] = &[
    placed("wheat", "Wheat", None, &["plains", "grassland"], &[(Food, 1.0)]),
    placed("cattle", "Cattle", None, &["grassland"], &[(Food, 1.0)]),
    placed("fish", "Fish", None, &["coast", "ocean"], &[(Food, 1.0)]),
    placed("iron", "Iron", Some("bronze_working"), &["hills", "plains"], &[(Science, 1.0)]),
    placed("silver", "Silver", None, &["desert", "tundra"], &[(Gold, 3.0), (Contentment, 1.0)]),
];

struct PolicyRow {
    key: &'static str,
    name: &'static str,
    mode: YieldMode,
    required_tech: Option<&'static str>,
    yields: YieldRow,
}

const POLICIES: &[PolicyRow] = &[
    PolicyRow {
        key: "urban_planning",
        name: "Urban Planning",
        mode: YieldMode::Additive,
        required_tech: None,
        yields: &[(Production, 1.0)],
    },
    PolicyRow {
        key: "agrarian_reform",
        name: "Agrarian Reform",
        mode: YieldMode::PercentageAdditive,
        required_tech: Some("irrigation"),
        yields: &[(Food, 0.25)],
    },
    PolicyRow {
        key: "scholasticism",
        name: "Scholasticism",
        mode: YieldMode::PercentageAdditive,
        required_tech: Some("writing"),
        yields: &[(Science, 0.2)],
    },
    PolicyRow {
        key: "mercantilism",
        name: "Mercantilism",
        mode: YieldMode::PercentageCumulative,
        required_tech: Some("currency"),
        yields: &[(Gold, 0.5)],
    },
];

// ===========================================================================
// Construction
// ===========================================================================

fn yields(mode: YieldMode, owner: &str, row: YieldRow) -> Yields {
    row.iter()
        .fold(Yields::new(mode), |y, &(c, v)| y.with(c, v))
        .named(owner)
}

fn strings(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

/// The standard tech tree: nine ages, ancient through future.
pub fn tech_tree() -> Result<TechTree, RulesetError> {
    let mut tree = TechTree::new();
    for &(key, name, color) in AGES {
        tree.add_age(Age::new(key, name).colored(color))?;
    }
    for row in TECHNOLOGIES {
        tree.add(
            Technology::new(row.key, row.age, row.cost)
                .named(row.name)
                .requires(row.prerequisites.iter().copied()),
        )?;
    }
    Ok(tree)
}

/// The standard ruleset, validated.
pub fn ruleset() -> Result<Ruleset, RulesetError> {
    let mut rs = Ruleset::new(tech_tree()?);

    for row in TERRAINS {
        rs.add_terrain(Terrain {
            key: row.key.to_string(),
            name: row.name.to_string(),
            movement_cost: row.movement_cost,
            impassable: row.impassable,
            yields: yields(YieldMode::Base, row.key, row.yields),
        })?;
    }
    for row in IMPROVEMENTS {
        rs.add_improvement(Improvement {
            key: row.key.to_string(),
            name: row.name.to_string(),
            yields: yields(YieldMode::Additive, row.key, row.yields),
            required_tech: row.required_tech.map(str::to_string),
            terrains: strings(row.terrains),
        })?;
    }
    for row in RESOURCES {
        rs.add_resource(Resource {
            key: row.key.to_string(),
            name: row.name.to_string(),
            yields: yields(YieldMode::Additive, row.key, row.yields),
            required_tech: row.required_tech.map(str::to_string),
            terrains: strings(row.terrains),
        })?;
    }
    for row in POLICIES {
        rs.add_policy(Policy {
            key: row.key.to_string(),
            name: row.name.to_string(),
            yields: yields(row.mode, row.key, row.yields),
            required_tech: row.required_tech.map(str::to_string),
        })?;
    }

    rs.validate()?;
    Ok(rs)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TileSpec;
    use std::collections::BTreeSet;

    #[test]
    fn builtin_ruleset_is_valid() {
        let rs = ruleset().unwrap();
        let tree = rs.tech_tree();
        assert_eq!(tree.ages().len(), 9);
        assert_eq!(tree.ages()[0].key, "ancient");
        assert_eq!(tree.ages()[8].key, "future");
        assert_eq!(tree.technology_count(), TECHNOLOGIES.len());
        assert!(tree.validate().is_empty());
        assert_eq!(
            tree.topological_order().unwrap().last().unwrap().key,
            "future_tech"
        );
    }

    #[test]
    fn every_age_has_a_technology() {
        let tree = tech_tree().unwrap();
        for age in tree.ages() {
            assert!(
                tree.technologies_in_age(&age.key).next().is_some(),
                "empty age {}",
                age.key
            );
        }
    }

    #[test]
    fn starting_options() {
        let rs = ruleset().unwrap();
        let ready: Vec<&str> = rs
            .tech_tree()
            .available(&BTreeSet::new())
            .iter()
            .map(|t| t.key.as_str())
            .collect();
        assert_eq!(
            ready,
            vec!["pottery", "animal_husbandry", "mining", "sailing", "astrology"]
        );

        let improvements: Vec<&str> = rs
            .available_improvements(&BTreeSet::new())
            .iter()
            .map(|i| i.key.as_str())
            .collect();
        assert_eq!(improvements, vec!["farm"]);
    }

    #[test]
    fn plains_wheat_farm_with_agrarian_reform() {
        let rs = ruleset().unwrap();
        let tile = TileSpec::new("plains")
            .with_resource("wheat")
            .with_improvement("farm")
            .with_policy("agrarian_reform");
        let y = rs.tile_yields(&tile).unwrap();
        // food: (1 + 1 + 1) * 1.25 = 3.75 -> 4
        assert_eq!(y.get(Food), 4.0);
        assert_eq!(y.get(Production), 1.0);
        assert_eq!(y.name.as_deref(), Some("plains"));
    }

    #[test]
    fn mountains_are_impassable() {
        let rs = ruleset().unwrap();
        let m = rs.terrain("mountains").unwrap();
        assert!(m.impassable);
        assert!(m.yields.is_zero());
    }
}
