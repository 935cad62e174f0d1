//! Ruleset directory loading.
//!
//! Each content kind lives in its own file named after the kind, written in
//! RON, TOML or JSON. [`load_ruleset`] reads the kinds in dependency order
//! (ages, technologies, terrains, then what refers to them), checks every key
//! reference against what was already read, and hands back a validated
//! [`Ruleset`]. Errors carry the offending file.

use epoch_tech_tree::{Age, Color, TechTree, TechTreeError, Technology};
use epoch_yields::{YieldError, YieldMode, Yields};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::ruleset::{Improvement, Policy, Resource, Ruleset, RulesetError, Terrain};
use crate::schema::*;

// ===========================================================================
// Errors
// ===========================================================================

/// Why a ruleset directory could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// `ages` or `technologies` is missing.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// Not a `.ron`, `.toml` or `.json` file.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// One content kind written in two formats.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// The file is malformed or does not match its record shape.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A record names an age, technology or terrain that does not exist.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// Two records of one kind share a key.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A yields table named an unknown category.
    #[error("invalid yields for '{name}' in {file}: {source}")]
    InvalidYield {
        file: PathBuf,
        name: String,
        source: YieldError,
    },

    /// The assembled ruleset failed validation.
    #[error(transparent)]
    Ruleset(#[from] RulesetError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Serialization formats a ruleset file may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Recognized extensions in lookup order.
const EXTENSIONS: [(&str, Format); 3] = [
    ("ron", Format::Ron),
    ("toml", Format::Toml),
    ("json", Format::Json),
];

/// The format implied by `path`'s extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    EXTENSIONS
        .iter()
        .find(|(known, _)| Some(*known) == ext)
        .map(|&(_, format)| format)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// The file holding one content kind (`ages`, `terrains`, ...) in a ruleset
/// directory, if any. A kind written in two formats at once is ambiguous and
/// fails with `ConflictingFormats`.
pub fn find_content_file(dir: &Path, kind: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut hits = EXTENSIONS
        .iter()
        .map(|(ext, _)| dir.join(format!("{kind}.{ext}")))
        .filter(|candidate| candidate.is_file());

    let found = hits.next();
    if let (Some(a), Some(b)) = (&found, hits.next()) {
        return Err(DataLoadError::ConflictingFormats {
            a: a.clone(),
            b,
        });
    }
    Ok(found)
}

/// [`find_content_file`] for the kinds every ruleset must define.
pub fn require_content_file(dir: &Path, kind: &str) -> Result<PathBuf, DataLoadError> {
    find_content_file(dir, kind)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: kind.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Parse a whole file as `T`.
pub fn parse_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Read the records of one content kind. RON and JSON files are a bare list;
/// TOML has no top-level arrays, so its records sit under a key named after
/// the kind (`[[terrains]]`).
pub fn read_records<T: DeserializeOwned>(path: &Path, kind: &str) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return parse_file(path);
    }

    let mut table: toml::Table = parse_file(path)?;
    let records = table
        .remove(kind)
        .ok_or_else(|| parse_error(path, format!("no [[{kind}]] entries")))?;
    records
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Return an `UnresolvedRef` error unless `name` is in `known`.
pub fn require_ref(
    known: &HashSet<String>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<(), DataLoadError> {
    if known.contains(name) {
        Ok(())
    } else {
        Err(DataLoadError::UnresolvedRef {
            file: file.to_path_buf(),
            name: name.to_string(),
            expected_kind,
        })
    }
}

/// Record `name` in `seen`, returning a `DuplicateName` error if it was
/// already there.
pub fn check_duplicate(
    seen: &mut HashSet<String>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    }
}

/// Convert a `category -> amount` table into a [`Yields`] labeled with its owner.
pub fn resolve_yields(
    amounts: &BTreeMap<String, f64>,
    mode: YieldMode,
    owner: &str,
    file: &Path,
) -> Result<Yields, DataLoadError> {
    Yields::from_pairs(mode, amounts.iter().map(|(k, v)| (k.as_str(), *v)))
        .map(|y| y.named(owner))
        .map_err(|source| DataLoadError::InvalidYield {
            file: file.to_path_buf(),
            name: owner.to_string(),
            source,
        })
}

// ===========================================================================
// Ruleset loading
// ===========================================================================

/// Load a ruleset from `dir`.
///
/// `ages` and `technologies` are required; `terrains`, `improvements`,
/// `resources` and `policies` are optional. Every cross-reference is resolved
/// and the tech tree is validated, so a returned ruleset is ready to start a
/// game with.
pub fn load_ruleset(dir: &Path) -> Result<Ruleset, DataLoadError> {
    let tree = load_tech_tree(dir)?;
    let tech_keys: HashSet<String> = tree.technologies().map(|t| t.key.clone()).collect();
    let mut ruleset = Ruleset::new(tree);

    if let Some(path) = find_content_file(dir, "terrains")? {
        let data: Vec<TerrainData> = read_records(&path, "terrains")?;
        let mut seen = HashSet::new();
        for t in data {
            check_duplicate(&mut seen, &t.key, &path)?;
            let yields = resolve_yields(&t.yields, YieldMode::Base, &t.key, &path)?;
            ruleset.add_terrain(Terrain {
                name: t.name.unwrap_or_else(|| t.key.clone()),
                key: t.key,
                movement_cost: t.movement_cost,
                impassable: t.impassable,
                yields,
            })?;
        }
    }
    let terrain_keys: HashSet<String> = ruleset.terrains().map(|t| t.key.clone()).collect();

    if let Some(path) = find_content_file(dir, "improvements")? {
        let data: Vec<ImprovementData> = read_records(&path, "improvements")?;
        let mut seen = HashSet::new();
        for i in data {
            check_duplicate(&mut seen, &i.key, &path)?;
            check_placement(&i.required_tech, &i.terrains, &tech_keys, &terrain_keys, &path)?;
            let yields = resolve_yields(&i.yields, i.mode, &i.key, &path)?;
            ruleset.add_improvement(Improvement {
                name: i.name.unwrap_or_else(|| i.key.clone()),
                key: i.key,
                yields,
                required_tech: i.required_tech,
                terrains: i.terrains,
            })?;
        }
    }

    if let Some(path) = find_content_file(dir, "resources")? {
        let data: Vec<ResourceData> = read_records(&path, "resources")?;
        let mut seen = HashSet::new();
        for r in data {
            check_duplicate(&mut seen, &r.key, &path)?;
            check_placement(&r.required_tech, &r.terrains, &tech_keys, &terrain_keys, &path)?;
            let yields = resolve_yields(&r.yields, r.mode, &r.key, &path)?;
            ruleset.add_resource(Resource {
                name: r.name.unwrap_or_else(|| r.key.clone()),
                key: r.key,
                yields,
                required_tech: r.required_tech,
                terrains: r.terrains,
            })?;
        }
    }

    if let Some(path) = find_content_file(dir, "policies")? {
        let data: Vec<PolicyData> = read_records(&path, "policies")?;
        let mut seen = HashSet::new();
        for p in data {
            check_duplicate(&mut seen, &p.key, &path)?;
            if let Some(tech) = &p.required_tech {
                require_ref(&tech_keys, tech, &path, "technology")?;
            }
            let yields = resolve_yields(&p.yields, p.mode, &p.key, &path)?;
            ruleset.add_policy(Policy {
                name: p.name.unwrap_or_else(|| p.key.clone()),
                key: p.key,
                yields,
                required_tech: p.required_tech,
            })?;
        }
    }

    ruleset.validate()?;

    tracing::info!(
        dir = %dir.display(),
        ages = ruleset.tech_tree().ages().len(),
        technologies = ruleset.tech_tree().technology_count(),
        terrains = ruleset.terrains().count(),
        improvements = ruleset.improvements().count(),
        resources = ruleset.resources().count(),
        policies = ruleset.policies().count(),
        "loaded ruleset"
    );

    Ok(ruleset)
}

/// Load `ages` and `technologies` into a tech tree, resolving age and
/// prerequisite references against the files' own contents.
fn load_tech_tree(dir: &Path) -> Result<TechTree, DataLoadError> {
    let mut tree = TechTree::new();

    let ages_path = require_content_file(dir, "ages")?;
    let ages: Vec<AgeData> = read_records(&ages_path, "ages")?;
    let mut age_keys = HashSet::new();
    for a in ages {
        check_duplicate(&mut age_keys, &a.key, &ages_path)?;
        let [r, g, b, alpha] = a.color;
        tree.add_age(
            Age::new(a.key, a.name)
                .described(a.description)
                .colored(Color::rgba(r, g, b, alpha)),
        )
        .map_err(|e| tree_error(e, &ages_path))?;
    }

    let techs_path = require_content_file(dir, "technologies")?;
    let techs: Vec<TechnologyData> = read_records(&techs_path, "technologies")?;
    let mut tech_keys = HashSet::new();
    for t in &techs {
        check_duplicate(&mut tech_keys, &t.key, &techs_path)?;
    }
    for t in techs {
        require_ref(&age_keys, &t.age, &techs_path, "age")?;
        for prereq in &t.prerequisites {
            require_ref(&tech_keys, prereq, &techs_path, "technology")?;
        }
        let name = t.name.unwrap_or_else(|| t.key.clone());
        tree.add(
            Technology::new(t.key, t.age, t.cost)
                .named(name)
                .described(t.description)
                .requires(t.prerequisites),
        )
        .map_err(|e| tree_error(e, &techs_path))?;
    }

    Ok(tree)
}

fn check_placement(
    required_tech: &Option<String>,
    terrains: &[String],
    tech_keys: &HashSet<String>,
    terrain_keys: &HashSet<String>,
    file: &Path,
) -> Result<(), DataLoadError> {
    if let Some(tech) = required_tech {
        require_ref(tech_keys, tech, file, "technology")?;
    }
    for terrain in terrains {
        require_ref(terrain_keys, terrain, file, "terrain")?;
    }
    Ok(())
}

/// Attach file context to registration errors.
fn tree_error(err: TechTreeError, file: &Path) -> DataLoadError {
    match err {
        TechTreeError::DuplicateKey { key, .. } => DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: key,
        },
        TechTreeError::InvalidCost { key } => {
            parse_error(file, format!("technology '{key}' must cost at least one point"))
        }
        other => RulesetError::from(other).into(),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
