//! Resolved ruleset: the tech tree plus map content, and tile yield assembly.
//!
//! Every record here is immutable once registered and looked up by key.
//! [`Ruleset::tile_stack`] gathers the contributions for one tile into a
//! [`YieldStack`]; [`Ruleset::tile_yields`] resolves it.

use epoch_tech_tree::{TechTree, TechTreeError};
use epoch_yields::{YieldStack, Yields};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ===========================================================================
// Errors
// ===========================================================================

#[derive(Debug, thiserror::Error)]
pub enum RulesetError {
    #[error("unknown {kind} {key:?}")]
    UnknownKey { kind: &'static str, key: String },

    #[error("duplicate {kind} key: {key:?}")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("{kind} {key:?} cannot be placed on {terrain:?}")]
    NotAllowed {
        kind: &'static str,
        key: String,
        terrain: String,
    },

    #[error(transparent)]
    TechTree(#[from] TechTreeError),
}

// ===========================================================================
// Records
// ===========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Terrain {
    pub key: String,
    pub name: String,
    pub movement_cost: f64,
    pub impassable: bool,
    /// Base-stage yields.
    pub yields: Yields,
}

/// A tile improvement. An empty `terrains` list means any terrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Improvement {
    pub key: String,
    pub name: String,
    pub yields: Yields,
    pub required_tech: Option<String>,
    pub terrains: Vec<String>,
}

/// A map resource. An empty `terrains` list means any terrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub key: String,
    pub name: String,
    pub yields: Yields,
    pub required_tech: Option<String>,
    pub terrains: Vec<String>,
}

/// An empire-wide modifier, usually a percentage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub key: String,
    pub name: String,
    pub yields: Yields,
    pub required_tech: Option<String>,
}

/// What sits on one map tile, by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSpec {
    pub terrain: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub improvements: Vec<String>,
    /// Policies in effect for the tile's owner.
    #[serde(default)]
    pub policies: Vec<String>,
}

impl TileSpec {
    pub fn new(terrain: impl Into<String>) -> Self {
        Self {
            terrain: terrain.into(),
            ..Self::default()
        }
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_improvement(mut self, improvement: impl Into<String>) -> Self {
        self.improvements.push(improvement.into());
        self
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policies.push(policy.into());
        self
    }
}

// ===========================================================================
// Ruleset
// ===========================================================================

/// All static game content for one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ruleset {
    tech_tree: TechTree,
    terrains: BTreeMap<String, Terrain>,
    improvements: BTreeMap<String, Improvement>,
    resources: BTreeMap<String, Resource>,
    policies: BTreeMap<String, Policy>,
}

/// Insert under `key`, rejecting duplicates.
fn register<T>(
    map: &mut BTreeMap<String, T>,
    kind: &'static str,
    key: &str,
    value: T,
) -> Result<(), RulesetError> {
    if map.contains_key(key) {
        return Err(RulesetError::DuplicateKey {
            kind,
            key: key.to_string(),
        });
    }
    map.insert(key.to_string(), value);
    Ok(())
}

fn lookup<'a, T>(
    map: &'a BTreeMap<String, T>,
    kind: &'static str,
    key: &str,
) -> Result<&'a T, RulesetError> {
    map.get(key).ok_or_else(|| RulesetError::UnknownKey {
        kind,
        key: key.to_string(),
    })
}

fn unlocked(required_tech: &Option<String>, completed: &BTreeSet<String>) -> bool {
    required_tech.as_ref().is_none_or(|t| completed.contains(t))
}

impl Ruleset {
    pub fn new(tech_tree: TechTree) -> Self {
        Self {
            tech_tree,
            terrains: BTreeMap::new(),
            improvements: BTreeMap::new(),
            resources: BTreeMap::new(),
            policies: BTreeMap::new(),
        }
    }

    // -- Registration --

    pub fn add_terrain(&mut self, terrain: Terrain) -> Result<(), RulesetError> {
        let key = terrain.key.clone();
        register(&mut self.terrains, "terrain", &key, terrain)
    }

    pub fn add_improvement(&mut self, improvement: Improvement) -> Result<(), RulesetError> {
        let key = improvement.key.clone();
        register(&mut self.improvements, "improvement", &key, improvement)
    }

    pub fn add_resource(&mut self, resource: Resource) -> Result<(), RulesetError> {
        let key = resource.key.clone();
        register(&mut self.resources, "resource", &key, resource)
    }

    pub fn add_policy(&mut self, policy: Policy) -> Result<(), RulesetError> {
        let key = policy.key.clone();
        register(&mut self.policies, "policy", &key, policy)
    }

    // -- Lookup --

    pub fn tech_tree(&self) -> &TechTree {
        &self.tech_tree
    }

    pub fn terrain(&self, key: &str) -> Result<&Terrain, RulesetError> {
        lookup(&self.terrains, "terrain", key)
    }

    pub fn improvement(&self, key: &str) -> Result<&Improvement, RulesetError> {
        lookup(&self.improvements, "improvement", key)
    }

    pub fn resource(&self, key: &str) -> Result<&Resource, RulesetError> {
        lookup(&self.resources, "resource", key)
    }

    pub fn policy(&self, key: &str) -> Result<&Policy, RulesetError> {
        lookup(&self.policies, "policy", key)
    }

    /// Terrains sorted by key.
    pub fn terrains(&self) -> impl Iterator<Item = &Terrain> + '_ {
        self.terrains.values()
    }

    pub fn improvements(&self) -> impl Iterator<Item = &Improvement> + '_ {
        self.improvements.values()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> + '_ {
        self.resources.values()
    }

    pub fn policies(&self) -> impl Iterator<Item = &Policy> + '_ {
        self.policies.values()
    }

    // -- Unlocks --

    /// Whether the player with `completed` technologies may build `key`.
    pub fn improvement_available(
        &self,
        key: &str,
        completed: &BTreeSet<String>,
    ) -> Result<bool, RulesetError> {
        Ok(unlocked(&self.improvement(key)?.required_tech, completed))
    }

    /// Every improvement unlocked by `completed`, sorted by key.
    pub fn available_improvements(&self, completed: &BTreeSet<String>) -> Vec<&Improvement> {
        self.improvements
            .values()
            .filter(|i| unlocked(&i.required_tech, completed))
            .collect()
    }

    /// Every policy unlocked by `completed`, sorted by key.
    pub fn available_policies(&self, completed: &BTreeSet<String>) -> Vec<&Policy> {
        self.policies
            .values()
            .filter(|p| unlocked(&p.required_tech, completed))
            .collect()
    }

    // -- Validation --

    /// Check the tech tree and every technology and terrain reference.
    pub fn validate(&self) -> Result<(), RulesetError> {
        self.tech_tree.ensure_valid()?;

        let placed = self
            .improvements
            .values()
            .map(|i| (&i.required_tech, &i.terrains))
            .chain(self.resources.values().map(|r| (&r.required_tech, &r.terrains)));
        for (tech, terrains) in placed {
            if let Some(tech) = tech {
                self.tech_tree.get(tech)?;
            }
            for terrain in terrains {
                self.terrain(terrain)?;
            }
        }
        for policy in self.policies.values() {
            if let Some(tech) = &policy.required_tech {
                self.tech_tree.get(tech)?;
            }
        }
        Ok(())
    }

    // -- Tile yields --

    /// Gather one tile's contributions: terrain, then resource, then
    /// improvements, then policies.
    pub fn tile_stack(&self, tile: &TileSpec) -> Result<YieldStack, RulesetError> {
        let terrain = self.terrain(&tile.terrain)?;
        let mut stack = YieldStack::labeled(terrain.key.clone());
        stack.push(terrain.yields.clone());

        if let Some(key) = &tile.resource {
            let resource = self.resource(key)?;
            check_terrain("resource", key, &resource.terrains, &terrain.key)?;
            stack.push(resource.yields.clone());
        }
        for key in &tile.improvements {
            let improvement = self.improvement(key)?;
            check_terrain("improvement", key, &improvement.terrains, &terrain.key)?;
            stack.push(improvement.yields.clone());
        }
        for key in &tile.policies {
            stack.push(self.policy(key)?.yields.clone());
        }

        Ok(stack)
    }

    /// Final whole-number yields for one tile.
    pub fn tile_yields(&self, tile: &TileSpec) -> Result<Yields, RulesetError> {
        Ok(self.tile_stack(tile)?.resolve())
    }
}

fn check_terrain(
    kind: &'static str,
    key: &str,
    allowed: &[String],
    terrain: &str,
) -> Result<(), RulesetError> {
    if allowed.is_empty() || allowed.iter().any(|t| t == terrain) {
        Ok(())
    } else {
        Err(RulesetError::NotAllowed {
            kind,
            key: key.to_string(),
            terrain: terrain.to_string(),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
