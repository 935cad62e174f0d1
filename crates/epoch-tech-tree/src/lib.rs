//! Tech tree for the Epoch civilization engine.
//!
//! Holds the technologies and ages of one ruleset and answers structural
//! and progression queries over the prerequisite graph.
//!
//! # Overview
//!
//! Ages are registered in chronological order with [`TechTree::add_age`];
//! technologies with [`TechTree::add`]. Prerequisites are referenced by key
//! and may point forward (to technologies registered later), so the tree is
//! not checked while it is being built. Call [`TechTree::validate`] (or
//! [`TechTree::ensure_valid`]) once loading is done: a tree with dangling
//! prerequisites, unknown ages or prerequisite cycles must not be used to
//! start a game.
//!
//! Progression queries take the player's completed set explicitly:
//! [`TechTree::available`] lists what can be researched next, ordered by age
//! and then registration order. Per-player progress lives in
//! [`research::Research`], not in the shared tree.
//!
//! # Ordering
//!
//! [`TechTree::topological_order`] runs Kahn's algorithm with a min-heap on
//! registration index, so among technologies whose prerequisites are all
//! placed, the earliest registered comes first.

pub mod research;

use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

pub use research::{Research, ResearchEvent};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

slotmap::new_key_type! {
    /// Handle to a registered technology. Cheap to copy and compare.
    pub struct TechId;
}

// ---------------------------------------------------------------------------
// Ages
// ---------------------------------------------------------------------------

/// RGBA display color, each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// A chronological grouping of technologies. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Age {
    /// Unique key.
    pub key: String,

    /// Display name (opaque localized string).
    pub name: String,

    /// Display description (opaque localized string).
    pub description: String,

    pub color: Color,
}

impl Age {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
            color: Color::WHITE,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn colored(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

// ---------------------------------------------------------------------------
// Technology definition
// ---------------------------------------------------------------------------

/// A technology that can be researched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    /// Unique key.
    pub key: String,

    /// Display name (opaque localized string).
    pub name: String,

    /// Display description (opaque localized string).
    pub description: String,

    /// Key of the owning age.
    pub age: String,

    /// Research points required. Must be at least 1.
    pub cost: u32,

    /// Keys of technologies that must be completed first.
    pub prerequisites: Vec<String>,

    /// Set by single-player game code when research finishes.
    pub completed: bool,
}

impl Technology {
    pub fn new(key: impl Into<String>, age: impl Into<String>, cost: u32) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            description: String::new(),
            age: age.into(),
            cost,
            prerequisites: Vec::new(),
            completed: false,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn requires<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites
            .extend(prerequisites.into_iter().map(Into::into));
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A structural problem in a ruleset, found by [`TechTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("technology {tech:?} requires unknown technology {missing:?}")]
    MissingDependency { tech: String, missing: String },

    /// `path` starts and ends with the same key, each entry requiring the next.
    #[error("prerequisite cycle: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    #[error("technology {tech:?} belongs to unknown age {age:?}")]
    MissingAge { tech: String, age: String },
}

/// Errors that can occur during tech tree operations.
#[derive(Debug, thiserror::Error)]
pub enum TechTreeError {
    #[error("duplicate {kind} key: {key:?}")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("technology not found: {0:?}")]
    NotFound(String),

    #[error("age not found: {0:?}")]
    AgeNotFound(String),

    #[error("technology {key:?} must cost at least one point")]
    InvalidCost { key: String },

    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error("ruleset failed validation with {} error(s)", .0.len())]
    InvalidRuleset(Vec<StructuralError>),

    #[error("prerequisite not met: {tech:?} requires {prereq:?}")]
    PrerequisiteNotMet { tech: String, prereq: String },

    #[error("technology {0:?} is already completed")]
    AlreadyCompleted(String),

    #[error("no technology is being researched")]
    NoActiveResearch,
}

// ---------------------------------------------------------------------------
// TechTree
// ---------------------------------------------------------------------------

/// The technologies and ages of one ruleset.
///
/// Read-mostly after load. Registration order is kept and is significant:
/// ages are chronological, and technologies tie-break by it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechTree {
    /// Ages in chronological order.
    ages: Vec<Age>,

    technologies: SlotMap<TechId, Technology>,

    by_key: HashMap<String, TechId>,

    /// Technologies in registration order.
    order: Vec<TechId>,
}

impl TechTree {
    /// Create a new, empty tech tree.
    pub fn new() -> Self {
        Self::default()
    }

    // -- Registration API --

    /// Append an age. Ages are kept in the order they are added.
    pub fn add_age(&mut self, age: Age) -> Result<(), TechTreeError> {
        if self.ages.iter().any(|a| a.key == age.key) {
            return Err(TechTreeError::DuplicateKey {
                kind: "age",
                key: age.key,
            });
        }
        tracing::debug!(age = %age.key, index = self.ages.len(), "registered age");
        self.ages.push(age);
        Ok(())
    }

    /// Register a technology. Its key must be unique. Prerequisites and the
    /// age are not checked here; see [`TechTree::validate`].
    pub fn add(&mut self, tech: Technology) -> Result<TechId, TechTreeError> {
        if self.by_key.contains_key(&tech.key) {
            return Err(TechTreeError::DuplicateKey {
                kind: "technology",
                key: tech.key,
            });
        }
        if tech.cost == 0 {
            return Err(TechTreeError::InvalidCost { key: tech.key });
        }

        tracing::debug!(
            tech = %tech.key,
            age = %tech.age,
            prerequisites = tech.prerequisites.len(),
            "registered technology"
        );

        let key = tech.key.clone();
        let id = self.technologies.insert(tech);
        self.by_key.insert(key, id);
        self.order.push(id);
        Ok(id)
    }

    // -- Query API --

    /// Look up a technology by key.
    pub fn get(&self, key: &str) -> Result<&Technology, TechTreeError> {
        self.by_key
            .get(key)
            .and_then(|id| self.technologies.get(*id))
            .ok_or_else(|| TechTreeError::NotFound(key.to_string()))
    }

    /// Look up a technology by handle.
    pub fn get_by_id(&self, id: TechId) -> Option<&Technology> {
        self.technologies.get(id)
    }

    /// Handle for a key, if registered.
    pub fn id_of(&self, key: &str) -> Option<TechId> {
        self.by_key.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Look up an age by key.
    pub fn get_age(&self, key: &str) -> Result<&Age, TechTreeError> {
        self.ages
            .iter()
            .find(|a| a.key == key)
            .ok_or_else(|| TechTreeError::AgeNotFound(key.to_string()))
    }

    /// Chronological position of an age.
    pub fn age_index(&self, key: &str) -> Option<usize> {
        self.ages.iter().position(|a| a.key == key)
    }

    /// Ages in chronological order.
    pub fn ages(&self) -> &[Age] {
        &self.ages
    }

    /// Technologies in registration order.
    pub fn technologies(&self) -> impl Iterator<Item = &Technology> + '_ {
        self.order.iter().filter_map(|id| self.technologies.get(*id))
    }

    pub fn technology_count(&self) -> usize {
        self.order.len()
    }

    /// Technologies of one age, in registration order.
    pub fn technologies_in_age<'a>(&'a self, age: &'a str) -> impl Iterator<Item = &'a Technology> {
        self.technologies().filter(move |t| t.age == age)
    }

    /// Technologies that list `key` as a direct prerequisite.
    pub fn dependents(&self, key: &str) -> Result<Vec<&Technology>, TechTreeError> {
        self.get(key)?;
        Ok(self
            .technologies()
            .filter(|t| t.prerequisites.iter().any(|p| p == key))
            .collect())
    }

    /// Whether every prerequisite of `key` is in `completed`.
    pub fn prerequisites_met(
        &self,
        key: &str,
        completed: &BTreeSet<String>,
    ) -> Result<bool, TechTreeError> {
        let tech = self.get(key)?;
        Ok(tech.prerequisites.iter().all(|p| completed.contains(p)))
    }

    /// Technologies that can be researched next: not in `completed`, with
    /// every prerequisite in `completed`. Ordered by age, then registration.
    pub fn available(&self, completed: &BTreeSet<String>) -> Vec<&Technology> {
        let mut ready: Vec<&Technology> = self
            .technologies()
            .filter(|t| !completed.contains(&t.key))
            .filter(|t| t.prerequisites.iter().all(|p| completed.contains(p)))
            .collect();
        // Stable sort keeps registration order within an age.
        ready.sort_by_key(|t| self.age_index(&t.age).unwrap_or(usize::MAX));
        ready
    }

    // -- Completed flag --

    /// Set the `completed` flag on a technology.
    pub fn set_completed(&mut self, key: &str, completed: bool) -> Result<(), TechTreeError> {
        let id = self
            .id_of(key)
            .ok_or_else(|| TechTreeError::NotFound(key.to_string()))?;
        if let Some(tech) = self.technologies.get_mut(id) {
            tech.completed = completed;
        }
        Ok(())
    }

    /// Keys of every technology whose `completed` flag is set.
    pub fn completed_set(&self) -> BTreeSet<String> {
        self.technologies()
            .filter(|t| t.completed)
            .map(|t| t.key.clone())
            .collect()
    }

    // -- Structure --

    /// A full dependency-respecting order of all technologies. Fails on the
    /// first dangling prerequisite or, if the graph has a cycle, with one
    /// representative cycle.
    pub fn topological_order(&self) -> Result<Vec<&Technology>, TechTreeError> {
        if let Some(err) = self.missing_dependencies().into_iter().next() {
            return Err(err.into());
        }

        let (order, remaining) = self.kahn();
        if let Some(path) = self.find_cycles(&remaining).into_iter().next() {
            return Err(StructuralError::CyclicDependency { path }.into());
        }

        Ok(order
            .into_iter()
            .filter_map(|id| self.technologies.get(id))
            .collect())
    }

    /// Every structural problem in the tree: dangling prerequisites, unknown
    /// ages and prerequisite cycles. Empty means the tree is usable.
    pub fn validate(&self) -> Vec<StructuralError> {
        let mut errors = self.missing_dependencies();

        for tech in self.technologies() {
            if self.age_index(&tech.age).is_none() {
                errors.push(StructuralError::MissingAge {
                    tech: tech.key.clone(),
                    age: tech.age.clone(),
                });
            }
        }

        let (_, remaining) = self.kahn();
        errors.extend(
            self.find_cycles(&remaining)
                .into_iter()
                .map(|path| StructuralError::CyclicDependency { path }),
        );

        if !errors.is_empty() {
            tracing::warn!(errors = errors.len(), "tech tree failed validation");
        }
        errors
    }

    /// [`TechTree::validate`] as a load gate.
    pub fn ensure_valid(&self) -> Result<(), TechTreeError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(TechTreeError::InvalidRuleset(errors))
        }
    }

    // -- Internal helpers --

    fn missing_dependencies(&self) -> Vec<StructuralError> {
        let mut errors = Vec::new();
        for tech in self.technologies() {
            for prereq in &tech.prerequisites {
                if !self.by_key.contains_key(prereq) {
                    errors.push(StructuralError::MissingDependency {
                        tech: tech.key.clone(),
                        missing: prereq.clone(),
                    });
                }
            }
        }
        errors
    }

    /// Kahn's algorithm over the prerequisite edges that resolve. Returns the
    /// placed technologies and, in registration order, those left over
    /// (on or downstream of a cycle).
    fn kahn(&self) -> (Vec<TechId>, Vec<TechId>) {
        let mut position: SecondaryMap<TechId, usize> = SecondaryMap::new();
        let mut in_degree: SecondaryMap<TechId, usize> = SecondaryMap::new();
        let mut dependents: SecondaryMap<TechId, Vec<TechId>> = SecondaryMap::new();

        for (idx, &id) in self.order.iter().enumerate() {
            position.insert(id, idx);
            in_degree.insert(id, 0);
            dependents.insert(id, Vec::new());
        }

        for &id in &self.order {
            let Some(tech) = self.technologies.get(id) else {
                continue;
            };
            for prereq in tech.prerequisites.iter().filter_map(|p| self.id_of(p)) {
                if let Some(deg) = in_degree.get_mut(id) {
                    *deg += 1;
                }
                if let Some(list) = dependents.get_mut(prereq) {
                    list.push(id);
                }
            }
        }

        // Seed the heap with all zero-in-degree technologies.
        let mut heap: BinaryHeap<Reverse<usize>> = self
            .order
            .iter()
            .enumerate()
            .filter(|(_, id)| in_degree.get(**id).copied() == Some(0))
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut placed: Vec<TechId> = Vec::with_capacity(self.order.len());

        while let Some(Reverse(idx)) = heap.pop() {
            let id = self.order[idx];
            placed.push(id);

            for &dest in dependents.get(id).map(Vec::as_slice).unwrap_or_default() {
                if let Some(deg) = in_degree.get_mut(dest) {
                    *deg -= 1;
                    if *deg == 0
                        && let Some(&pos) = position.get(dest)
                    {
                        heap.push(Reverse(pos));
                    }
                }
            }
        }

        let remaining = self
            .order
            .iter()
            .copied()
            .filter(|id| in_degree.get(*id).copied().unwrap_or(0) > 0)
            .collect();

        (placed, remaining)
    }

    /// Extract cycles from the technologies Kahn's algorithm could not place.
    ///
    /// Every leftover technology has at least one leftover prerequisite, so
    /// following prerequisites from any of them ends up on a cycle. Walked
    /// technologies are dropped after each walk, which yields one cycle per
    /// disjoint strongly connected region reached.
    fn find_cycles(&self, remaining: &[TechId]) -> Vec<Vec<String>> {
        let mut position: SecondaryMap<TechId, usize> = SecondaryMap::new();
        for (idx, &id) in self.order.iter().enumerate() {
            position.insert(id, idx);
        }

        let mut left: BTreeSet<usize> = remaining
            .iter()
            .filter_map(|id| position.get(*id).copied())
            .collect();
        let mut cycles = Vec::new();

        while let Some(&start) = left.iter().next() {
            let mut walk: Vec<usize> = Vec::new();
            // Registration index -> step at which the walk visited it.
            let mut step: HashMap<usize, usize> = HashMap::new();
            let mut current = start;

            loop {
                if let Some(&at) = step.get(&current) {
                    let mut path: Vec<String> = walk[at..]
                        .iter()
                        .filter_map(|&i| self.technologies.get(self.order[i]))
                        .map(|t| t.key.clone())
                        .collect();
                    if let Some(first) = path.first().cloned() {
                        path.push(first);
                    }
                    cycles.push(path);
                    break;
                }
                step.insert(current, walk.len());
                walk.push(current);

                let next = self
                    .technologies
                    .get(self.order[current])
                    .into_iter()
                    .flat_map(|t| t.prerequisites.iter())
                    .filter_map(|p| self.id_of(p))
                    .filter_map(|id| position.get(id).copied())
                    .find(|i| left.contains(i));

                match next {
                    Some(n) => current = n,
                    None => break,
                }
            }

            for w in walk {
                left.remove(&w);
            }
        }

        cycles
    }
}

// ===========================================================================
// Tests
// ===========================================================================
