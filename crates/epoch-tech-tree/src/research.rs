//! Per-player research progress.
//!
//! A [`Research`] belongs to one player's game state; the [`TechTree`] it is
//! checked against is shared and never mutated by it. Points accumulate per
//! technology, so switching the research target keeps earlier progress.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{Age, TechTree, TechTreeError, Technology};

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Events emitted while a player researches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResearchEvent {
    /// A technology became the research target.
    Started { tech: String },

    /// A technology finished.
    Completed { tech: String, age: String },

    /// The player's latest age moved forward.
    AgeEntered { age: String },
}

// ---------------------------------------------------------------------------
// Research
// ---------------------------------------------------------------------------

/// One player's research state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Research {
    completed: BTreeSet<String>,

    /// Accumulated points for technologies started but not finished.
    progress: BTreeMap<String, u32>,

    current: Option<String>,

    /// Events emitted since last drain. Not serialized (transient).
    #[serde(skip)]
    events: Vec<ResearchEvent>,
}

impl Research {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a saved completed set.
    pub fn with_completed<I, S>(completed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            completed: completed.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    // -- Query API --

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.completed
    }

    pub fn is_completed(&self, key: &str) -> bool {
        self.completed.contains(key)
    }

    /// Current research target.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Points accumulated toward `key` so far.
    pub fn progress(&self, key: &str) -> u32 {
        self.progress.get(key).copied().unwrap_or(0)
    }

    /// What this player can research next.
    pub fn available<'t>(&self, tree: &'t TechTree) -> Vec<&'t Technology> {
        tree.available(&self.completed)
    }

    /// The latest age among completed technologies, or `None` before the
    /// first completion.
    pub fn current_age<'t>(&self, tree: &'t TechTree) -> Option<&'t Age> {
        self.age_index(tree).map(|i| &tree.ages()[i])
    }

    fn age_index(&self, tree: &TechTree) -> Option<usize> {
        self.completed
            .iter()
            .filter_map(|key| tree.get(key).ok())
            .filter_map(|tech| tree.age_index(&tech.age))
            .max()
    }

    // -- Research actions --

    /// Make `key` the research target. Restarting the current target is a
    /// no-op.
    pub fn start(&mut self, tree: &TechTree, key: &str) -> Result<(), TechTreeError> {
        let tech = tree.get(key)?;

        if self.completed.contains(key) {
            return Err(TechTreeError::AlreadyCompleted(key.to_string()));
        }
        if let Some(prereq) = tech
            .prerequisites
            .iter()
            .find(|p| !self.completed.contains(*p))
        {
            return Err(TechTreeError::PrerequisiteNotMet {
                tech: key.to_string(),
                prereq: prereq.clone(),
            });
        }
        if self.current.as_deref() == Some(key) {
            return Ok(());
        }

        self.current = Some(key.to_string());
        self.events.push(ResearchEvent::Started {
            tech: key.to_string(),
        });
        Ok(())
    }

    /// Put points toward the current target. Returns the points actually
    /// consumed (less than offered when the target completes).
    pub fn contribute_points(
        &mut self,
        tree: &TechTree,
        points: u32,
    ) -> Result<u32, TechTreeError> {
        let key = self.current.clone().ok_or(TechTreeError::NoActiveResearch)?;
        let tech = tree.get(&key)?;

        let current = self.progress.entry(key.clone()).or_insert(0);
        let remaining = tech.cost.saturating_sub(*current);
        let to_consume = points.min(remaining);
        *current += to_consume;

        if *current >= tech.cost {
            self.complete(tree, tech);
        }

        Ok(to_consume)
    }

    /// Complete `key` immediately, skipping cost and prerequisites. Used for
    /// scenario setup and starting bonuses. Completing twice is a no-op.
    pub fn grant(&mut self, tree: &TechTree, key: &str) -> Result<(), TechTreeError> {
        let tech = tree.get(key)?;
        if !self.completed.contains(key) {
            self.complete(tree, tech);
        }
        Ok(())
    }

    // -- Event API --

    /// Drain all pending events.
    pub fn drain_events(&mut self) -> Vec<ResearchEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn pending_events(&self) -> &[ResearchEvent] {
        &self.events
    }

    // -- Internal helpers --

    fn complete(&mut self, tree: &TechTree, tech: &Technology) {
        let before = self.age_index(tree);

        self.completed.insert(tech.key.clone());
        self.progress.remove(&tech.key);
        if self.current.as_deref() == Some(tech.key.as_str()) {
            self.current = None;
        }

        tracing::debug!(tech = %tech.key, "research completed");
        self.events.push(ResearchEvent::Completed {
            tech: tech.key.clone(),
            age: tech.age.clone(),
        });

        let after = self.age_index(tree);
        if after > before
            && let Some(age) = after.map(|i| &tree.ages()[i])
        {
            self.events.push(ResearchEvent::AgeEntered {
                age: age.key.clone(),
            });
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
