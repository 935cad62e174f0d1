//! Data-driven rulesets for the Epoch civilization engine.
//!
//! A ruleset directory holds one file per content kind, each in RON, TOML or
//! JSON (detected from the extension):
//!
//! | File           | Required | Contents                           |
//! |----------------|----------|------------------------------------|
//! | `ages`         | yes      | ages in chronological order        |
//! | `technologies` | yes      | technologies and prerequisites     |
//! | `terrains`     | no       | terrain types and base yields      |
//! | `improvements` | no       | tile improvements                  |
//! | `resources`    | no       | map resources                      |
//! | `policies`     | no       | empire-wide yield modifiers        |
//!
//! [`load_ruleset`] reads and cross-checks them into a [`Ruleset`];
//! [`builtin::ruleset`] builds the standard ruleset without touching disk.

pub mod builtin;
pub mod loader;
pub mod ruleset;
pub mod schema;

pub use loader::{DataLoadError, load_ruleset};
pub use ruleset::{Improvement, Policy, Resource, Ruleset, RulesetError, Terrain, TileSpec};
