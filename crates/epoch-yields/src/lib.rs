//! Yield algebra for the Epoch civilization engine.
//!
//! A [`Yields`] record holds per-category resource amounts (gold, food,
//! science, ...) as real numbers. Records from different sources are combined
//! with [`Yields::add`], [`Yields::subtract`], [`Yields::multiply`] and
//! [`Yields::divide`], and a tile's final output is produced by
//! [`Yields::calculate`]:
//!
//! ```text
//! final = round_half_even((base + additive) * (1 + pct_add) * (1 + pct_cum))
//! ```
//!
//! Amounts stay fractional through every stage and are rounded exactly once.
//!
//! # Categories
//!
//! [`YieldCategory`] is a closed set of 18 categories in three groups:
//! primary (always present), mechanic, and great-person (present only once
//! set). String names are parsed with [`std::str::FromStr`] and unknown names
//! fail with [`YieldError::InvalidCategory`].
//!
//! # Modifier stacks
//!
//! [`YieldStack`] gathers contributions from many sources, sorts them into
//! stages by [`YieldMode`], and resolves them into one record. With the
//! `parallel` feature, [`resolve_all`] fans out across tiles with rayon.

pub mod category;
pub mod stack;
pub mod yields;

pub use category::{CategoryGroup, YieldCategory};
pub use stack::{YieldStack, resolve_all};
pub use yields::{YieldMode, Yields};

/// Errors raised by string-keyed yield access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum YieldError {
    #[error("unknown yield category: {0:?}")]
    InvalidCategory(String),
}
