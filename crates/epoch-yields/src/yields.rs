use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::YieldError;
use crate::category::YieldCategory;

// ---------------------------------------------------------------------------
// Combination mode
// ---------------------------------------------------------------------------

/// How a [`Yields`] instance is meant to be combined with others.
///
/// This is metadata for whoever assembles a modifier stack; the arithmetic
/// methods on [`Yields`] never look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldMode {
    /// A starting amount (terrain, city center).
    #[default]
    Base,
    /// Flat bonus summed onto the base.
    Additive,
    /// Fractional bonus that compounds with other cumulative bonuses.
    PercentageCumulative,
    /// Fractional bonus that sums with other additive percentages.
    PercentageAdditive,
}

/// Values of the `other` operand that `multiply`/`divide` treat as "no change".
///
/// Note that 0.0 is included: a zero modifier leaves the category alone rather
/// than zeroing it.
#[inline]
fn is_scale_sentinel(v: f64) -> bool {
    v == 0.0 || v == 1.0 || v == -1.0
}

// ---------------------------------------------------------------------------
// Yields
// ---------------------------------------------------------------------------

/// A multi-category resource amount.
///
/// Primary categories are always present. Mechanic and great-person categories
/// become present once set, and binary operations only combine them when both
/// operands carry them. Absent categories read as `0.0`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "YieldsRecord", from = "YieldsRecord")]
pub struct Yields {
    values: [f64; YieldCategory::COUNT],

    /// Presence bits for non-primary categories, indexed by `YieldCategory::index`.
    present: u32,

    /// How this instance is meant to be combined.
    pub mode: YieldMode,

    /// Free-form provenance label, e.g. the improvement that produced it.
    pub name: Option<String>,
}

impl Yields {
    /// An all-zero record in the given mode.
    pub fn new(mode: YieldMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// The additive identity: every primary category zero, no extras.
    pub fn null() -> Self {
        Self::new(YieldMode::Additive)
    }

    /// A default-constructed base record.
    pub fn base() -> Self {
        Self::default()
    }

    /// Builder: set `category` to `value`.
    pub fn with(mut self, category: YieldCategory, value: f64) -> Self {
        self.set(category, value);
        self
    }

    /// Builder: attach a provenance label.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder: change the combination mode.
    pub fn with_mode(mut self, mode: YieldMode) -> Self {
        self.mode = mode;
        self
    }

    /// Build a record from `(category name, amount)` pairs. Fails on the first
    /// unrecognized name.
    pub fn from_pairs<'a, I>(mode: YieldMode, pairs: I) -> Result<Self, YieldError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut yields = Self::new(mode);
        yields.set_props(pairs)?;
        Ok(yields)
    }

    // -- Accessors --

    /// Amount for `category`; `0.0` if the category is absent.
    #[inline]
    pub fn get(&self, category: YieldCategory) -> f64 {
        self.values[category.index()]
    }

    /// Set `category`, marking non-primary categories present.
    pub fn set(&mut self, category: YieldCategory, value: f64) {
        self.values[category.index()] = value;
        if !category.is_primary() {
            self.present |= category.bit();
        }
    }

    /// Zero `category` and drop it from the present set.
    pub fn clear(&mut self, category: YieldCategory) {
        self.values[category.index()] = 0.0;
        if !category.is_primary() {
            self.present &= !category.bit();
        }
    }

    /// Whether `category` takes part in arithmetic on this record.
    #[inline]
    pub fn is_present(&self, category: YieldCategory) -> bool {
        category.is_primary() || self.present & category.bit() != 0
    }

    /// String-keyed read.
    pub fn get_prop(&self, name: &str) -> Result<f64, YieldError> {
        let category: YieldCategory = name.parse()?;
        Ok(self.get(category))
    }

    /// String-keyed write.
    pub fn set_prop(&mut self, name: &str, value: f64) -> Result<(), YieldError> {
        let category: YieldCategory = name.parse()?;
        self.set(category, value);
        Ok(())
    }

    /// Write several string-keyed values. Every name is checked before any
    /// value is written, so an error leaves `self` untouched.
    pub fn set_props<'a, I>(&mut self, pairs: I) -> Result<(), YieldError>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let resolved = pairs
            .into_iter()
            .map(|(name, value)| Ok((name.parse::<YieldCategory>()?, value)))
            .collect::<Result<Vec<_>, YieldError>>()?;
        for (category, value) in resolved {
            self.set(category, value);
        }
        Ok(())
    }

    /// Present categories and their amounts, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (YieldCategory, f64)> + '_ {
        YieldCategory::ALL
            .into_iter()
            .filter(|c| self.is_present(*c))
            .map(|c| (c, self.get(c)))
    }

    /// Apply `op(self[c], other[c])` to every category present on both sides.
    fn combine_with(&mut self, other: &Yields, op: impl Fn(f64, f64) -> f64) -> &mut Self {
        for c in YieldCategory::ALL {
            if self.is_present(c) && other.is_present(c) {
                let i = c.index();
                self.values[i] = op(self.values[i], other.values[i]);
            }
        }
        self
    }

    // -- Arithmetic --

    /// `self[c] += other[c]` for every shared category.
    pub fn add(&mut self, other: &Yields) -> &mut Self {
        self.combine_with(other, |a, b| a + b)
    }

    /// `self[c] -= other[c]` for every shared category.
    pub fn subtract(&mut self, other: &Yields) -> &mut Self {
        self.combine_with(other, |a, b| a - b)
    }

    /// `self[c] *= other[c]`, skipping categories where `other[c]` is
    /// `0.0`, `1.0` or `-1.0`.
    pub fn multiply(&mut self, other: &Yields) -> &mut Self {
        self.combine_with(other, |a, b| if is_scale_sentinel(b) { a } else { a * b })
    }

    /// `self[c] /= other[c]` with the same sentinel skip as [`Yields::multiply`],
    /// which also keeps division by zero out.
    pub fn divide(&mut self, other: &Yields) -> &mut Self {
        self.combine_with(other, |a, b| if is_scale_sentinel(b) { a } else { a / b })
    }

    /// Resolve this record as a base yield against its modifiers:
    ///
    /// `round((base + additive) * (1 + percentage_add) * (1 + percentage_cum))`
    ///
    /// per present category. `None` stands for the null yield. Rounding is
    /// half-to-even and happens once, after all three stages.
    pub fn calculate(
        &mut self,
        additive: Option<&Yields>,
        percentage_add: Option<&Yields>,
        percentage_cum: Option<&Yields>,
    ) -> &mut Self {
        let read = |y: Option<&Yields>, c: YieldCategory| y.map_or(0.0, |y| y.get(c));

        let mut resolved = self.values;
        for c in YieldCategory::ALL {
            if !self.is_present(c) {
                continue;
            }
            let flat = self.get(c) + read(additive, c);
            let scaled = flat * (1.0 + read(percentage_add, c)) * (1.0 + read(percentage_cum, c));
            resolved[c.index()] = scaled.round_ties_even();
        }
        self.values = resolved;
        self
    }

    // -- Projections --

    /// Sum of the primary categories. This is the ordering key.
    pub fn total_value(&self) -> f64 {
        YieldCategory::PRIMARY.iter().map(|c| self.get(*c)).sum()
    }

    /// A new record holding only `categories` (everything else zero/absent).
    /// Mode and provenance are carried over.
    pub fn only(&self, categories: &[YieldCategory]) -> Yields {
        let mut projected = Yields::new(self.mode);
        projected.name = self.name.clone();
        for c in categories {
            if self.is_present(*c) {
                projected.set(*c, self.get(*c));
            }
        }
        projected
    }

    /// Category-by-category equality, unlike `==` which compares totals.
    pub fn same_values(&self, other: &Yields) -> bool {
        self.present == other.present && self.values == other.values
    }

    /// Whether every present category is zero.
    pub fn is_zero(&self) -> bool {
        self.iter().all(|(_, v)| v == 0.0)
    }
}

// ---------------------------------------------------------------------------
// Persisted form
// ---------------------------------------------------------------------------

/// Serialized shape of [`Yields`]: amounts keyed by category name.
///
/// Zero primary amounts are left out. Present extras are always written, so
/// presence survives a round trip.
#[derive(Serialize, Deserialize)]
struct YieldsRecord {
    #[serde(default)]
    mode: YieldMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    amounts: BTreeMap<YieldCategory, f64>,
}

impl From<Yields> for YieldsRecord {
    fn from(y: Yields) -> Self {
        let amounts = y
            .iter()
            .filter(|&(c, v)| !c.is_primary() || v != 0.0)
            .collect();
        YieldsRecord {
            mode: y.mode,
            name: y.name,
            amounts,
        }
    }
}

impl From<YieldsRecord> for Yields {
    fn from(r: YieldsRecord) -> Self {
        let mut y = Yields::new(r.mode);
        y.name = r.name;
        for (c, v) in r.amounts {
            y.set(c, v);
        }
        y
    }
}

// ---------------------------------------------------------------------------
// Comparison by magnitude
// ---------------------------------------------------------------------------

impl PartialEq for Yields {
    fn eq(&self, other: &Self) -> bool {
        self.total_value() == other.total_value()
    }
}

impl PartialOrd for Yields {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.total_value().partial_cmp(&other.total_value())
    }
}

// ---------------------------------------------------------------------------
// Operator sugar
// ---------------------------------------------------------------------------

impl std::ops::Add for Yields {
    type Output = Yields;

    fn add(mut self, rhs: Yields) -> Yields {
        Yields::add(&mut self, &rhs);
        self
    }
}

impl std::ops::Sub for Yields {
    type Output = Yields;

    fn sub(mut self, rhs: Yields) -> Yields {
        self.subtract(&rhs);
        self
    }
}

impl std::ops::Mul for Yields {
    type Output = Yields;

    fn mul(mut self, rhs: Yields) -> Yields {
        self.multiply(&rhs);
        self
    }
}

impl std::ops::Div for Yields {
    type Output = Yields;

    fn div(mut self, rhs: Yields) -> Yields {
        self.divide(&rhs);
        self
    }
}

impl std::ops::AddAssign<&Yields> for Yields {
    fn add_assign(&mut self, rhs: &Yields) {
        Yields::add(self, rhs);
    }
}

impl std::ops::SubAssign<&Yields> for Yields {
    fn sub_assign(&mut self, rhs: &Yields) {
        self.subtract(rhs);
    }
}

impl std::ops::MulAssign<&Yields> for Yields {
    fn mul_assign(&mut self, rhs: &Yields) {
        self.multiply(rhs);
    }
}

impl std::ops::DivAssign<&Yields> for Yields {
    fn div_assign(&mut self, rhs: &Yields) {
        self.divide(rhs);
    }
}

impl fmt::Display for Yields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{name}: ")?;
        }
        let mut first = true;
        for (category, value) in self.iter().filter(|(_, v)| *v != 0.0) {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{category} {value}")?;
            first = false;
        }
        if first {
            f.write_str("nothing")?;
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use YieldCategory::*;

    fn gold(v: f64) -> Yields {
        Yields::base().with(Gold, v)
    }

    // -----------------------------------------------------------------------
    // add / subtract
    // -----------------------------------------------------------------------

    #[test]
    fn add_accumulates_sources() {
        let mut farm = Yields::base().with(Food, 1.0).named("farm");
        let granary = Yields::new(YieldMode::Additive).with(Food, 1.0);
        farm.add(&granary);
        assert_eq!(farm.get(Food), 2.0);
        assert_eq!(farm.name.as_deref(), Some("farm"));
    }

    #[test]
    fn subtract_goes_negative() {
        let mut y = gold(3.0);
        y.subtract(&gold(5.0));
        assert_eq!(y.get(Gold), -2.0);
    }

    #[test]
    fn extras_only_combine_when_both_present() {
        let mut a = gold(1.0).with(Contentment, 2.0);
        let b = gold(1.0).with(Contentment, 3.0).with(GreatArtist, 4.0);
        a.add(&b);
        assert_eq!(a.get(Contentment), 5.0);
        assert!(!a.is_present(GreatArtist));
        assert_eq!(a.get(GreatArtist), 0.0);

        let mut c = gold(1.0);
        c.add(&b);
        assert!(!c.is_present(Contentment));
        assert_eq!(c.get(Gold), 2.0);
    }

    // -----------------------------------------------------------------------
    // multiply / divide
    // -----------------------------------------------------------------------

    #[test]
    fn multiply_skips_sentinels() {
        for sentinel in [0.0, 1.0, -1.0] {
            let mut y = gold(10.0);
            y.multiply(&gold(sentinel));
            assert_eq!(y.get(Gold), 10.0, "sentinel {sentinel}");
        }
        let mut y = gold(10.0);
        y.multiply(&gold(2.0));
        assert_eq!(y.get(Gold), 20.0);
    }

    #[test]
    fn multiply_untouched_categories_survive_zero_modifier() {
        let mut y = gold(4.0).with(Food, 3.0);
        y.multiply(&Yields::base().with(Food, 0.5));
        assert_eq!(y.get(Gold), 4.0);
        assert_eq!(y.get(Food), 1.5);
    }

    #[test]
    fn divide_guards_zero() {
        let mut y = gold(10.0);
        y.divide(&gold(0.0));
        assert_eq!(y.get(Gold), 10.0);
        y.divide(&gold(4.0));
        assert_eq!(y.get(Gold), 2.5);
    }

    // -----------------------------------------------------------------------
    // calculate
    // -----------------------------------------------------------------------

    #[test]
    fn calculate_rounds_half_to_even_once() {
        let mut y = gold(10.0);
        y.calculate(Some(&gold(5.0)), Some(&gold(0.5)), None);
        assert_eq!(y.get(Gold), 22.0);
    }

    #[test]
    fn calculate_does_not_round_between_stages() {
        // 2.5 * 1.5 * 1.5 = 5.625. Rounding after each stage would give 4.
        let mut y = gold(2.5);
        y.calculate(None, Some(&gold(0.5)), Some(&gold(0.5)));
        assert_eq!(y.get(Gold), 6.0);

        // (1 + 0.5) * 1.5 = 2.25. Rounding after each stage would give 3.
        let mut w = gold(1.0);
        w.calculate(Some(&gold(0.5)), Some(&gold(0.5)), None);
        assert_eq!(w.get(Gold), 2.0);
    }

    #[test]
    fn calculate_all_stages() {
        let mut y = Yields::base().with(Food, 4.0).with(Production, 2.0);
        let additive = Yields::null().with(Food, 2.0);
        let pct_add = Yields::null().with(Production, 0.25);
        let pct_cum = Yields::null().with(Food, 0.1).with(Production, 1.0);
        y.calculate(Some(&additive), Some(&pct_add), Some(&pct_cum));
        // food: 6 * 1 * 1.1 = 6.6 -> 7; production: 2 * 1.25 * 2 = 5
        assert_eq!(y.get(Food), 7.0);
        assert_eq!(y.get(Production), 5.0);
    }

    #[test]
    fn calculate_with_no_modifiers_only_rounds() {
        let mut y = gold(2.5).with(Science, 3.5);
        y.calculate(None, None, None);
        assert_eq!(y.get(Gold), 2.0);
        assert_eq!(y.get(Science), 4.0);
    }

    #[test]
    fn calculate_touches_present_extras() {
        let mut y = Yields::base().with(Stability, 2.0);
        y.calculate(Some(&Yields::null().with(Stability, 1.0)), None, None);
        assert_eq!(y.get(Stability), 3.0);
        assert!(!y.is_present(Anger));
    }

    // -----------------------------------------------------------------------
    // clone / only / comparison
    // -----------------------------------------------------------------------

    #[test]
    fn clone_is_independent() {
        let original = gold(10.0);
        let mut copy = original.clone();
        copy.multiply(&gold(3.0));
        assert_eq!(original.get(Gold), 10.0);
        assert_eq!(copy.get(Gold), 30.0);
    }

    #[test]
    fn only_projects_and_keeps_provenance() {
        let y = Yields::base()
            .with(Gold, 2.0)
            .with(Food, 3.0)
            .with(Anger, 1.0)
            .named("oasis");
        let food = y.only(&[Food, Anger]);
        assert_eq!(food.get(Food), 3.0);
        assert_eq!(food.get(Gold), 0.0);
        assert_eq!(food.get(Anger), 1.0);
        assert_eq!(food.name.as_deref(), Some("oasis"));
        assert_eq!(y.get(Gold), 2.0);
    }

    #[test]
    fn equality_is_by_total() {
        let a = gold(3.0);
        let b = Yields::base().with(Food, 1.0).with(Science, 2.0);
        assert_eq!(a, b);
        assert!(!a.same_values(&b));
        assert!(gold(4.0) > b);
    }

    #[test]
    fn total_ignores_extras() {
        let y = gold(1.0).with(GreatHero, 100.0).with(Revolt, 5.0);
        assert_eq!(y.total_value(), 1.0);
    }

    #[test]
    fn null_is_additive_identity() {
        let x = Yields::base().with(Gold, 2.5).with(Faith, -1.0);
        let mut n = Yields::null();
        n.add(&x);
        assert_eq!(n, x);
        assert!(Yields::base().is_zero());
    }

    // -----------------------------------------------------------------------
    // String-keyed access
    // -----------------------------------------------------------------------

    #[test]
    fn props_round_trip() {
        let mut y = Yields::base();
        y.set_prop("housing", 2.0).unwrap();
        assert_eq!(y.get_prop("housing").unwrap(), 2.0);
        assert!(matches!(
            y.get_prop("mana"),
            Err(YieldError::InvalidCategory(_))
        ));
    }

    #[test]
    fn set_props_is_atomic() {
        let mut y = gold(1.0);
        let result = y.set_props([("gold", 5.0), ("mana", 1.0)]);
        assert!(result.is_err());
        assert_eq!(y.get(Gold), 1.0);
    }

    #[test]
    fn from_pairs_builds_record() {
        let y = Yields::from_pairs(YieldMode::Additive, [("food", 1.0), ("great_holy", 2.0)])
            .unwrap();
        assert_eq!(y.mode, YieldMode::Additive);
        assert_eq!(y.get(Food), 1.0);
        assert!(y.is_present(GreatHoly));
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    #[test]
    fn operators_match_named_methods() {
        let sum = gold(2.0) + gold(3.0);
        assert_eq!(sum.get(Gold), 5.0);
        let diff = gold(2.0) - gold(3.0);
        assert_eq!(diff.get(Gold), -1.0);
        let product = gold(2.0) * gold(1.0);
        assert_eq!(product.get(Gold), 2.0);
        let quotient = gold(9.0) / gold(3.0);
        assert_eq!(quotient.get(Gold), 3.0);

        let mut y = gold(1.0);
        y += &gold(1.0);
        y *= &gold(4.0);
        y -= &gold(2.0);
        y /= &gold(2.0);
        assert_eq!(y.get(Gold), 3.0);
    }

    #[test]
    fn display_lists_nonzero() {
        let y = Yields::base().with(Food, 2.0).named("farm");
        assert_eq!(y.to_string(), "farm: food 2");
        assert_eq!(Yields::null().to_string(), "nothing");
    }

    #[test]
    fn serializes_as_named_amounts() {
        let y = Yields::base()
            .with(Food, 2.0)
            .with(Contentment, 0.0)
            .named("grassland");
        let json = serde_json::to_value(&y).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mode": "base",
                "name": "grassland",
                "amounts": { "food": 2.0, "contentment": 0.0 }
            })
        );

        let back: Yields = serde_json::from_value(json).unwrap();
        assert!(back.same_values(&y));
        assert!(back.is_present(Contentment));
        assert!(!back.is_present(Anger));
        assert_eq!(back.name.as_deref(), Some("grassland"));
    }

    #[test]
    fn deserialize_rejects_unknown_category() {
        let result: Result<Yields, _> =
            serde_json::from_str(r#"{"mode": "additive", "amounts": {"mana": 1.0}}"#);
        assert!(result.is_err());

        let y: Yields = serde_json::from_str(r#"{"amounts": {"gold": 3.0}}"#).unwrap();
        assert_eq!(y.mode, YieldMode::Base);
        assert_eq!(y.get(Gold), 3.0);
    }
}
