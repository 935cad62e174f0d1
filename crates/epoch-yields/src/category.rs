use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::YieldError;

// ---------------------------------------------------------------------------
// Category groups
// ---------------------------------------------------------------------------

/// Which family a yield category belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryGroup {
    /// User-facing resources shown on tiles and cities.
    Primary,
    /// Derived happiness/stability mechanics.
    Mechanic,
    /// Great person point accumulators.
    GreatPerson,
}

// ---------------------------------------------------------------------------
// YieldCategory
// ---------------------------------------------------------------------------

/// The closed set of categories a [`crate::Yields`] record carries.
///
/// The discriminant doubles as the storage index, so the order here is the
/// order values are laid out in memory and iterated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YieldCategory {
    Gold,
    Production,
    Science,
    Food,
    Culture,
    Housing,
    Faith,

    Contentment,
    Anger,
    Revolt,
    Stability,

    GreatScience,
    GreatProduction,
    GreatArtist,
    GreatMilitary,
    GreatCommerce,
    GreatHero,
    GreatHoly,
}

impl YieldCategory {
    /// Number of categories.
    pub const COUNT: usize = 18;

    /// Every category, in storage order.
    pub const ALL: [YieldCategory; Self::COUNT] = [
        YieldCategory::Gold,
        YieldCategory::Production,
        YieldCategory::Science,
        YieldCategory::Food,
        YieldCategory::Culture,
        YieldCategory::Housing,
        YieldCategory::Faith,
        YieldCategory::Contentment,
        YieldCategory::Anger,
        YieldCategory::Revolt,
        YieldCategory::Stability,
        YieldCategory::GreatScience,
        YieldCategory::GreatProduction,
        YieldCategory::GreatArtist,
        YieldCategory::GreatMilitary,
        YieldCategory::GreatCommerce,
        YieldCategory::GreatHero,
        YieldCategory::GreatHoly,
    ];

    /// The primary (calculatable, user-facing) categories.
    pub const PRIMARY: [YieldCategory; 7] = [
        YieldCategory::Gold,
        YieldCategory::Production,
        YieldCategory::Science,
        YieldCategory::Food,
        YieldCategory::Culture,
        YieldCategory::Housing,
        YieldCategory::Faith,
    ];

    /// Storage index of this category.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The family this category belongs to.
    pub fn group(self) -> CategoryGroup {
        match self {
            YieldCategory::Gold
            | YieldCategory::Production
            | YieldCategory::Science
            | YieldCategory::Food
            | YieldCategory::Culture
            | YieldCategory::Housing
            | YieldCategory::Faith => CategoryGroup::Primary,
            YieldCategory::Contentment
            | YieldCategory::Anger
            | YieldCategory::Revolt
            | YieldCategory::Stability => CategoryGroup::Mechanic,
            YieldCategory::GreatScience
            | YieldCategory::GreatProduction
            | YieldCategory::GreatArtist
            | YieldCategory::GreatMilitary
            | YieldCategory::GreatCommerce
            | YieldCategory::GreatHero
            | YieldCategory::GreatHoly => CategoryGroup::GreatPerson,
        }
    }

    /// Whether this is one of the primary categories.
    #[inline]
    pub fn is_primary(self) -> bool {
        self.group() == CategoryGroup::Primary
    }

    /// The snake_case name used in data files and string-keyed access.
    pub fn name(self) -> &'static str {
        match self {
            YieldCategory::Gold => "gold",
            YieldCategory::Production => "production",
            YieldCategory::Science => "science",
            YieldCategory::Food => "food",
            YieldCategory::Culture => "culture",
            YieldCategory::Housing => "housing",
            YieldCategory::Faith => "faith",
            YieldCategory::Contentment => "contentment",
            YieldCategory::Anger => "anger",
            YieldCategory::Revolt => "revolt",
            YieldCategory::Stability => "stability",
            YieldCategory::GreatScience => "great_science",
            YieldCategory::GreatProduction => "great_production",
            YieldCategory::GreatArtist => "great_artist",
            YieldCategory::GreatMilitary => "great_military",
            YieldCategory::GreatCommerce => "great_commerce",
            YieldCategory::GreatHero => "great_hero",
            YieldCategory::GreatHoly => "great_holy",
        }
    }

    /// Bit used in the presence mask of non-primary categories.
    #[inline]
    pub(crate) fn bit(self) -> u32 {
        1 << self.index()
    }
}

impl fmt::Display for YieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for YieldCategory {
    type Err = YieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        YieldCategory::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| YieldError::InvalidCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_order_matches_all() {
        for (i, category) in YieldCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn names_parse_back() {
        for category in YieldCategory::ALL {
            assert_eq!(category.name().parse::<YieldCategory>().unwrap(), category);
        }
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = "mana".parse::<YieldCategory>().unwrap_err();
        assert!(matches!(err, YieldError::InvalidCategory(ref name) if name == "mana"));
    }

    #[test]
    fn groups() {
        assert!(YieldCategory::Faith.is_primary());
        assert_eq!(YieldCategory::Revolt.group(), CategoryGroup::Mechanic);
        assert_eq!(YieldCategory::GreatHoly.group(), CategoryGroup::GreatPerson);
        assert!(YieldCategory::PRIMARY.iter().all(|c| c.is_primary()));
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&YieldCategory::GreatArtist).unwrap();
        assert_eq!(json, "\"great_artist\"");
    }
}
