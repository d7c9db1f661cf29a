use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumIter, IntoEnumIterator};

// Category — the fixed cultural taxonomy (exactly 11, no more).
//
// Declaration order is marketing-relevance order: core taste categories,
// then lifestyle, then affinity. The batch scheduler's tie break and the
// fallback injector's iteration both follow it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
    Music,
    Film,
    Television,
    Books,
    Podcasts,
    Brands,
    Dining,
    Travel,
    Fashion,
    Wellness,
    SocialPlatforms,
}

impl Category {
    pub const COUNT: usize = 11;

    /// All categories in marketing-relevance order.
    pub fn all() -> impl Iterator<Item = Category> {
        Category::iter()
    }

    /// Scheduling weight. Taste/brand signals are the strongest persona
    /// predictors and get serviced first when workers are scarce.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Music => 100,
            Self::Film => 95,
            Self::Television => 90,
            Self::Books => 85,
            Self::Podcasts => 80,
            Self::Brands => 75,
            Self::Dining => 60,
            Self::Travel => 55,
            Self::Fashion => 50,
            Self::Wellness => 45,
            Self::SocialPlatforms => 30,
        }
    }

    /// Upstream entity URN for the Qloo insights endpoint.
    #[must_use]
    pub fn entity_urn(self) -> &'static str {
        match self {
            Self::Music => "urn:entity:artist",
            Self::Film => "urn:entity:movie",
            Self::Television => "urn:entity:tv_show",
            Self::Books => "urn:entity:book",
            Self::Podcasts => "urn:entity:podcast",
            Self::Brands => "urn:entity:brand",
            Self::Dining => "urn:entity:place:restaurant",
            Self::Travel => "urn:entity:destination",
            Self::Fashion => "urn:entity:brand:fashion",
            Self::Wellness => "urn:entity:place:fitness",
            Self::SocialPlatforms => "urn:entity:social_platform",
        }
    }
}

/// Per-category item lists returned to the caller.
///
/// All 11 keys are always present; empty lists exist only while a resolution
/// is still merging. Item order is preserved and duplicates are dropped on
/// insert. `BTreeMap` keeps serialized key order stable for dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CulturalConstraints {
    items: BTreeMap<Category, Vec<String>>,
}

impl CulturalConstraints {
    #[must_use]
    pub fn new() -> Self {
        let mut items = BTreeMap::new();
        for category in Category::all() {
            items.insert(category, Vec::new());
        }
        Self { items }
    }

    /// Append items to a category, skipping ones already present.
    pub fn extend_category<I>(&mut self, category: Category, new_items: I)
    where
        I: IntoIterator<Item = String>,
    {
        let list = self.items.entry(category).or_default();
        for item in new_items {
            if list.iter().any(|existing| existing == &item) {
                continue;
            }
            list.push(item);
        }
    }

    #[must_use]
    pub fn items(&self, category: Category) -> &[String] {
        self.items.get(&category).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, &[String])> {
        self.items.iter().map(|(cat, list)| (*cat, list.as_slice()))
    }

    #[must_use]
    pub fn category_count(&self) -> usize {
        self.items.len()
    }
}

impl Default for CulturalConstraints {
    fn default() -> Self {
        Self::new()
    }
}
