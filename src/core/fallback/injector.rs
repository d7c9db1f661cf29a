use super::catalog::FallbackCatalog;
use crate::config::FallbackConfig;
use crate::core::constraints::{Category, CulturalConstraints};
use crate::core::signals::Signals;

/// Tops up under-populated categories from the static catalog after batch
/// execution.
pub struct FallbackInjector {
    per_category_cap: usize,
}

impl FallbackInjector {
    #[must_use]
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            per_category_cap: config.per_category_cap,
        }
    }

    /// Minimum acceptable item count per category for a given persona count.
    #[must_use]
    pub fn min_items_per_category(persona_count: u8) -> usize {
        usize::from(persona_count).div_ceil(2).max(2)
    }

    /// Walk categories in marketing-relevance order and append catalog items
    /// to any category below the minimum, skipping duplicates, until the
    /// minimum is met or the category hits the hard cap. Existing items are
    /// never removed.
    pub fn inject(&self, constraints: &mut CulturalConstraints, signals: &Signals) {
        let min_items = Self::min_items_per_category(signals.cultural_context.persona_count);
        let age = signals.demographics.age;

        for category in Category::all() {
            let have = constraints.items(category).len();
            if have >= min_items {
                continue;
            }

            let mut injected = 0usize;
            for candidate in FallbackCatalog::items_for(category, age) {
                let len = constraints.items(category).len();
                if len >= min_items || len >= self.per_category_cap {
                    break;
                }
                if constraints.items(category).iter().any(|i| i == candidate) {
                    continue;
                }
                constraints.extend_category(category, [(*candidate).to_string()]);
                injected += 1;
            }

            if injected > 0 {
                tracing::debug!(
                    category = %category,
                    injected,
                    total = constraints.items(category).len(),
                    "fallback.inject"
                );
            }
        }
    }
}
