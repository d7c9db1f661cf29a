use crate::config::ResolutionConfig;
use crate::core::constraints::{Category, CulturalConstraints};
use crate::core::signals::Signals;
use std::time::Duration;

/// Computes an adaptive cache lifetime for a resolved constraint set.
///
/// Three factors scale the base TTL:
/// - quality: denser result sets are trusted longer;
/// - location: a sub-region separator (comma-delimited city + region) marks
///   a more specific audience, worth caching longer;
/// - age: narrower requested age ranges cache longer.
///
/// Monotone in density — holding location and age fixed, more items never
/// yields a shorter TTL.
pub struct TtlPlanner {
    base_ttl: Duration,
    target_items_per_category: usize,
}

const QUALITY_FACTOR_MIN: f64 = 0.5;
const QUALITY_FACTOR_MAX: f64 = 2.0;
const SUBREGION_LOCATION_FACTOR: f64 = 1.5;
const AGE_FACTOR_MIN: f64 = 0.8;
const AGE_FACTOR_MAX: f64 = 2.0;
const AGE_WIDTH_SCALE: f64 = 20.0;

impl TtlPlanner {
    #[must_use]
    pub fn new(config: &ResolutionConfig) -> Self {
        Self {
            base_ttl: config.base_ttl(),
            target_items_per_category: config.target_items_per_category.max(1),
        }
    }

    #[must_use]
    pub fn compute(&self, signals: &Signals, constraints: &CulturalConstraints) -> Duration {
        let quality = self.quality_factor(constraints);
        let location = location_factor(&signals.demographics.location);
        let age = age_factor(signals.demographics.age.width());

        let millis = (self.base_ttl.as_millis() as f64 * quality * location * age).round();
        Duration::from_millis(millis as u64)
    }

    fn quality_factor(&self, constraints: &CulturalConstraints) -> f64 {
        let target = (Category::COUNT * self.target_items_per_category) as f64;
        let density = constraints.total_items() as f64 / target;
        density.clamp(QUALITY_FACTOR_MIN, QUALITY_FACTOR_MAX)
    }
}

fn location_factor(location: &str) -> f64 {
    if location.contains(',') {
        SUBREGION_LOCATION_FACTOR
    } else {
        1.0
    }
}

fn age_factor(width: u32) -> f64 {
    (2.0 - f64::from(width) / AGE_WIDTH_SCALE).clamp(AGE_FACTOR_MIN, AGE_FACTOR_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signals::{RawSignals, validate};

    fn signals(location: &str, age_min: u32, age_max: u32) -> Signals {
        validate(&RawSignals {
            age_min,
            age_max,
            location: location.into(),
            language: "en".into(),
            persona_count: 2,
            ..RawSignals::default()
        })
        .expect("valid")
    }

    fn constraints_with(total: usize) -> CulturalConstraints {
        let mut constraints = CulturalConstraints::new();
        let items: Vec<String> = (0..total).map(|i| format!("item-{i}")).collect();
        for (i, chunk) in items.chunks(3.max(total / Category::COUNT + 1)).enumerate() {
            let category = Category::all().nth(i % Category::COUNT).unwrap();
            constraints.extend_category(category, chunk.iter().cloned());
        }
        constraints
    }

    fn planner() -> TtlPlanner {
        TtlPlanner::new(&ResolutionConfig::default())
    }

    #[test]
    fn full_density_paris_narrow_range_exceeds_base() {
        // 33 items at target density: quality 1.0, location 1.5, age 1.5.
        let sig = signals("Paris, France", 25, 35);
        let mut constraints = CulturalConstraints::new();
        for category in Category::all() {
            constraints
                .extend_category(category, (0..3).map(|i| format!("{category}-{i}")));
        }
        let ttl = planner().compute(&sig, &constraints);
        let base = ResolutionConfig::default().base_ttl();
        assert_eq!(ttl, Duration::from_millis((base.as_millis() as f64 * 2.25) as u64));
        assert!(ttl > base);
    }

    #[test]
    fn density_is_monotone() {
        let sig = signals("Berlin", 25, 45);
        let planner = planner();
        let mut previous = Duration::ZERO;
        for total in [0, 5, 11, 22, 33, 50, 90] {
            let ttl = planner.compute(&sig, &constraints_with(total));
            assert!(ttl >= previous, "ttl shrank at {total} items");
            previous = ttl;
        }
    }

    #[test]
    fn quality_clamps_both_ends() {
        let sig = signals("Berlin", 25, 65);
        let planner = planner();
        let empty = planner.compute(&sig, &CulturalConstraints::new());
        let flooded = planner.compute(&sig, &constraints_with(500));
        // age width 40 -> factor clamped to 0.8 exactly; quality 0.5 vs 2.0
        let base_ms = ResolutionConfig::default().base_ttl().as_millis() as f64;
        assert_eq!(empty, Duration::from_millis((base_ms * 0.5 * 0.8) as u64));
        assert_eq!(flooded, Duration::from_millis((base_ms * 2.0 * 0.8) as u64));
    }

    #[test]
    fn plain_location_gets_no_boost() {
        let with_region = signals("Lyon, France", 25, 35);
        let without = signals("Lyon", 25, 35);
        let constraints = constraints_with(33);
        let planner = planner();
        let boosted = planner.compute(&with_region, &constraints);
        let plain = planner.compute(&without, &constraints);
        assert!(boosted > plain);
    }

    #[test]
    fn narrow_age_range_caches_longer() {
        let narrow = signals("Lyon", 30, 34);
        let wide = signals("Lyon", 18, 65);
        let constraints = constraints_with(33);
        let planner = planner();
        assert!(planner.compute(&narrow, &constraints) > planner.compute(&wide, &constraints));
    }
}
