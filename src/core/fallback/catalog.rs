use crate::core::constraints::Category;
use crate::core::signals::AgeRange;

/// Static per-category default item lists, consulted when the live fetch
/// path leaves a category under-populated.
///
/// Entries are broadly recognizable, ordered by mainstream reach so the
/// injector's prefix-take stays sensible. Social platforms are special-cased
/// by age bracket (see `social_platforms_for_age`).
pub struct FallbackCatalog;

const MUSIC: [&str; 5] = [
    "Taylor Swift",
    "Drake",
    "Bad Bunny",
    "The Weeknd",
    "Billie Eilish",
];
const FILM: [&str; 5] = [
    "Oppenheimer",
    "Barbie",
    "Dune: Part Two",
    "Everything Everywhere All at Once",
    "Top Gun: Maverick",
];
const TELEVISION: [&str; 5] = [
    "Stranger Things",
    "The Bear",
    "Succession",
    "The Last of Us",
    "Ted Lasso",
];
const BOOKS: [&str; 5] = [
    "Atomic Habits",
    "Fourth Wing",
    "The Midnight Library",
    "Educated",
    "Where the Crawdads Sing",
];
const PODCASTS: [&str; 5] = [
    "The Daily",
    "Crime Junkie",
    "SmartLess",
    "Huberman Lab",
    "This American Life",
];
const BRANDS: [&str; 5] = ["Nike", "Apple", "Patagonia", "Trader Joe's", "IKEA"];
const DINING: [&str; 5] = [
    "Farm-to-table restaurants",
    "Ramen shops",
    "Street tacos",
    "Natural wine bars",
    "Specialty coffee",
];
const TRAVEL: [&str; 5] = [
    "Lisbon",
    "Tokyo",
    "Mexico City",
    "National park road trips",
    "Weekend city breaks",
];
const FASHION: [&str; 5] = ["Uniqlo", "Levi's", "Zara", "New Balance", "Everlane"];
const WELLNESS: [&str; 5] = [
    "Yoga studios",
    "Trail running",
    "Meditation apps",
    "Climbing gyms",
    "Pilates",
];
const SOCIAL_DEFAULT: [&str; 5] = ["Instagram", "YouTube", "TikTok", "Facebook", "LinkedIn"];

// Age-bracketed platform preference, youngest-first skew toward short-form
// and video platforms.
const SOCIAL_UNDER_25: [&str; 5] = ["TikTok", "Instagram", "Snapchat", "YouTube", "Discord"];
const SOCIAL_25_34: [&str; 5] = ["Instagram", "TikTok", "YouTube", "X", "Reddit"];
const SOCIAL_35_49: [&str; 5] = ["Facebook", "Instagram", "YouTube", "LinkedIn", "X"];
const SOCIAL_50_PLUS: [&str; 5] = ["Facebook", "YouTube", "LinkedIn", "Pinterest", "Nextdoor"];

impl FallbackCatalog {
    /// Ordered defaults for a category, ignoring age targeting.
    #[must_use]
    pub fn items(category: Category) -> &'static [&'static str] {
        match category {
            Category::Music => &MUSIC,
            Category::Film => &FILM,
            Category::Television => &TELEVISION,
            Category::Books => &BOOKS,
            Category::Podcasts => &PODCASTS,
            Category::Brands => &BRANDS,
            Category::Dining => &DINING,
            Category::Travel => &TRAVEL,
            Category::Fashion => &FASHION,
            Category::Wellness => &WELLNESS,
            Category::SocialPlatforms => &SOCIAL_DEFAULT,
        }
    }

    /// Platform list for the bracket containing the range midpoint.
    #[must_use]
    pub fn social_platforms_for_age(age: AgeRange) -> &'static [&'static str] {
        match age.midpoint() {
            0..=24 => &SOCIAL_UNDER_25,
            25..=34 => &SOCIAL_25_34,
            35..=49 => &SOCIAL_35_49,
            _ => &SOCIAL_50_PLUS,
        }
    }

    /// Catalog entries for a category, age-targeted where the category
    /// supports it.
    #[must_use]
    pub fn items_for(category: Category, age: AgeRange) -> &'static [&'static str] {
        if category == Category::SocialPlatforms {
            Self::social_platforms_for_age(age)
        } else {
            Self::items(category)
        }
    }
}
