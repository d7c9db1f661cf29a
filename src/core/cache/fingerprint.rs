use crate::core::signals::Signals;
use sha2::{Digest, Sha256};

/// Scope of a cache/dedup key: one category, or the full constraint set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyScope<'a> {
    Category(&'a str),
    FullSet,
}

impl KeyScope<'_> {
    fn label(&self) -> &str {
        match self {
            Self::Category(name) => name,
            Self::FullSet => "*",
        }
    }
}

/// Stable fingerprint over every field that affects result relevance.
///
/// Structurally-equal `Signals` always hash identically: the canonical
/// rendering is fixed-order, so field insertion order in the source data
/// cannot leak in. Location is lowercased so `"Paris, France"` and
/// `"paris, france"` share an entry; interests and values keep their
/// (already normalized) order since it is part of the signal.
#[must_use]
pub fn fingerprint(signals: &Signals, scope: KeyScope<'_>, limit: usize) -> String {
    let demo = &signals.demographics;
    let mut canonical = String::with_capacity(128);
    canonical.push_str("v1");
    canonical.push_str("|age:");
    canonical.push_str(&demo.age.min.to_string());
    canonical.push('-');
    canonical.push_str(&demo.age.max.to_string());
    canonical.push_str("|loc:");
    canonical.push_str(&demo.location.to_lowercase());
    canonical.push_str("|occ:");
    canonical.push_str(demo.occupation.as_deref().unwrap_or(""));
    canonical.push_str("|int:");
    canonical.push_str(&signals.interests.join(","));
    canonical.push_str("|val:");
    canonical.push_str(&signals.values.join(","));
    canonical.push_str("|lang:");
    canonical.push_str(&signals.cultural_context.language.to_string());
    canonical.push_str("|cat:");
    canonical.push_str(scope.label());
    canonical.push_str("|n:");
    canonical.push_str(&limit.to_string());

    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}
