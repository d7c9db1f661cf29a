use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// Supported persona languages. Parsing is case-insensitive; anything outside
// this set is rejected by the validator, not silently defaulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Language {
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
    Ja,
    Ko,
}

/// Inclusive audience age bounds. Invariant: `18 <= min < max <= 80`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.max - self.min
    }

    /// Midpoint used where a collaborator wants a single representative age.
    #[must_use]
    pub fn midpoint(&self) -> u32 {
        (self.min + self.max) / 2
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    pub age: AgeRange,
    pub location: String,
    #[serde(default)]
    pub occupation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CulturalContext {
    pub language: Language,
    pub persona_count: u8,
}

/// Validated, normalized input driving one resolution. Constructed only by
/// `validate`; per-call and immutable from then on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signals {
    pub demographics: Demographics,
    pub interests: Vec<String>,
    pub values: Vec<String>,
    pub cultural_context: CulturalContext,
}

/// Untrusted wire-shaped input, as handed over by the brief-to-signals
/// adapter. Everything stringly typed until validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSignals {
    pub age_min: u32,
    pub age_max: u32,
    pub location: String,
    pub occupation: Option<String>,
    pub interests: Vec<String>,
    pub values: Vec<String>,
    pub language: String,
    pub persona_count: u8,
}
