use super::types::{AgeRange, CulturalContext, Demographics, Language, RawSignals, Signals};
use crate::error::ValidationError;
use std::str::FromStr;

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 80;
pub const MAX_PERSONA_COUNT: u8 = 5;

/// Validate and normalize raw input into a `Signals` value object.
///
/// Checks run in a fixed order and fail fast on the first violation:
/// location, age bounds, persona count, language. Side-effect free.
pub fn validate(raw: &RawSignals) -> Result<Signals, ValidationError> {
    let location = raw.location.trim();
    if location.is_empty() {
        return Err(ValidationError::LocationRequired);
    }

    if raw.age_min < MIN_AGE || raw.age_max > MAX_AGE || raw.age_min >= raw.age_max {
        return Err(ValidationError::AgeRangeInvalid {
            min: raw.age_min,
            max: raw.age_max,
        });
    }

    if raw.persona_count == 0 || raw.persona_count > MAX_PERSONA_COUNT {
        return Err(ValidationError::PersonaCountInvalid {
            count: raw.persona_count,
        });
    }

    let language = Language::from_str(raw.language.trim()).map_err(|_| {
        ValidationError::LanguageUnsupported {
            language: raw.language.clone(),
        }
    })?;

    let occupation = raw
        .occupation
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    Ok(Signals {
        demographics: Demographics {
            age: AgeRange {
                min: raw.age_min,
                max: raw.age_max,
            },
            location: location.to_owned(),
            occupation,
        },
        interests: normalize_terms(&raw.interests),
        values: normalize_terms(&raw.values),
        cultural_context: CulturalContext {
            language,
            persona_count: raw.persona_count,
        },
    })
}

/// Trim, drop empties, dedup preserving first occurrence.
fn normalize_terms(terms: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(terms.len());
    for term in terms {
        let trimmed = term.trim();
        if trimmed.is_empty() {
            continue;
        }
        if out.iter().any(|existing| existing == trimmed) {
            continue;
        }
        out.push(trimmed.to_owned());
    }
    out
}
