use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `tastegraph`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum EngineError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Signal validation ───────────────────────────────────────────────
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    // ── Resolution pipeline ─────────────────────────────────────────────
    #[error("resolution: {0}")]
    Resolution(#[from] ResolutionError),

    // ── Upstream fetch ──────────────────────────────────────────────────
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Signal validation errors ───────────────────────────────────────────────

/// Rejected input signals. Never retried; surfaced to the caller as-is
/// before any cache or network work happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("location must not be empty")]
    LocationRequired,

    #[error("age range {min}-{max} invalid (expected 18 <= min < max <= 80)")]
    AgeRangeInvalid { min: u32, max: u32 },

    #[error("persona count {count} out of range (expected 1-5)")]
    PersonaCountInvalid { count: u8 },

    #[error("language {language:?} is not supported")]
    LanguageUnsupported { language: String },
}

impl ValidationError {
    /// Stable discriminant code consumed by API layers and dashboards.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::LocationRequired => "LOCATION_REQUIRED",
            Self::AgeRangeInvalid { .. } => "AGE_RANGE_INVALID",
            Self::PersonaCountInvalid { .. } => "PERSONA_COUNT_INVALID",
            Self::LanguageUnsupported { .. } => "LANGUAGE_UNSUPPORTED",
        }
    }
}

// ─── Resolution errors ──────────────────────────────────────────────────────

/// Failures surfaced from `SignalResolver::resolve`.
///
/// Individual category fetch failures never appear here — they are absorbed
/// into fallback injection. Only input rejection or systemic failure
/// escalates.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("cultural data insufficient: {total_items} items after fallback (minimum {threshold})")]
    InsufficientCulturalData { total_items: usize, threshold: usize },

    #[error("taste API pipeline unavailable")]
    UpstreamUnavailable {
        #[source]
        source: anyhow::Error,
    },
}

impl ResolutionError {
    /// Stable discriminant code. Callers treat `CULTURAL_DATA_INSUFFICIENT`
    /// and `QLOO_API_UNAVAILABLE` as recoverable-by-retry with relaxed
    /// signals (wider age range, less specific location).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::InsufficientCulturalData { .. } => "CULTURAL_DATA_INSUFFICIENT",
            Self::UpstreamUnavailable { .. } => "QLOO_API_UNAVAILABLE",
        }
    }
}

// ─── Fetch errors ───────────────────────────────────────────────────────────

/// Per-category upstream failures. The batch scheduler swallows these into
/// empty results; they never propagate out of `resolve`.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network: {0}")]
    Network(String),

    #[error("fetch timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("rate-limited (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("Qloo API key not set. Set QLOO_API_KEY or configure [qloo].api_key.")]
    MissingApiKey,
}

impl FetchError {
    /// Short class label recorded into the metrics error taxonomy.
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout { .. } => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::Decode(_) => "decode",
            Self::MissingApiKey => "auth",
        }
    }
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
