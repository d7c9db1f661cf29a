use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine-wide configuration.
///
/// Every threshold the original system hard-coded (sufficiency floor,
/// per-category fallback cap, base TTLs) is a tunable here so operators can
/// adjust them without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub resolution: ResolutionConfig,
    pub cache: CacheConfig,
    pub batch: BatchConfig,
    pub fallback: FallbackConfig,
    pub metrics: MetricsConfig,
    pub qloo: QlooConfig,
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution.sufficiency_threshold == 0 {
            return Err(ConfigError::Validation(
                "resolution.sufficiency_threshold must be at least 1".into(),
            ));
        }
        if self.resolution.base_ttl_secs == 0 || self.resolution.social_base_ttl_secs == 0 {
            return Err(ConfigError::Validation(
                "resolution TTLs must be non-zero".into(),
            ));
        }
        if self.cache.capacity == 0 {
            return Err(ConfigError::Validation("cache.capacity must be non-zero".into()));
        }
        if self.batch.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "batch.max_concurrency must be at least 1".into(),
            ));
        }
        if self.batch.fetch_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "batch.fetch_timeout_ms must be non-zero".into(),
            ));
        }
        if self.fallback.per_category_cap == 0 {
            return Err(ConfigError::Validation(
                "fallback.per_category_cap must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ─── Resolution ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Minimum total items across all categories for a resolution to count
    /// as sufficient.
    pub sufficiency_threshold: usize,
    /// Target item count per category used as the density denominator when
    /// planning TTLs.
    pub target_items_per_category: usize,
    /// Base cache lifetime for full constraint sets.
    pub base_ttl_secs: u64,
    /// Base cache lifetime for the social-platform category. Longer than
    /// the generic base: platform preference shifts slowly.
    pub social_base_ttl_secs: u64,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            sufficiency_threshold: 5,
            target_items_per_category: 3,
            base_ttl_secs: 3_600,
            social_base_ttl_secs: 14_400,
        }
    }
}

impl ResolutionConfig {
    #[must_use]
    pub fn base_ttl(&self) -> Duration {
        Duration::from_secs(self.base_ttl_secs)
    }

    #[must_use]
    pub fn social_base_ttl(&self) -> Duration {
        Duration::from_secs(self.social_base_ttl_secs)
    }
}

// ─── Cache ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum entries per store before oldest-first eviction kicks in.
    pub capacity: usize,
    /// Interval for the background expiry sweep.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 1_024,
            sweep_interval_secs: 60,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

// ─── Batch scheduling ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Upper bound on concurrent category fetches within one batch. The
    /// effective pool is `min(max_concurrency, ceil(unique_requests / 2))`.
    pub max_concurrency: usize,
    /// Per-unit fetch timeout. A unit that exceeds it becomes an empty
    /// result; siblings are unaffected.
    pub fetch_timeout_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            fetch_timeout_ms: 3_000,
        }
    }
}

impl BatchConfig {
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

// ─── Fallback injection ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Hard cap on a category's item count during injection. Existing items
    /// are never removed; injection just stops here.
    pub per_category_cap: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self { per_category_cap: 5 }
    }
}

// ─── Metrics ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// When false the collector accepts calls as no-ops and reports
    /// all-zero aggregates.
    pub enabled: bool,
    /// Records older than this are pruned.
    pub retention_period_secs: u64,
    /// Hard cap on retained records per kind; newest kept.
    pub max_records: usize,
    /// Interval for the background retention sweep.
    pub sweep_interval_secs: u64,
    /// Rolling error rate (percent) at or above which health reports
    /// unhealthy.
    pub unhealthy_error_rate_pct: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retention_period_secs: 3_600,
            max_records: 10_000,
            sweep_interval_secs: 60,
            unhealthy_error_rate_pct: 10,
        }
    }
}

impl MetricsConfig {
    #[must_use]
    pub fn retention_period(&self) -> Duration {
        Duration::from_secs(self.retention_period_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

// ─── Qloo fetch capability ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QlooConfig {
    pub base_url: String,
    /// Falls back to the `QLOO_API_KEY` env var when unset.
    pub api_key: Option<String>,
    /// Per-attempt request timeout.
    pub request_timeout_ms: u64,
    /// Retries after the first attempt. Backoff doubles per attempt with
    /// jitter.
    pub max_retries: u32,
    pub base_backoff_ms: u64,
}

impl Default for QlooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://hackathon.api.qloo.com".into(),
            api_key: None,
            request_timeout_ms: 2_500,
            max_retries: 2,
            base_backoff_ms: 200,
        }
    }
}

impl QlooConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
