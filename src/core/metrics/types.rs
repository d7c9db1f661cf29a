use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

// ─── Raw records ────────────────────────────────────────────────────────────

/// One upstream (or aggregate) call, as observed at the call site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiCallRecord {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub method: String,
    pub response_time_ms: u64,
    pub success: bool,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub error_type: Option<String>,
    pub cached: bool,
    pub retry_attempt: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CacheOpResult {
    Hit,
    Miss,
    Success,
}

/// One cache store operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOpRecord {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub key: String,
    pub endpoint: String,
    pub result: CacheOpResult,
    #[serde(default)]
    pub key_size: Option<usize>,
    #[serde(default)]
    pub value_size: Option<usize>,
    #[serde(default)]
    pub ttl_ms: Option<u64>,
}

// ─── Aggregate snapshot ─────────────────────────────────────────────────────

// The snapshot shape is consumed by dashboards; field names are a stability
// contract. Only additive changes are allowed.

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub api_calls: ApiCallStats,
    pub cache: CacheStats,
    pub errors: ErrorStats,
    pub health: HealthStats,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiCallStats {
    pub total: u64,
    pub successes: u64,
    pub errors: u64,
    /// Integer percent of total, rounded.
    pub success_rate: u32,
    pub error_rate: u32,
    pub avg_response_time_ms: u64,
    pub p50_response_time_ms: u64,
    pub p95_response_time_ms: u64,
    pub p99_response_time_ms: u64,
    pub max_concurrent_requests: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_requests: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: u32,
    pub miss_rate: u32,
    pub by_endpoint: BTreeMap<String, EndpointCacheStats>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndpointCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorStats {
    pub total_errors: u64,
    pub by_type: BTreeMap<String, u64>,
    pub by_endpoint: BTreeMap<String, u64>,
    pub by_status_code: BTreeMap<u16, u64>,
    /// Descending by count; ties keep first-seen order.
    pub most_common: Vec<ErrorCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCount {
    pub error_type: String,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::Connected
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStats {
    pub is_healthy: bool,
    pub connectivity: Connectivity,
    pub uptime_ms: u64,
}

impl Default for HealthStats {
    fn default() -> Self {
        Self {
            is_healthy: true,
            connectivity: Connectivity::Connected,
            uptime_ms: 0,
        }
    }
}
