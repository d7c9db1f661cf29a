// Observability layer — call health, cache efficiency, error taxonomy.

pub mod collector;
pub mod types;

pub use collector::MetricsCollector;
pub use types::{
    AggregateSnapshot, ApiCallRecord, ApiCallStats, CacheOpRecord, CacheOpResult, CacheStats,
    Connectivity, EndpointCacheStats, ErrorCount, ErrorStats, HealthStats,
};
