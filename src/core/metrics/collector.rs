use super::types::{
    AggregateSnapshot, ApiCallRecord, ApiCallStats, CacheOpRecord, CacheOpResult, CacheStats,
    Connectivity, EndpointCacheStats, ErrorCount, ErrorStats, HealthStats,
};
use crate::config::MetricsConfig;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Records call/cache events and aggregates statistics over a
/// retention-bounded window.
///
/// Explicitly constructed and dependency-injected, never a process global,
/// so tests instantiate isolated instances. `start` spawns the background
/// retention sweep; `stop` tears it down. A disabled collector accepts all
/// calls as no-ops and reports all-zero aggregates.
pub struct MetricsCollector {
    enabled: bool,
    retention_period: Duration,
    max_records: usize,
    unhealthy_error_rate_pct: u32,
    sweep_interval: Duration,
    constructed_at: Instant,
    inner: Mutex<Inner>,
    sweeper: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

struct Inner {
    api_calls: VecDeque<ApiCallRecord>,
    cache_ops: VecDeque<CacheOpRecord>,
    open_calls: u32,
    max_concurrent: u32,
    connectivity: Connectivity,
    /// Error types in first-seen order; stable tie-break for rankings.
    error_types_seen: Vec<String>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            api_calls: VecDeque::new(),
            cache_ops: VecDeque::new(),
            open_calls: 0,
            max_concurrent: 0,
            connectivity: Connectivity::Connected,
            error_types_seen: Vec::new(),
        }
    }
}

impl MetricsCollector {
    #[must_use]
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            enabled: config.enabled,
            retention_period: config.retention_period(),
            max_records: config.max_records.max(1),
            unhealthy_error_rate_pct: config.unhealthy_error_rate_pct,
            sweep_interval: config.sweep_interval(),
            constructed_at: Instant::now(),
            inner: Mutex::new(Inner::default()),
            sweeper: Mutex::new(None),
        }
    }

    // ── Recording ───────────────────────────────────────────────────────

    pub fn record_api_call(&self, record: ApiCallRecord) {
        if !self.enabled {
            return;
        }
        let mut inner = self.lock();
        if record.success {
            inner.connectivity = Connectivity::Connected;
        } else if matches!(record.error_type.as_deref(), Some("network" | "timeout")) {
            inner.connectivity = Connectivity::Disconnected;
        }
        if let Some(error_type) = record.error_type.as_deref()
            && !record.success
            && !inner.error_types_seen.iter().any(|t| t == error_type)
        {
            inner.error_types_seen.push(error_type.to_owned());
        }
        inner.api_calls.push_back(record);
        Self::prune(&mut inner.api_calls, self.retention_period, self.max_records);
    }

    pub fn record_cache_operation(&self, record: CacheOpRecord) {
        if !self.enabled {
            return;
        }
        let mut inner = self.lock();
        inner.cache_ops.push_back(record);
        Self::prune(&mut inner.cache_ops, self.retention_period, self.max_records);
    }

    /// Open-call counter, incremented on call start. Pairs with
    /// `call_finished`; the historical max feeds `max_concurrent_requests`.
    pub fn call_started(&self) {
        if !self.enabled {
            return;
        }
        let mut inner = self.lock();
        inner.open_calls += 1;
        inner.max_concurrent = inner.max_concurrent.max(inner.open_calls);
    }

    pub fn call_finished(&self) {
        if !self.enabled {
            return;
        }
        let mut inner = self.lock();
        inner.open_calls = inner.open_calls.saturating_sub(1);
    }

    // ── Aggregation ─────────────────────────────────────────────────────

    #[must_use]
    pub fn get_metrics(&self) -> AggregateSnapshot {
        self.snapshot(None)
    }

    /// Aggregates restricted to records with `start <= timestamp <= end`.
    #[must_use]
    pub fn metrics_for_period(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AggregateSnapshot {
        self.snapshot(Some((start, end)))
    }

    fn snapshot(&self, period: Option<(DateTime<Utc>, DateTime<Utc>)>) -> AggregateSnapshot {
        if !self.enabled {
            return AggregateSnapshot::default();
        }
        let inner = self.lock();

        let in_period = |ts: DateTime<Utc>| match period {
            Some((start, end)) => ts >= start && ts <= end,
            None => true,
        };

        let calls: Vec<&ApiCallRecord> = inner
            .api_calls
            .iter()
            .filter(|r| in_period(r.timestamp))
            .collect();
        let cache_ops: Vec<&CacheOpRecord> = inner
            .cache_ops
            .iter()
            .filter(|r| in_period(r.timestamp))
            .collect();

        let api_calls = aggregate_api_calls(&calls, inner.max_concurrent);
        let cache = aggregate_cache(&cache_ops);
        let errors = aggregate_errors(&calls, &inner.error_types_seen);

        let is_healthy = api_calls.error_rate < self.unhealthy_error_rate_pct
            && inner.connectivity == Connectivity::Connected;
        #[allow(clippy::cast_possible_truncation)]
        let uptime_ms = self.constructed_at.elapsed().as_millis() as u64;

        AggregateSnapshot {
            api_calls,
            cache,
            errors,
            health: HealthStats {
                is_healthy,
                connectivity: inner.connectivity,
                uptime_ms,
            },
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    pub fn reset_metrics(&self) {
        let mut inner = self.lock();
        *inner = Inner::default();
    }

    /// Drop records past retention and over the hard cap. The background
    /// sweep calls this; recording prunes lazily as well, so correctness
    /// never depends on the task running.
    pub fn sweep(&self) {
        if !self.enabled {
            return;
        }
        let mut inner = self.lock();
        Self::prune(&mut inner.api_calls, self.retention_period, self.max_records);
        Self::prune(&mut inner.cache_ops, self.retention_period, self.max_records);
    }

    pub fn start(self: &Arc<Self>) {
        if !self.enabled {
            return;
        }
        let mut sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if sweeper.is_some() {
            return;
        }
        let collector = Arc::clone(self);
        let interval = self.sweep_interval;
        *sweeper = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                collector.sweep();
            }
        }));
    }

    pub fn stop(&self) {
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune<T: Timestamped>(records: &mut VecDeque<T>, retention: Duration, max_records: usize) {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::zero());
        while records.front().is_some_and(|r| r.timestamp() < cutoff) {
            records.pop_front();
        }
        while records.len() > max_records {
            records.pop_front();
        }
    }
}

trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for ApiCallRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for CacheOpRecord {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

fn aggregate_api_calls(calls: &[&ApiCallRecord], max_concurrent: u32) -> ApiCallStats {
    let successes = calls.iter().filter(|r| r.success).count() as u64;
    let errors = calls.len() as u64 - successes;
    let total = successes + errors;

    let mut times: Vec<u64> = calls.iter().map(|r| r.response_time_ms).collect();
    times.sort_unstable();
    let avg = if times.is_empty() {
        0
    } else {
        times.iter().sum::<u64>() / times.len() as u64
    };

    ApiCallStats {
        total,
        successes,
        errors,
        success_rate: rounded_percent(successes, total),
        error_rate: rounded_percent(errors, total),
        avg_response_time_ms: avg,
        p50_response_time_ms: percentile(&times, 0.50),
        p95_response_time_ms: percentile(&times, 0.95),
        p99_response_time_ms: percentile(&times, 0.99),
        max_concurrent_requests: max_concurrent,
    }
}

fn aggregate_cache(ops: &[&CacheOpRecord]) -> CacheStats {
    let mut hits = 0u64;
    let mut misses = 0u64;
    let mut by_endpoint: BTreeMap<String, EndpointCacheStats> = BTreeMap::new();

    for op in ops {
        let counted = match op.result {
            CacheOpResult::Hit => {
                hits += 1;
                true
            }
            CacheOpResult::Miss => {
                misses += 1;
                true
            }
            CacheOpResult::Success => false,
        };
        if counted {
            let entry = by_endpoint.entry(op.endpoint.clone()).or_default();
            match op.result {
                CacheOpResult::Hit => entry.hits += 1,
                CacheOpResult::Miss => entry.misses += 1,
                CacheOpResult::Success => {}
            }
        }
    }

    for entry in by_endpoint.values_mut() {
        entry.hit_rate = rounded_percent(entry.hits, entry.hits + entry.misses);
    }

    let total_requests = hits + misses;
    CacheStats {
        total_requests,
        hits,
        misses,
        hit_rate: rounded_percent(hits, total_requests),
        miss_rate: rounded_percent(misses, total_requests),
        by_endpoint,
    }
}

fn aggregate_errors(calls: &[&ApiCallRecord], first_seen: &[String]) -> ErrorStats {
    let mut by_type: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_endpoint: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_status_code: BTreeMap<u16, u64> = BTreeMap::new();
    let mut total_errors = 0u64;

    for call in calls.iter().filter(|r| !r.success) {
        total_errors += 1;
        let error_type = call.error_type.as_deref().unwrap_or("unknown");
        *by_type.entry(error_type.to_owned()).or_default() += 1;
        *by_endpoint.entry(call.endpoint.clone()).or_default() += 1;
        if let Some(code) = call.status_code {
            *by_status_code.entry(code).or_default() += 1;
        }
    }

    let first_seen_rank = |error_type: &str| {
        first_seen
            .iter()
            .position(|t| t == error_type)
            .unwrap_or(usize::MAX)
    };
    let mut most_common: Vec<ErrorCount> = by_type
        .iter()
        .map(|(error_type, count)| ErrorCount {
            error_type: error_type.clone(),
            count: *count,
        })
        .collect();
    most_common.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| first_seen_rank(&a.error_type).cmp(&first_seen_rank(&b.error_type)))
    });

    ErrorStats {
        total_errors,
        by_type,
        by_endpoint,
        by_status_code,
        most_common,
    }
}

fn rounded_percent(part: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        ((part as f64 / total as f64) * 100.0).round() as u32
    }
}

/// Sorted-sample linear interpolation. `times` must be ascending.
fn percentile(times: &[u64], q: f64) -> u64 {
    if times.is_empty() {
        return 0;
    }
    if times.len() == 1 {
        return times[0];
    }
    let rank = q * (times.len() - 1) as f64;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = rank.floor() as usize;
    let hi = lo + 1;
    if hi >= times.len() {
        return times[times.len() - 1];
    }
    let frac = rank - rank.floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (times[lo] as f64 + (times[hi] as f64 - times[lo] as f64) * frac).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector() -> MetricsCollector {
        MetricsCollector::new(&MetricsConfig::default())
    }

    fn api_record(success: bool, response_time_ms: u64) -> ApiCallRecord {
        ApiCallRecord {
            timestamp: Utc::now(),
            endpoint: "music".into(),
            method: "GET".into(),
            response_time_ms,
            success,
            status_code: if success { Some(200) } else { Some(503) },
            error_type: if success { None } else { Some("network".into()) },
            cached: false,
            retry_attempt: 0,
        }
    }

    fn cache_record(result: CacheOpResult, endpoint: &str) -> CacheOpRecord {
        CacheOpRecord {
            timestamp: Utc::now(),
            operation: "get".into(),
            key: "abc123".into(),
            endpoint: endpoint.into(),
            result,
            key_size: Some(64),
            value_size: None,
            ttl_ms: None,
        }
    }

    #[test]
    fn nineteen_successes_one_failure() {
        let collector = collector();
        for _ in 0..19 {
            collector.record_api_call(api_record(true, 100));
        }
        collector.record_api_call(api_record(false, 250));

        let snapshot = collector.get_metrics();
        assert_eq!(snapshot.api_calls.total, 20);
        assert_eq!(snapshot.api_calls.successes, 19);
        assert_eq!(snapshot.api_calls.errors, 1);
        assert_eq!(snapshot.api_calls.success_rate, 95);
        assert_eq!(snapshot.api_calls.error_rate, 5);
        assert_eq!(snapshot.errors.total_errors, 1);
        // 5% error rate is under the 10% threshold, but the failing record
        // was network-class, which flips connectivity.
        assert!(!snapshot.health.is_healthy);
    }

    #[test]
    fn success_restores_connectivity_and_health() {
        let collector = collector();
        for _ in 0..19 {
            collector.record_api_call(api_record(true, 100));
        }
        let mut failed = api_record(false, 250);
        failed.error_type = Some("decode".into());
        collector.record_api_call(failed);

        let snapshot = collector.get_metrics();
        assert_eq!(snapshot.api_calls.success_rate, 95);
        assert!(snapshot.health.is_healthy);
    }

    #[test]
    fn totals_always_reconcile() {
        let collector = collector();
        for i in 0..37 {
            collector.record_api_call(api_record(i % 3 != 0, 10 * i));
        }
        let snapshot = collector.get_metrics();
        assert_eq!(
            snapshot.api_calls.total,
            snapshot.api_calls.successes + snapshot.api_calls.errors
        );
    }

    #[test]
    fn percentiles_are_ordered() {
        let collector = collector();
        for ms in [5, 10, 20, 40, 80, 160, 320, 640] {
            collector.record_api_call(api_record(true, ms));
        }
        let stats = collector.get_metrics().api_calls;
        assert!(stats.p50_response_time_ms <= stats.p95_response_time_ms);
        assert!(stats.p95_response_time_ms <= stats.p99_response_time_ms);
    }

    #[test]
    fn percentile_interpolates_between_samples() {
        assert_eq!(percentile(&[100, 200], 0.50), 150);
        assert_eq!(percentile(&[10, 20, 30], 0.50), 20);
        assert_eq!(percentile(&[], 0.95), 0);
        assert_eq!(percentile(&[7], 0.99), 7);
    }

    #[test]
    fn cache_rates_add_up() {
        let collector = collector();
        collector.record_cache_operation(cache_record(CacheOpResult::Hit, "music"));
        collector.record_cache_operation(cache_record(CacheOpResult::Hit, "music"));
        collector.record_cache_operation(cache_record(CacheOpResult::Miss, "film"));
        collector.record_cache_operation(cache_record(CacheOpResult::Success, "music"));

        let cache = collector.get_metrics().cache;
        assert_eq!(cache.total_requests, 3);
        assert_eq!(cache.hits + cache.misses, cache.total_requests);
        assert_eq!(cache.hit_rate, 67);
        assert_eq!(cache.by_endpoint["music"].hits, 2);
        assert_eq!(cache.by_endpoint["music"].hit_rate, 100);
        assert_eq!(cache.by_endpoint["film"].misses, 1);
    }

    #[test]
    fn most_common_errors_rank_stable() {
        let collector = collector();
        let mut decode = api_record(false, 10);
        decode.error_type = Some("decode".into());
        let mut timeout = api_record(false, 10);
        timeout.error_type = Some("timeout".into());

        // decode first-seen before timeout; equal counts keep that order.
        collector.record_api_call(decode.clone());
        collector.record_api_call(timeout.clone());
        collector.record_api_call(timeout);
        collector.record_api_call(decode);

        let errors = collector.get_metrics().errors;
        assert_eq!(errors.most_common[0].error_type, "decode");
        assert_eq!(errors.most_common[0].count, 2);
        assert_eq!(errors.most_common[1].error_type, "timeout");
    }

    #[test]
    fn open_call_counter_tracks_historical_max() {
        let collector = collector();
        collector.call_started();
        collector.call_started();
        collector.call_started();
        collector.call_finished();
        collector.call_started();
        collector.call_finished();
        collector.call_finished();
        collector.call_finished();

        let stats = collector.get_metrics().api_calls;
        assert_eq!(stats.max_concurrent_requests, 3);
    }

    #[test]
    fn hard_cap_keeps_newest() {
        let config = MetricsConfig {
            max_records: 5,
            ..MetricsConfig::default()
        };
        let collector = MetricsCollector::new(&config);
        for ms in 0..10 {
            collector.record_api_call(api_record(true, ms));
        }
        let snapshot = collector.get_metrics();
        assert_eq!(snapshot.api_calls.total, 5);
        // Newest kept: the highest response times survive.
        assert_eq!(snapshot.api_calls.p99_response_time_ms, 9);
    }

    #[test]
    fn retention_drops_old_records() {
        let collector = collector();
        let mut old = api_record(true, 10);
        old.timestamp = Utc::now() - chrono::Duration::hours(2);
        collector.record_api_call(old);
        collector.record_api_call(api_record(true, 20));
        collector.sweep();

        assert_eq!(collector.get_metrics().api_calls.total, 1);
    }

    #[test]
    fn period_query_filters_by_timestamp() {
        let collector = collector();
        let now = Utc::now();
        let mut early = api_record(true, 10);
        early.timestamp = now - chrono::Duration::minutes(10);
        collector.record_api_call(early);
        collector.record_api_call(api_record(true, 20));

        let snapshot = collector
            .metrics_for_period(now - chrono::Duration::minutes(1), now + chrono::Duration::minutes(1));
        assert_eq!(snapshot.api_calls.total, 1);
    }

    #[test]
    fn disabled_collector_is_a_no_op() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        let collector = MetricsCollector::new(&config);
        collector.record_api_call(api_record(true, 10));
        collector.record_cache_operation(cache_record(CacheOpResult::Hit, "music"));
        collector.call_started();

        let snapshot = collector.get_metrics();
        assert_eq!(snapshot.api_calls.total, 0);
        assert_eq!(snapshot.cache.total_requests, 0);
        assert_eq!(snapshot.health.uptime_ms, 0);
    }

    #[test]
    fn reset_clears_everything() {
        let collector = collector();
        collector.record_api_call(api_record(false, 10));
        collector.call_started();
        collector.reset_metrics();

        let snapshot = collector.get_metrics();
        assert_eq!(snapshot.api_calls.total, 0);
        assert_eq!(snapshot.api_calls.max_concurrent_requests, 0);
        assert_eq!(snapshot.errors.total_errors, 0);
    }

    #[tokio::test]
    async fn start_and_stop_manage_the_sweeper() {
        let collector = Arc::new(collector());
        collector.start();
        collector.start(); // idempotent
        collector.stop();
        collector.stop(); // idempotent
    }
}
