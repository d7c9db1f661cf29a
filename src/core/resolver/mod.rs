// Resolution orchestrator — the crate's entry point. Validates signals,
// consults the cache, drives the batch scheduler, merges, tops up from the
// fallback catalog, gates on sufficiency, and reports everything to the
// metrics collector.

use crate::config::EngineConfig;
use crate::core::batch::{BatchRequest, BatchScheduler};
use crate::core::cache::{CacheStore, KeyScope, TtlPlanner, fingerprint};
use crate::core::constraints::{Category, CulturalConstraints};
use crate::core::fallback::FallbackInjector;
use crate::core::fetch::{FetchCapability, FetchContext, QlooClient};
use crate::core::metrics::{ApiCallRecord, CacheOpRecord, CacheOpResult, MetricsCollector};
use crate::core::signals::{RawSignals, Signals, validate};
use crate::error::ResolutionError;
use anyhow::anyhow;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

const RESOLUTION_ENDPOINT: &str = "resolution";
const SOCIAL_ENDPOINT: &str = "social_platforms";

/// Drives one full signal-to-constraints resolution per call.
///
/// Shared across concurrent callers; all mutable state lives behind the
/// injected cache and metrics services. `start`/`stop` manage the background
/// sweepers so tests can run isolated instances without ambient tasks.
pub struct SignalResolver {
    config: EngineConfig,
    fetch: Arc<dyn FetchCapability>,
    metrics: Arc<MetricsCollector>,
    scheduler: BatchScheduler,
    injector: FallbackInjector,
    ttl_planner: TtlPlanner,
    full_cache: Arc<CacheStore<CulturalConstraints>>,
    social_cache: Arc<CacheStore<Vec<String>>>,
    sweepers: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl SignalResolver {
    #[must_use]
    pub fn new(
        config: EngineConfig,
        fetch: Arc<dyn FetchCapability>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            scheduler: BatchScheduler::new(&config.batch, Arc::clone(&metrics)),
            injector: FallbackInjector::new(&config.fallback),
            ttl_planner: TtlPlanner::new(&config.resolution),
            full_cache: Arc::new(CacheStore::new(config.cache.capacity)),
            social_cache: Arc::new(CacheStore::new(config.cache.capacity)),
            sweepers: Mutex::new(Vec::new()),
            fetch,
            metrics,
            config,
        }
    }

    /// Validate raw input, then resolve. Validation failures surface before
    /// any cache or network activity.
    pub async fn resolve_raw(
        &self,
        raw: &RawSignals,
    ) -> Result<CulturalConstraints, ResolutionError> {
        let signals = validate(raw)?;
        self.resolve(&signals).await
    }

    /// Resolve a validated signal set into a complete constraint set.
    ///
    /// Individual category failures are recovered locally via fallback
    /// injection; only input rejection or systemic failure escalates.
    pub async fn resolve(
        &self,
        signals: &Signals,
    ) -> Result<CulturalConstraints, ResolutionError> {
        let started = Instant::now();
        let persona_count = signals.cultural_context.persona_count;
        let target_count = target_item_count(persona_count);

        // Cache lookup over the full signal set. A hit means zero fetch work.
        let full_key = fingerprint(signals, KeyScope::FullSet, target_count);
        tracing::debug!(phase = "cache_lookup", "resolver.phase");
        if let Some(constraints) = self.full_cache.get(&full_key) {
            self.record_cache_op(&full_key, RESOLUTION_ENDPOINT, CacheOpResult::Hit, None, None);
            tracing::debug!(
                phase = "hit_return",
                total_items = constraints.total_items(),
                "resolver.phase"
            );
            return Ok(constraints);
        }
        self.record_cache_op(&full_key, RESOLUTION_ENDPOINT, CacheOpResult::Miss, None, None);

        // Fetch all generic categories through the dedup/bounded-pool path.
        tracing::debug!(phase = "fetching", target_count, "resolver.phase");
        let signals_arc = Arc::new(signals.clone());
        let requests: Vec<BatchRequest> = Category::all()
            .filter(|category| *category != Category::SocialPlatforms)
            .map(|category| BatchRequest {
                category,
                signals: Arc::clone(&signals_arc),
                target_count,
                priority: category.priority(),
            })
            .collect();
        let request_count = requests.len();
        let results = self
            .scheduler
            .process_batch(requests, Arc::clone(&self.fetch))
            .await;
        if results.len() != request_count {
            // The scheduler guarantees one result per request; a mismatch is
            // a programming error in the pipeline, not an upstream outage.
            return Err(ResolutionError::UpstreamUnavailable {
                source: anyhow!(
                    "batch returned {} results for {request_count} requests",
                    results.len()
                ),
            });
        }

        tracing::debug!(phase = "merging", "resolver.phase");
        let mut constraints = CulturalConstraints::new();
        for result in results {
            constraints.extend_category(result.category, result.items);
        }

        // Social platforms ride their own cache entry: platform preference
        // shifts slowly, so it outlives the generic TTL.
        let social_items = self.resolve_social_platforms(signals, target_count).await;
        constraints.extend_category(Category::SocialPlatforms, social_items);

        tracing::debug!(phase = "fallback_filling", "resolver.phase");
        self.injector.inject(&mut constraints, signals);

        let total_items = constraints.total_items();
        let threshold = self.config.resolution.sufficiency_threshold;
        if total_items < threshold {
            tracing::warn!(total_items, threshold, "resolver.insufficient");
            self.record_resolution_call(started, false, total_items);
            return Err(ResolutionError::InsufficientCulturalData {
                total_items,
                threshold,
            });
        }

        tracing::debug!(phase = "caching", total_items, "resolver.phase");
        let ttl = self.ttl_planner.compute(signals, &constraints);
        self.full_cache.set(&full_key, constraints.clone(), ttl);
        self.record_cache_op(
            &full_key,
            RESOLUTION_ENDPOINT,
            CacheOpResult::Success,
            Some(total_items),
            Some(ttl),
        );
        self.record_resolution_call(started, true, total_items);
        tracing::debug!(
            phase = "done",
            total_items,
            ttl_secs = ttl.as_secs(),
            "resolver.phase"
        );
        Ok(constraints)
    }

    /// Expose the collector snapshot for dashboards.
    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Spawn the background cache sweepers and the metrics retention sweep.
    pub fn start(self: &Arc<Self>) {
        let mut sweepers = self.sweepers.lock().unwrap_or_else(PoisonError::into_inner);
        if !sweepers.is_empty() {
            return;
        }
        let interval = self.config.cache.sweep_interval();
        sweepers.push(CacheStore::spawn_sweeper(
            Arc::clone(&self.full_cache),
            interval,
        ));
        sweepers.push(CacheStore::spawn_sweeper(
            Arc::clone(&self.social_cache),
            interval,
        ));
        self.metrics.start();
    }

    pub fn stop(&self) {
        for handle in self
            .sweepers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            handle.abort();
        }
        self.metrics.stop();
    }

    // ── Internals ───────────────────────────────────────────────────────

    async fn resolve_social_platforms(
        &self,
        signals: &Signals,
        target_count: usize,
    ) -> Vec<String> {
        let key = fingerprint(signals, KeyScope::Category(SOCIAL_ENDPOINT), target_count);
        if let Some(items) = self.social_cache.get(&key) {
            self.record_cache_op(&key, SOCIAL_ENDPOINT, CacheOpResult::Hit, None, None);
            return items;
        }
        self.record_cache_op(&key, SOCIAL_ENDPOINT, CacheOpResult::Miss, None, None);

        let ctx = FetchContext::from_signals(signals);
        let started = Instant::now();
        self.metrics.call_started();
        let outcome = tokio::time::timeout(
            self.config.batch.fetch_timeout(),
            self.fetch.fetch(Category::SocialPlatforms, &ctx, target_count),
        )
        .await;
        self.metrics.call_finished();
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = started.elapsed().as_millis() as u64;

        let (items, error_type) = match outcome {
            Ok(Ok(items)) => (items, None),
            Ok(Err(err)) => (Vec::new(), Some(err.class().to_owned())),
            Err(_) => (Vec::new(), Some("timeout".to_owned())),
        };
        self.metrics.record_api_call(ApiCallRecord {
            timestamp: chrono::Utc::now(),
            endpoint: SOCIAL_ENDPOINT.into(),
            method: "GET".into(),
            response_time_ms: duration_ms,
            success: error_type.is_none(),
            status_code: None,
            error_type,
            cached: false,
            retry_attempt: 0,
        });

        if !items.is_empty() {
            let ttl = self.config.resolution.social_base_ttl();
            self.social_cache.set(&key, items.clone(), ttl);
            self.record_cache_op(
                &key,
                SOCIAL_ENDPOINT,
                CacheOpResult::Success,
                Some(items.len()),
                Some(ttl),
            );
        }
        items
    }

    fn record_cache_op(
        &self,
        key: &str,
        endpoint: &str,
        result: CacheOpResult,
        value_size: Option<usize>,
        ttl: Option<Duration>,
    ) {
        let operation = match result {
            CacheOpResult::Hit | CacheOpResult::Miss => "get",
            CacheOpResult::Success => "set",
        };
        self.metrics.record_cache_operation(CacheOpRecord {
            timestamp: chrono::Utc::now(),
            operation: operation.into(),
            key: key.to_owned(),
            endpoint: endpoint.into(),
            result,
            key_size: Some(key.len()),
            value_size,
            ttl_ms: ttl.map(|t| {
                #[allow(clippy::cast_possible_truncation)]
                {
                    t.as_millis() as u64
                }
            }),
        });
    }

    fn record_resolution_call(&self, started: Instant, success: bool, total_items: usize) {
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = started.elapsed().as_millis() as u64;
        self.metrics.record_api_call(ApiCallRecord {
            timestamp: chrono::Utc::now(),
            endpoint: RESOLUTION_ENDPOINT.into(),
            method: "POST".into(),
            response_time_ms: duration_ms,
            success,
            status_code: None,
            error_type: (!success).then(|| "insufficient_data".to_owned()),
            cached: false,
            retry_attempt: 0,
        });
        tracing::debug!(duration_ms, total_items, success, "resolver.completed");
    }
}

/// Per-category item target, scaled by how many personas the caller wants.
fn target_item_count(persona_count: u8) -> usize {
    (usize::from(persona_count) * 2).max(3)
}

/// Build a resolver wired to the Qloo-backed fetch capability and a fresh
/// metrics collector.
#[must_use]
pub fn create_resolver(config: EngineConfig) -> Arc<SignalResolver> {
    let metrics = Arc::new(MetricsCollector::new(&config.metrics));
    let fetch: Arc<dyn FetchCapability> = Arc::new(QlooClient::new(&config.qloo));
    Arc::new(SignalResolver::new(config, fetch, metrics))
}
