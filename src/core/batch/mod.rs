// Batch scheduling — dedup, priority dispatch, bounded workers, bulkhead
// failure isolation.

use crate::config::BatchConfig;
use crate::core::cache::{KeyScope, fingerprint};
use crate::core::constraints::Category;
use crate::core::fetch::{FetchCapability, FetchContext};
use crate::core::metrics::{ApiCallRecord, MetricsCollector};
use crate::core::signals::Signals;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use strum::Display;

/// One logical category request inside a batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub category: Category,
    pub signals: Arc<Signals>,
    pub target_count: usize,
    pub priority: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum ResultSource {
    Cache,
    Fetch,
    Fallback,
    /// The unit's fetch failed or timed out; the fallback injector owns
    /// recovery for this category.
    FallbackPending,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub category: Category,
    pub items: Vec<String>,
    pub source: ResultSource,
    pub duration_ms: u64,
}

/// A deduplicated unit of work plus the original request indices waiting on
/// its result.
struct UniqueJob {
    category: Category,
    ctx: FetchContext,
    target_count: usize,
    priority: u8,
    callers: Vec<usize>,
}

/// Deduplicates and groups outbound category requests, executing them with
/// bounded concurrency and priority ordering.
///
/// Failure semantics: individual fetch timeouts/errors are swallowed into
/// empty `fallback-pending` results. The scheduler itself never raises; a
/// single category's failure cannot abort sibling requests.
pub struct BatchScheduler {
    max_concurrency: usize,
    fetch_timeout: Duration,
    metrics: Arc<MetricsCollector>,
}

impl BatchScheduler {
    #[must_use]
    pub fn new(config: &BatchConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            max_concurrency: config.max_concurrency.max(1),
            fetch_timeout: config.fetch_timeout(),
            metrics,
        }
    }

    pub async fn process_batch(
        &self,
        requests: Vec<BatchRequest>,
        fetch: Arc<dyn FetchCapability>,
    ) -> Vec<BatchResult> {
        // Every caller gets a result even if its unit never completes
        // (worker panic, unexpected join failure).
        let mut out: Vec<BatchResult> = requests
            .iter()
            .map(|r| BatchResult {
                category: r.category,
                items: Vec::new(),
                source: ResultSource::FallbackPending,
                duration_ms: 0,
            })
            .collect();

        let mut uniques = coalesce(&requests);
        // Stable sort: ties keep declaration order, so equal-priority
        // categories dispatch in marketing-relevance order.
        uniques.sort_by(|a, b| b.priority.cmp(&a.priority));

        let unique_count = uniques.len();
        if unique_count == 0 {
            return out;
        }
        let pool_size = self.max_concurrency.min(unique_count.div_ceil(2)).max(1);
        tracing::debug!(
            requests = requests.len(),
            unique = unique_count,
            pool = pool_size,
            "batch.dispatch"
        );

        let queue = Arc::new(Mutex::new(VecDeque::from(uniques)));
        let completed: Arc<Mutex<Vec<(Vec<usize>, BatchResult)>>> =
            Arc::new(Mutex::new(Vec::with_capacity(unique_count)));

        let mut workers = tokio::task::JoinSet::new();
        for _ in 0..pool_size {
            let queue = Arc::clone(&queue);
            let completed = Arc::clone(&completed);
            let fetch = Arc::clone(&fetch);
            let metrics = Arc::clone(&self.metrics);
            let timeout = self.fetch_timeout;

            workers.spawn(async move {
                loop {
                    let job = queue
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .pop_front();
                    let Some(job) = job else { break };
                    let result = execute_unit(&job, fetch.as_ref(), timeout, &metrics).await;
                    completed
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push((job.callers, result));
                }
            });
        }
        while workers.join_next().await.is_some() {}

        let completed = std::mem::take(&mut *completed.lock().unwrap_or_else(PoisonError::into_inner));
        for (callers, result) in completed {
            for index in callers {
                out[index] = result.clone();
            }
        }
        out
    }
}

/// Group duplicate requests — same `(category, signal fingerprint, target
/// count)` — into one execution whose result fans out to all callers.
fn coalesce(requests: &[BatchRequest]) -> Vec<UniqueJob> {
    let mut by_key: HashMap<String, usize> = HashMap::new();
    let mut uniques: Vec<UniqueJob> = Vec::new();

    for (index, request) in requests.iter().enumerate() {
        let key = fingerprint(
            &request.signals,
            KeyScope::Category(&request.category.to_string()),
            request.target_count,
        );
        if let Some(&existing) = by_key.get(&key) {
            uniques[existing].callers.push(index);
            continue;
        }
        by_key.insert(key, uniques.len());
        uniques.push(UniqueJob {
            category: request.category,
            ctx: FetchContext::from_signals(&request.signals),
            target_count: request.target_count,
            priority: request.priority,
            callers: vec![index],
        });
    }
    uniques
}

async fn execute_unit(
    job: &UniqueJob,
    fetch: &dyn FetchCapability,
    timeout: Duration,
    metrics: &MetricsCollector,
) -> BatchResult {
    let started = Instant::now();
    metrics.call_started();
    let outcome =
        tokio::time::timeout(timeout, fetch.fetch(job.category, &job.ctx, job.target_count)).await;
    metrics.call_finished();
    #[allow(clippy::cast_possible_truncation)]
    let duration_ms = started.elapsed().as_millis() as u64;

    let (items, source, error_type) = match outcome {
        Ok(Ok(items)) => (items, ResultSource::Fetch, None),
        Ok(Err(err)) => {
            tracing::warn!(
                category = %job.category,
                error = %err,
                "batch.unit_failed"
            );
            (Vec::new(), ResultSource::FallbackPending, Some(err.class().to_owned()))
        }
        Err(_) => {
            tracing::warn!(
                category = %job.category,
                timeout_ms = timeout.as_millis() as u64,
                "batch.unit_timed_out"
            );
            (Vec::new(), ResultSource::FallbackPending, Some("timeout".to_owned()))
        }
    };

    metrics.record_api_call(ApiCallRecord {
        timestamp: chrono::Utc::now(),
        endpoint: job.category.to_string(),
        method: "GET".into(),
        response_time_ms: duration_ms,
        success: error_type.is_none(),
        status_code: None,
        error_type,
        cached: false,
        retry_attempt: 0,
    });

    BatchResult {
        category: job.category,
        items,
        source,
        duration_ms,
    }
}
