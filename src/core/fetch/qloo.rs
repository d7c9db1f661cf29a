use super::{FetchCapability, FetchContext};
use crate::config::QlooConfig;
use crate::core::constraints::Category;
use crate::error::FetchError;
use rand::Rng as _;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Default fetch capability backed by the Qloo insights API.
///
/// All reliability policy lives here: per-attempt timeout, bounded retries
/// with doubling backoff and jitter, 4xx-is-fatal classification. The
/// resolution core above only ever sees success or a taxonomized error.
pub struct QlooClient {
    client: Client,
    base_url: String,
    /// Pre-computed header value (avoids `format!` per request).
    api_key: Option<String>,
    max_retries: u32,
    base_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
struct InsightsResponse {
    results: InsightsResults,
}

#[derive(Debug, Deserialize)]
struct InsightsResults {
    #[serde(default)]
    entities: Vec<InsightsEntity>,
}

#[derive(Debug, Deserialize)]
struct InsightsEntity {
    name: String,
}

/// Whether a failed attempt is worth repeating.
enum Attempt {
    Fatal(FetchError),
    Transient(FetchError),
}

impl QlooClient {
    #[must_use]
    pub fn new(config: &QlooConfig) -> Self {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("QLOO_API_KEY").ok());

        Self {
            client: build_insights_client(config.request_timeout()),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key,
            max_retries: config.max_retries,
            base_backoff_ms: config.base_backoff_ms.max(1),
        }
    }

    async fn call_once(
        &self,
        category: Category,
        ctx: &FetchContext,
        take: usize,
    ) -> Result<Vec<String>, Attempt> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Attempt::Fatal(FetchError::MissingApiKey));
        };

        let mut query: Vec<(&str, String)> = vec![
            ("filter.type", category.entity_urn().to_owned()),
            ("take", take.to_string()),
            ("signal.demographics.age", ctx.age.to_string()),
            ("signal.location.query", ctx.location.clone()),
        ];
        if !ctx.interests.is_empty() {
            query.push(("signal.interests.query", ctx.interests.join(",")));
        }
        if let Some(occupation) = &ctx.occupation {
            query.push(("signal.demographics.occupation", occupation.clone()));
        }

        let url = format!("{}/v2/insights", self.base_url);
        let started = Instant::now();
        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", api_key)
            .query(&query)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e, started.elapsed()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(Attempt::Transient(FetchError::RateLimited {
                retry_after_secs,
            }));
        }
        if status.is_client_error() {
            // 4xx will not resolve with retries; bail immediately.
            return Err(Attempt::Fatal(FetchError::Network(format!(
                "Qloo insights returned {status} for {category}"
            ))));
        }
        if !status.is_success() {
            return Err(Attempt::Transient(FetchError::Network(format!(
                "Qloo insights returned {status} for {category}"
            ))));
        }

        let body: InsightsResponse = response
            .json()
            .await
            .map_err(|e| Attempt::Fatal(FetchError::Decode(e.to_string())))?;

        Ok(body
            .results
            .entities
            .into_iter()
            .map(|entity| entity.name)
            .take(take)
            .collect())
    }

    fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let base = self.base_backoff_ms.saturating_mul(1 << attempt.min(8));
        let jitter = rand::rng().random_range(0..=base / 2);
        Duration::from_millis(base + jitter)
    }
}

impl FetchCapability for QlooClient {
    fn fetch<'a>(
        &'a self,
        category: Category,
        ctx: &'a FetchContext,
        take: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            let mut last_error = None;

            for attempt in 0..=self.max_retries {
                match self.call_once(category, ctx, take).await {
                    Ok(items) => {
                        if attempt > 0 {
                            tracing::info!(
                                category = %category,
                                attempt,
                                "qloo.recovered_after_retry"
                            );
                        }
                        return Ok(items);
                    }
                    Err(Attempt::Fatal(err)) => {
                        tracing::warn!(category = %category, error = %err, "qloo.fetch_failed");
                        return Err(err);
                    }
                    Err(Attempt::Transient(err)) => {
                        tracing::debug!(
                            category = %category,
                            attempt,
                            error = %err,
                            "qloo.attempt_failed"
                        );
                        last_error = Some(err);
                        if attempt < self.max_retries {
                            tokio::time::sleep(self.backoff_with_jitter(attempt)).await;
                        }
                    }
                }
            }

            Err(last_error
                .unwrap_or_else(|| FetchError::Network("no attempts executed".into())))
        })
    }
}

fn classify_transport_error(error: &reqwest::Error, elapsed: Duration) -> Attempt {
    if error.is_timeout() {
        #[allow(clippy::cast_possible_truncation)]
        return Attempt::Transient(FetchError::Timeout {
            elapsed_ms: elapsed.as_millis() as u64,
        });
    }
    Attempt::Transient(FetchError::Network(error.to_string()))
}

fn build_insights_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}
