// Shared fixtures for the integration suites. Not every binary uses every
// helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use tastegraph::core::metrics::MetricsCollector;
use tastegraph::{
    Category, EngineConfig, FetchCapability, FetchContext, FetchError, RawSignals, SignalResolver,
};

pub fn init_tracing() {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// How the scripted upstream behaves for a category.
#[derive(Debug, Clone, Copy)]
pub enum FetchScript {
    /// Return `take` items named `<category>-<i>`.
    Succeed,
    /// Return exactly `n` items regardless of the requested count.
    SucceedWith(usize),
    /// Fail with a network error.
    Fail,
}

/// In-process fetch capability with per-category scripting and a call log.
pub struct ScriptedFetch {
    default: FetchScript,
    overrides: Mutex<HashMap<Category, FetchScript>>,
    calls: AtomicUsize,
    call_log: Mutex<Vec<Category>>,
}

impl ScriptedFetch {
    pub fn succeeding() -> Self {
        Self::with_default(FetchScript::Succeed)
    }

    pub fn failing() -> Self {
        Self::with_default(FetchScript::Fail)
    }

    fn with_default(default: FetchScript) -> Self {
        Self {
            default,
            overrides: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            call_log: Mutex::new(Vec::new()),
        }
    }

    pub fn script(&self, category: Category, script: FetchScript) {
        self.overrides.lock().unwrap().insert(category, script);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, category: Category) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| **c == category)
            .count()
    }
}

impl FetchCapability for ScriptedFetch {
    fn fetch<'a>(
        &'a self,
        category: Category,
        _ctx: &'a FetchContext,
        take: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<String>, FetchError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_log.lock().unwrap().push(category);
            let script = self
                .overrides
                .lock()
                .unwrap()
                .get(&category)
                .copied()
                .unwrap_or(self.default);
            match script {
                FetchScript::Succeed => {
                    Ok((0..take).map(|i| format!("{category}-{i}")).collect())
                }
                FetchScript::SucceedWith(n) => {
                    Ok((0..n).map(|i| format!("{category}-{i}")).collect())
                }
                FetchScript::Fail => Err(FetchError::Network("scripted outage".into())),
            }
        })
    }
}

pub struct TestHarness {
    pub resolver: Arc<SignalResolver>,
    pub fetch: Arc<ScriptedFetch>,
    pub metrics: Arc<MetricsCollector>,
}

pub fn harness_with(config: EngineConfig, fetch: ScriptedFetch) -> TestHarness {
    init_tracing();
    let fetch = Arc::new(fetch);
    let metrics = Arc::new(MetricsCollector::new(&config.metrics));
    let resolver = Arc::new(SignalResolver::new(
        config,
        Arc::clone(&fetch) as Arc<dyn FetchCapability>,
        Arc::clone(&metrics),
    ));
    TestHarness {
        resolver,
        fetch,
        metrics,
    }
}

pub fn harness(fetch: ScriptedFetch) -> TestHarness {
    harness_with(EngineConfig::default(), fetch)
}

/// A valid Parisian brief: 25-35, two personas.
pub fn paris_raw() -> RawSignals {
    RawSignals {
        age_min: 25,
        age_max: 35,
        location: "Paris, France".into(),
        occupation: Some("designer".into()),
        interests: vec!["indie music".into(), "cinema".into()],
        values: vec!["sustainability".into()],
        language: "en".into(),
        persona_count: 2,
    }
}
