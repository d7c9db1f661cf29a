use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// One cached value. Expiry is wall-clock: a `get` past `expires_at` is a
/// miss even if no sweep has run yet.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: SystemTime,
    expires_at: SystemTime,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }
}

/// Key/value store with per-entry TTL, lazy expiry, and capacity eviction.
///
/// Shared-map behind a single mutex; callers never lock. The background
/// sweep is best-effort cleanup only — correctness comes from the lazy
/// expiry check on every `get`.
pub struct CacheStore<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    capacity: usize,
}

impl<V: Clone + Send + 'static> CacheStore<V> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Returns the live value for `key`, evicting it first if expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = SystemTime::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = SystemTime::now();

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            Self::evict_one(&mut entries, now);
        }

        entries.insert(
            key.to_owned(),
            CacheEntry {
                value,
                created_at: now,
                expires_at: now + ttl,
            },
        );
    }

    /// Drop expired entries. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let now = SystemTime::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// At capacity: prefer evicting an already-expired entry, otherwise the
    /// oldest-created one.
    fn evict_one(entries: &mut HashMap<String, CacheEntry<V>>, now: SystemTime) {
        let victim = entries
            .iter()
            .find(|(_, e)| e.is_expired(now))
            .or_else(|| entries.iter().min_by_key(|(_, e)| e.created_at))
            .map(|(k, _)| k.clone());
        if let Some(key) = victim {
            entries.remove(&key);
        }
    }

    /// Spawn the periodic best-effort sweeper. The handle is aborted by the
    /// owning service's `stop`.
    pub fn spawn_sweeper(store: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = store.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "cache.sweep");
                }
            }
        })
    }
}
