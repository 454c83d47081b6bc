use crate::core::cache::Cache;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct Slot<V> {
    value: V,
    stored_at: Instant,
    ttl: Option<Duration>,
}

impl<V> Slot<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        self.ttl
            .is_none_or(|ttl| now.duration_since(self.stored_at) < ttl)
    }
}

/// Process-local cache; stale slots are dropped when they are next read.
pub struct MemoryCache<K, V> {
    slots: Arc<Mutex<HashMap<K, Slot<V>>>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Number of stored slots, stale ones included until they are read.
    pub async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> Cache<K, V> for MemoryCache<K, V>
where
    K: Eq + Hash + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        let mut slots = self.slots.lock().await;
        let fresh = slots.get(key).map(|slot| slot.is_fresh(Instant::now()));
        match fresh {
            Some(true) => {
                debug!(?key, "Cache hit");
                slots.get(key).map(|slot| slot.value.clone())
            }
            Some(false) => {
                debug!(?key, "Cache entry stale");
                slots.remove(key);
                None
            }
            None => {
                debug!(?key, "Cache miss");
                None
            }
        }
    }

    async fn put(&self, key: K, value: V, ttl: Option<Duration>) {
        debug!(?key, ?ttl, "Cache store");
        let slot = Slot {
            value,
            stored_at: Instant::now(),
            ttl,
        };
        self.slots.lock().await.insert(key, slot);
    }

    async fn invalidate(&self, key: &K) {
        if self.slots.lock().await.remove(key).is_some() {
            debug!(?key, "Cache entry invalidated");
        }
    }
}
