//! Cache abstraction shared by the source loader and the rate provider.

use async_trait::async_trait;
use std::time::Duration;

/// A key-value cache whose entries expire purely by elapsed time.
#[async_trait]
pub trait Cache<K, V>: Send + Sync {
    async fn get(&self, key: &K) -> Option<V>;

    /// Stores `value` under `key`. A `None` ttl keeps the entry until invalidated.
    async fn put(&self, key: K, value: V, ttl: Option<Duration>);

    async fn invalidate(&self, key: &K);
}
