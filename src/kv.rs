//! The external KV store contract distributed caches are built on.
//!
//! This crate does not ship a real distributed backend (etcd, Consul, …) —
//! that is a host concern. [`InMemoryKvStore`] is a test double that
//! satisfies the contract well enough to exercise convergence and
//! self-echo suppression without a network dependency.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};

/// One KV entry as delivered by `watch`: value plus a per-key monotonic
/// version used to order concurrent writes and suppress stale/echoed
/// updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEvent {
    pub key: String,
    pub value: Vec<u8>,
    pub version: u64,
}

/// A ranged, watchable key-value store. Distributed template and field
/// caches are generic over this trait so a host can plug in whatever
/// cluster store it already runs.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Lists all keys under `prefix`, sorted by key ascending, each with its
    /// current version.
    async fn list(&self, prefix: &str) -> std::io::Result<Vec<KvEvent>>;

    /// Writes `key` → `value`, bumping its version. Returns the new version.
    async fn put(&self, key: &str, value: Vec<u8>) -> std::io::Result<u64>;

    /// Subscribes to all future writes under `prefix`. Each call gets its
    /// own independent stream of events from the point of subscription.
    async fn watch(&self, prefix: &str) -> std::io::Result<broadcast::Receiver<KvEvent>>;

    async fn close(&self) -> std::io::Result<()>;
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, (Vec<u8>, u64)>,
}

/// An in-process KV store shareable across multiple cache instances in the
/// same test, standing in for a real cluster store.
#[derive(Clone)]
pub struct InMemoryKvStore {
    inner: Arc<Mutex<Inner>>,
    events: broadcast::Sender<KvEvent>,
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            events,
        }
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn list(&self, prefix: &str) -> std::io::Result<Vec<KvEvent>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, (v, version))| KvEvent {
                key: k.clone(),
                value: v.clone(),
                version: *version,
            })
            .collect())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> std::io::Result<u64> {
        let mut inner = self.inner.lock().await;
        let version = inner
            .entries
            .get(key)
            .map(|(_, v)| v + 1)
            .unwrap_or(1);
        inner.entries.insert(key.to_string(), (value.clone(), version));
        drop(inner);
        let _ = self.events.send(KvEvent {
            key: key.to_string(),
            value,
            version,
        });
        Ok(version)
    }

    async fn watch(&self, prefix: &str) -> std::io::Result<broadcast::Receiver<KvEvent>> {
        // A real store would filter server-side; here the subscriber filters
        // by prefix on receive (see distributed cache watch loops).
        let _ = prefix;
        Ok(self.events.subscribe())
    }

    async fn close(&self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_list_round_trips() {
        let kv = InMemoryKvStore::new();
        kv.put("templates/a/1-256", b"payload".to_vec())
            .await
            .unwrap();
        let listed = kv.list("templates/a/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].value, b"payload");
        assert_eq!(listed[0].version, 1);
    }

    #[tokio::test]
    async fn repeated_put_bumps_version() {
        let kv = InMemoryKvStore::new();
        kv.put("k", b"a".to_vec()).await.unwrap();
        let v2 = kv.put("k", b"b".to_vec()).await.unwrap();
        assert_eq!(v2, 2);
    }
}
