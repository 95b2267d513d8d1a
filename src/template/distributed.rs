//! A distributed template cache: wraps an ephemeral cache and a KV client
//! scoped to `templates/<cache-name>/`. Own writes are applied locally
//! before publish; watch events are applied only when their revision
//! exceeds the last one seen for that key.

use crate::error::CacheError;
use crate::kv::KvStore;
use crate::template::ephemeral::EphemeralTemplateCache;
use crate::template::{
    Template, TemplateCache, TemplateCacheMetricsSnapshot, TemplateKey, TemplateLookup,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

fn kv_key(cache_name: &str, key: TemplateKey) -> String {
    format!("templates/{cache_name}/{key}")
}

pub struct DistributedTemplateCache {
    local: EphemeralTemplateCache,
    kv: Arc<dyn KvStore>,
    revisions: RwLock<HashMap<TemplateKey, u64>>,
}

impl fmt::Debug for DistributedTemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedTemplateCache")
            .field("local", &self.local)
            .finish()
    }
}

impl DistributedTemplateCache {
    pub fn new(name: impl Into<String>, kv: Arc<dyn KvStore>) -> Self {
        Self {
            local: EphemeralTemplateCache::new(name),
            kv,
            revisions: RwLock::new(HashMap::new()),
        }
    }

    /// Lists the KV prefix sorted by key ascending and populates the local
    /// cache, recording each key's starting revision.
    pub async fn initialize(&self) -> Result<(), CacheError> {
        let prefix = format!("templates/{}/", self.local.name());
        let mut entries = self
            .kv
            .list(&prefix)
            .await
            .map_err(|e| CacheError::Store(e.to_string()))?;
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        for event in entries {
            if let Ok(template) = serde_json::from_slice::<Template>(&event.value) {
                let key = template.key;
                self.local.load_snapshot([template]);
                self.revisions.write().unwrap().insert(key, event.version);
            }
        }
        Ok(())
    }

    /// Applies one incoming watch event, dropping stale/equal revisions.
    pub fn apply_watch_event(&self, key: TemplateKey, template: Template, revision: u64) {
        let mut revisions = self.revisions.write().unwrap();
        let current = revisions.get(&key).copied().unwrap_or(0);
        if revision > current {
            revisions.insert(key, revision);
            drop(revisions);
            log::trace!("template cache {} applying watch event for {key}", self.local.name());
            self.local.add(template);
        } else {
            log::trace!(
                "template cache {} ignoring stale watch event for {key} (revision {revision} <= {current})",
                self.local.name()
            );
        }
    }

    /// Subscribes to this cache's KV prefix and applies every event as it
    /// arrives, until the store closes the channel. Intended to run as a
    /// long-lived background task alongside `initialize`'s one-shot listing.
    pub async fn watch_forever(&self) -> Result<(), CacheError> {
        let prefix = format!("templates/{}/", self.local.name());
        let mut events = self
            .kv
            .watch(&prefix)
            .await
            .map_err(|e| CacheError::Store(e.to_string()))?;
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !event.key.starts_with(&prefix) {
                        continue;
                    }
                    match serde_json::from_slice::<Template>(&event.value) {
                        Ok(template) => self.apply_watch_event(template.key, template, event.version),
                        Err(e) => log::warn!(
                            "template cache {} could not decode watch event for {}: {e}",
                            self.local.name(),
                            event.key
                        ),
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "template cache {} watch lagged, skipped {skipped} events",
                        self.local.name()
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    }

    /// Adds locally first, then publishes to KV; rolls back the local add
    /// on publish failure.
    pub async fn add(&self, template: Template) -> Result<(), CacheError> {
        let key = template.key;
        let previous = match self.local.get(key) {
            TemplateLookup::Found(t) => Some(t),
            _ => None,
        };
        self.local.add(template.clone());
        let payload =
            serde_json::to_vec(&template).map_err(|e| CacheError::Store(e.to_string()))?;
        match self.kv.put(&kv_key(self.local.name(), key), payload).await {
            Ok(version) => {
                self.revisions.write().unwrap().insert(key, version);
                Ok(())
            }
            Err(e) => {
                match previous {
                    Some(prev) => self.local.add(prev),
                    None => self.local.delete(key),
                }
                Err(CacheError::Store(e.to_string()))
            }
        }
    }
}

impl TemplateCache for DistributedTemplateCache {
    fn name(&self) -> &str {
        self.local.name()
    }

    fn kind(&self) -> &'static str {
        "distributed"
    }

    fn get(&self, key: TemplateKey) -> TemplateLookup {
        self.local.get(key)
    }

    fn add(&self, template: Template) {
        self.local.add(template);
    }

    fn delete(&self, key: TemplateKey) {
        self.local.delete(key);
    }

    fn get_all(&self) -> Vec<Template> {
        self.local.get_all()
    }

    fn metrics(&self) -> TemplateCacheMetricsSnapshot {
        self.local.metrics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKvStore;
    use crate::protocol::TemplateRecord;

    fn empty_template(key: TemplateKey) -> Template {
        Template::new(
            key,
            TemplateRecord::Data {
                template_id: key.template_id,
                specifiers: Vec::new(),
            },
        )
    }

    #[tokio::test]
    async fn a_writes_b_reads_after_reinitializing() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let a = DistributedTemplateCache::new("shared", kv.clone());
        let b = DistributedTemplateCache::new("shared", kv.clone());

        let key = TemplateKey::new(1, 256);
        a.add(empty_template(key)).await.unwrap();

        b.initialize().await.unwrap();
        assert!(matches!(b.get(key), TemplateLookup::Found(_)));
    }

    #[test]
    fn stale_watch_event_does_not_echo() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let cache = DistributedTemplateCache::new("shared", kv);
        let key = TemplateKey::new(1, 256);
        cache.apply_watch_event(key, empty_template(key), 5);
        cache.apply_watch_event(key, empty_template(key), 5);
        assert_eq!(cache.metrics().insertions, 1);
    }

    #[tokio::test]
    async fn watch_forever_converges_without_reinitializing() {
        let kv: Arc<dyn KvStore> = Arc::new(InMemoryKvStore::new());
        let a = Arc::new(DistributedTemplateCache::new("shared", kv.clone()));
        let b = Arc::new(DistributedTemplateCache::new("shared", kv.clone()));

        let watcher = b.clone();
        let handle = tokio::spawn(async move { watcher.watch_forever().await });

        let key = TemplateKey::new(1, 256);
        a.add(empty_template(key)).await.unwrap();

        for _ in 0..50 {
            if matches!(b.get(key), TemplateLookup::Found(_)) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(matches!(b.get(key), TemplateLookup::Found(_)));

        handle.abort();
    }
}
