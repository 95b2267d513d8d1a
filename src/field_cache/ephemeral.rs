//! In-process field cache: a single reader-writer lock over a plain map,
//! no expiry.

use crate::field::FieldBuilder;
use crate::field_cache::{
    FieldCache, FieldCacheEvent, FieldCacheHooks, FieldCacheMetrics, FieldCacheMetricsSnapshot,
};
use crate::ie::{FieldKey, InformationElement};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

pub struct EphemeralFieldCache {
    name: String,
    entries: RwLock<HashMap<FieldKey, InformationElement>>,
    metrics: FieldCacheMetrics,
    hooks: FieldCacheHooks,
}

impl fmt::Debug for EphemeralFieldCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralFieldCache")
            .field("name", &self.name)
            .field("len", &self.entries.read().unwrap().len())
            .finish()
    }
}

impl EphemeralFieldCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
            metrics: FieldCacheMetrics::default(),
            hooks: FieldCacheHooks::new(),
        }
    }

    /// Seeds the cache from a preloaded registry (e.g. [`crate::ie::registry::IanaRegistry`]).
    pub fn seeded(name: impl Into<String>, ies: impl IntoIterator<Item = InformationElement>) -> Self {
        let cache = Self::new(name);
        for ie in ies {
            cache.add(ie);
        }
        cache
    }

    pub fn on_event<F>(&mut self, hook: F)
    where
        F: Fn(&FieldCacheEvent) + Send + Sync + 'static,
    {
        self.hooks.register(hook);
    }
}

impl FieldCache for EphemeralFieldCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_builder(&self, key: FieldKey) -> FieldBuilder {
        match self.get(key) {
            Some(ie) => {
                self.metrics.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                FieldBuilder::new(ie)
            }
            None => {
                self.metrics.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                FieldBuilder::new(InformationElement::unassigned(key))
            }
        }
    }

    fn get(&self, key: FieldKey) -> Option<InformationElement> {
        self.entries.read().unwrap().get(&key).cloned()
    }

    fn add(&self, ie: InformationElement) {
        let key = ie.key();
        let mut entries = self.entries.write().unwrap();
        let replaced = entries.insert(key, ie).is_some();
        drop(entries);
        if replaced {
            self.metrics.replacements.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            log::trace!("field cache {} replaced {key}", self.name);
            self.hooks.trigger(&FieldCacheEvent::Replaced(key));
        } else {
            self.metrics.insertions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            log::trace!("field cache {} learned {key}", self.name);
            self.hooks.trigger(&FieldCacheEvent::Learned(key));
        }
    }

    fn delete(&self, key: FieldKey) {
        let removed = self.entries.write().unwrap().remove(&key).is_some();
        if removed {
            self.metrics.deletions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            log::trace!("field cache {} deleted {key}", self.name);
            self.hooks.trigger(&FieldCacheEvent::Deleted(key));
        }
    }

    fn get_all(&self) -> Vec<InformationElement> {
        self.entries.read().unwrap().values().cloned().collect()
    }

    fn metrics(&self) -> FieldCacheMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn sample_ie(id: u16) -> InformationElement {
        InformationElement {
            id,
            enterprise_id: 0,
            name: format!("field{id}"),
            data_type: DataType::Unsigned32,
            semantics: crate::ie::Semantics::Default,
            status: crate::ie::Status::Current,
            description: None,
            units: None,
            range: None,
            reference: None,
        }
    }

    #[test]
    fn add_then_get_round_trips() {
        let cache = EphemeralFieldCache::new("test");
        cache.add(sample_ie(1));
        let got = cache.get(FieldKey::iana(1)).unwrap();
        assert_eq!(got.name, "field1");
    }

    #[test]
    fn missing_key_yields_unassigned_builder_not_a_panic() {
        let cache = EphemeralFieldCache::new("test");
        let builder = cache.get_builder(FieldKey::iana(999));
        assert_eq!(builder.ie().name, "unassigned_0:999");
    }

    #[test]
    fn get_all_builders_wraps_every_cached_ie() {
        let cache = EphemeralFieldCache::new("test");
        cache.add(sample_ie(1));
        cache.add(sample_ie(2));
        let builders = cache.get_all_builders();
        assert_eq!(builders.len(), 2);
        assert!(builders.iter().any(|b| b.ie().name == "field1"));
    }

    #[test]
    fn delete_then_get_is_none() {
        let cache = EphemeralFieldCache::new("test");
        cache.add(sample_ie(1));
        cache.delete(FieldKey::iana(1));
        assert!(cache.get(FieldKey::iana(1)).is_none());
    }
}
