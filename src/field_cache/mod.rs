//! The information-element (field) cache: stores IE prototypes keyed
//! by [`FieldKey`], hands out builders, and is the landing spot for RFC 5610
//! on-the-fly learning.

pub mod distributed;
pub mod ephemeral;

use crate::field::FieldBuilder;
use crate::ie::{FieldKey, InformationElement};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use distributed::DistributedFieldCache;
pub use ephemeral::EphemeralFieldCache;

/// Fires on every field-cache mutation, giving callers the observability a
/// cache layer is expected to provide (learned/replaced/deleted events).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCacheEvent {
    Learned(FieldKey),
    Replaced(FieldKey),
    Deleted(FieldKey),
}

pub type FieldCacheHook = std::sync::Arc<dyn Fn(&FieldCacheEvent) + Send + Sync + 'static>;

#[derive(Clone, Default)]
pub struct FieldCacheHooks {
    hooks: Vec<FieldCacheHook>,
}

impl fmt::Debug for FieldCacheHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCacheHooks")
            .field("hook_count", &self.hooks.len())
            .finish()
    }
}

impl FieldCacheHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, hook: F)
    where
        F: Fn(&FieldCacheEvent) + Send + Sync + 'static,
    {
        self.hooks.push(std::sync::Arc::new(hook));
    }

    pub fn trigger(&self, event: &FieldCacheEvent) {
        for hook in &self.hooks {
            hook(event);
        }
    }
}

/// Hit/miss/insert/evict counters: atomics for lock-free recording, a plain
/// snapshot for consumers.
#[derive(Debug, Default)]
pub struct FieldCacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub insertions: AtomicU64,
    pub replacements: AtomicU64,
    pub deletions: AtomicU64,
    pub learned: AtomicU64,
}

impl FieldCacheMetrics {
    pub fn snapshot(&self) -> FieldCacheMetricsSnapshot {
        FieldCacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            deletions: self.deletions.load(Ordering::Relaxed),
            learned: self.learned.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldCacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub replacements: u64,
    pub deletions: u64,
    pub learned: u64,
}

/// Shared contract across field cache backends.
pub trait FieldCache: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Never fails: falls back to an `unassigned` builder when `key` is not
    /// in the cache.
    fn get_builder(&self, key: FieldKey) -> FieldBuilder;

    fn get(&self, key: FieldKey) -> Option<InformationElement>;

    /// Idempotent upsert.
    fn add(&self, ie: InformationElement);

    fn delete(&self, key: FieldKey);

    fn get_all(&self) -> Vec<InformationElement>;

    /// Every cached IE wrapped as a [`FieldBuilder`], for callers that want
    /// builders without a template's field specifiers (e.g. introspection
    /// or rehydrating a saved template from a dump).
    fn get_all_builders(&self) -> Vec<FieldBuilder> {
        self.get_all().into_iter().map(FieldBuilder::new).collect()
    }

    fn metrics(&self) -> FieldCacheMetricsSnapshot;

    fn marshal_json(&self) -> serde_json::Value {
        serde_json::json!(
            self.get_all()
                .into_iter()
                .map(|ie| (ie.key().to_string(), ie))
                .collect::<std::collections::BTreeMap<_, _>>()
        )
    }
}
