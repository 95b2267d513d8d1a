//! The template cache and its four backends.
//!
//! `TemplateRecord`/`OptionsTemplateRecord` wire codec lives in
//! [`crate::protocol`]; this module owns the cached `Template` wrapper, the
//! `(observation_domain_id, template_id)` key, and the shared cache
//! contract each backend implements.

pub mod decaying;
pub mod distributed;
pub mod ephemeral;
pub mod persistent;

pub use decaying::DecayingTemplateCache;
pub use distributed::DistributedTemplateCache;
pub use ephemeral::EphemeralTemplateCache;
pub use persistent::PersistentTemplateCache;

use crate::protocol::TemplateRecord;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// `(observation_domain_id, template_id)`. Serial form `"<odid>-<tid>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey {
    pub observation_domain_id: u32,
    pub template_id: u16,
}

impl TemplateKey {
    pub fn new(observation_domain_id: u32, template_id: u16) -> Self {
        Self {
            observation_domain_id,
            template_id,
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.observation_domain_id, self.template_id)
    }
}

/// Descriptive metadata carried alongside the wire record, independent of
/// any single backend's bookkeeping (creation clock, TTL deadline, KV
/// revision — those live in each backend's own wrapper type).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TemplateMetadata {
    pub name: Option<String>,
    #[serde(with = "crate::template::system_time_secs")]
    pub created: SystemTime,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
}

impl Default for TemplateMetadata {
    fn default() -> Self {
        Self {
            name: None,
            created: SystemTime::now(),
            labels: HashMap::new(),
            annotations: HashMap::new(),
        }
    }
}

mod system_time_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let secs = t.duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        s.serialize_u64(secs)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

/// A cached template: the wire record plus metadata. Invariant:
/// `key.template_id == record.template_id()`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Template {
    pub key: TemplateKey,
    pub record: TemplateRecord,
    pub metadata: TemplateMetadata,
}

impl Template {
    pub fn new(key: TemplateKey, record: TemplateRecord) -> Self {
        debug_assert_eq!(key.template_id, record.template_id());
        Self {
            key,
            record,
            metadata: TemplateMetadata::default(),
        }
    }
}

/// Fires on every template cache mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateCacheEvent {
    Learned(TemplateKey),
    Replaced(TemplateKey),
    Expired(TemplateKey),
    Deleted(TemplateKey),
}

pub type TemplateCacheHook = std::sync::Arc<dyn Fn(&TemplateCacheEvent) + Send + Sync + 'static>;

#[derive(Clone, Default)]
pub struct TemplateCacheHooks {
    hooks: Vec<TemplateCacheHook>,
}

impl fmt::Debug for TemplateCacheHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateCacheHooks")
            .field("hook_count", &self.hooks.len())
            .finish()
    }
}

impl TemplateCacheHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, hook: F)
    where
        F: Fn(&TemplateCacheEvent) + Send + Sync + 'static,
    {
        self.hooks.push(std::sync::Arc::new(hook));
    }

    pub fn trigger(&self, event: &TemplateCacheEvent) {
        for hook in &self.hooks {
            hook(event);
        }
    }
}

#[derive(Debug, Default)]
pub struct TemplateCacheMetrics {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub insertions: AtomicU64,
    pub replacements: AtomicU64,
    pub deletions: AtomicU64,
    pub expirations: AtomicU64,
}

impl TemplateCacheMetrics {
    pub fn snapshot(&self) -> TemplateCacheMetricsSnapshot {
        TemplateCacheMetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            insertions: self.insertions.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            deletions: self.deletions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TemplateCacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub replacements: u64,
    pub deletions: u64,
    pub expirations: u64,
}

/// Outcome of a `get`, distinguishing "never seen" from "aged out".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateLookup {
    Found(Template),
    NotFound,
    Expired,
}

/// Shared contract across template cache backends.
///
/// `add`/`delete`/`get`/`get_all` are synchronous — every backend's local
/// map is guarded by a plain reader-writer lock. Backends that front a
/// remote store (persistent, distributed) expose their I/O-bound lifecycle
/// (`initialize`, `close`, watch loops) as inherent async methods rather
/// than through this trait, so it stays dyn-safe and usable from the
/// decoder's synchronous hot path.
pub trait TemplateCache: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    fn get(&self, key: TemplateKey) -> TemplateLookup;

    fn add(&self, template: Template);

    fn delete(&self, key: TemplateKey);

    fn get_all(&self) -> Vec<Template>;

    fn metrics(&self) -> TemplateCacheMetricsSnapshot;

    fn marshal_json(&self) -> serde_json::Value {
        serde_json::json!(
            self.get_all()
                .into_iter()
                .map(|t| (t.key.to_string(), t))
                .collect::<std::collections::BTreeMap<_, _>>()
        )
    }
}
