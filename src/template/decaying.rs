//! A time-bounded ephemeral template cache. Every entry carries a
//! deadline; `get` on an aged-out entry reports `Expired`, distinct from
//! `NotFound`.

use crate::template::{
    Template, TemplateCache, TemplateCacheEvent, TemplateCacheHooks, TemplateCacheMetrics,
    TemplateCacheMetricsSnapshot, TemplateKey, TemplateLookup,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

struct Entry {
    template: Template,
    created: Instant,
    deadline: Instant,
}

/// `get_all` filters out expired entries rather than exposing them as
/// present, so it stays consistent with what `get`
/// reports for the same key.
pub struct DecayingTemplateCache {
    name: String,
    timeout: RwLock<Duration>,
    entries: RwLock<HashMap<TemplateKey, Entry>>,
    metrics: TemplateCacheMetrics,
    hooks: TemplateCacheHooks,
}

impl fmt::Debug for DecayingTemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecayingTemplateCache")
            .field("name", &self.name)
            .field("timeout", &*self.timeout.read().unwrap())
            .finish()
    }
}

impl DecayingTemplateCache {
    pub fn new(name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            timeout: RwLock::new(timeout),
            entries: RwLock::new(HashMap::new()),
            metrics: TemplateCacheMetrics::default(),
            hooks: TemplateCacheHooks::new(),
        }
    }

    pub fn on_event<F>(&mut self, hook: F)
    where
        F: Fn(&TemplateCacheEvent) + Send + Sync + 'static,
    {
        self.hooks.register(hook);
    }

    /// Updates the timeout applied to future insertions. Existing entries
    /// keep the deadline they were given at insert time.
    pub fn set_timeout(&self, timeout: Duration) {
        *self.timeout.write().unwrap() = timeout;
    }
}

impl TemplateCache for DecayingTemplateCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "decaying"
    }

    fn get(&self, key: TemplateKey) -> TemplateLookup {
        match self.entries.read().unwrap().get(&key) {
            Some(entry) if Instant::now() > entry.deadline => {
                self.metrics.expirations.fetch_add(1, Ordering::Relaxed);
                log::trace!("template cache {} found {key} expired on read", self.name);
                self.hooks.trigger(&TemplateCacheEvent::Expired(key));
                TemplateLookup::Expired
            }
            Some(entry) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                TemplateLookup::Found(entry.template.clone())
            }
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                TemplateLookup::NotFound
            }
        }
    }

    fn add(&self, template: Template) {
        let key = template.key;
        let now = Instant::now();
        let deadline = now + *self.timeout.read().unwrap();
        let replaced = self
            .entries
            .write()
            .unwrap()
            .insert(
                key,
                Entry {
                    template,
                    created: now,
                    deadline,
                },
            )
            .is_some();
        if replaced {
            self.metrics.replacements.fetch_add(1, Ordering::Relaxed);
            log::trace!("template cache {} replaced {key}", self.name);
            self.hooks.trigger(&TemplateCacheEvent::Replaced(key));
        } else {
            self.metrics.insertions.fetch_add(1, Ordering::Relaxed);
            log::trace!("template cache {} learned {key}", self.name);
            self.hooks.trigger(&TemplateCacheEvent::Learned(key));
        }
    }

    fn delete(&self, key: TemplateKey) {
        let removed = self.entries.write().unwrap().remove(&key).is_some();
        if removed {
            self.metrics.deletions.fetch_add(1, Ordering::Relaxed);
            log::trace!("template cache {} deleted {key}", self.name);
            self.hooks.trigger(&TemplateCacheEvent::Deleted(key));
        }
    }

    fn get_all(&self) -> Vec<Template> {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap()
            .values()
            .filter(|e| now <= e.deadline)
            .map(|e| e.template.clone())
            .collect()
    }

    fn metrics(&self) -> TemplateCacheMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::TemplateRecord;
    use std::thread::sleep;

    fn empty_template(key: TemplateKey) -> Template {
        Template::new(
            key,
            TemplateRecord::Data {
                template_id: key.template_id,
                specifiers: Vec::new(),
            },
        )
    }

    #[test]
    fn entry_expires_after_timeout() {
        let cache = DecayingTemplateCache::new("t", Duration::from_millis(20));
        let key = TemplateKey::new(1, 256);
        cache.add(empty_template(key));
        assert!(matches!(cache.get(key), TemplateLookup::Found(_)));
        sleep(Duration::from_millis(40));
        assert_eq!(cache.get(key), TemplateLookup::Expired);
    }

    #[test]
    fn set_timeout_does_not_touch_existing_deadlines() {
        let cache = DecayingTemplateCache::new("t", Duration::from_millis(20));
        let key = TemplateKey::new(1, 256);
        cache.add(empty_template(key));
        cache.set_timeout(Duration::from_secs(3600));
        sleep(Duration::from_millis(40));
        assert_eq!(cache.get(key), TemplateLookup::Expired);
    }
}
