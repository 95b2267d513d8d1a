//! An in-process template cache: a plain map under a reader-writer lock,
//! no expiry.

use crate::template::{
    Template, TemplateCache, TemplateCacheEvent, TemplateCacheHooks, TemplateCacheMetrics,
    TemplateCacheMetricsSnapshot, TemplateKey, TemplateLookup,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::sync::atomic::Ordering;

pub struct EphemeralTemplateCache {
    name: String,
    entries: RwLock<HashMap<TemplateKey, Template>>,
    metrics: TemplateCacheMetrics,
    hooks: TemplateCacheHooks,
}

impl fmt::Debug for EphemeralTemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralTemplateCache")
            .field("name", &self.name)
            .field("len", &self.entries.read().unwrap().len())
            .finish()
    }
}

impl EphemeralTemplateCache {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
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

    /// Snapshot used by the persistent/distributed wrappers to bulk-load
    /// without going through per-key `add` (and its hook/metric noise) at
    /// startup.
    pub(crate) fn load_snapshot(&self, templates: impl IntoIterator<Item = Template>) {
        let mut entries = self.entries.write().unwrap();
        for t in templates {
            entries.insert(t.key, t);
        }
    }
}

impl TemplateCache for EphemeralTemplateCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        "ephemeral"
    }

    fn get(&self, key: TemplateKey) -> TemplateLookup {
        match self.entries.read().unwrap().get(&key) {
            Some(t) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                TemplateLookup::Found(t.clone())
            }
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                TemplateLookup::NotFound
            }
        }
    }

    fn add(&self, template: Template) {
        let key = template.key;
        let replaced = self.entries.write().unwrap().insert(key, template).is_some();
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
        self.entries.read().unwrap().values().cloned().collect()
    }

    fn metrics(&self) -> TemplateCacheMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn replacement_then_delete() {
        let cache = EphemeralTemplateCache::new("t");
        let key = TemplateKey::new(1, 256);
        cache.add(empty_template(key));
        cache.add(empty_template(key));
        assert!(matches!(cache.get(key), TemplateLookup::Found(_)));
        cache.delete(key);
        assert_eq!(cache.get(key), TemplateLookup::NotFound);
        assert_eq!(cache.metrics().replacements, 1);
    }
}
