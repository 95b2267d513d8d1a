//! A file-backed template cache wrapping an ephemeral one.
//!
//! `initialize` reads the dump, populates the underlying cache, then serves
//! normally; `close` re-serializes the current contents. The frontend must
//! not observe a half-populated cache, which here falls out of
//! `initialize` fully repopulating the ephemeral map before returning —
//! callers are expected to gate their own traffic on `initialize`'s
//! `Future` completing.

use crate::error::CacheError;
use crate::template::ephemeral::EphemeralTemplateCache;
use crate::template::{
    Template, TemplateCache, TemplateCacheMetricsSnapshot, TemplateKey, TemplateLookup,
};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// The on-disk shape of a dump file.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Dump {
    exported_at: u64,
    store_type: String,
    store_name: String,
    templates: BTreeMap<String, Template>,
}

pub struct PersistentTemplateCache {
    inner: EphemeralTemplateCache,
    path: PathBuf,
}

impl fmt::Debug for PersistentTemplateCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentTemplateCache")
            .field("path", &self.path)
            .field("inner", &self.inner)
            .finish()
    }
}

impl PersistentTemplateCache {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            inner: EphemeralTemplateCache::new(name),
            path: path.into(),
        }
    }

    /// Reads the dump file (if present) and populates the underlying
    /// ephemeral cache. A missing file is treated as "start empty", not an
    /// error — the common case for a fresh deployment.
    pub async fn initialize(&self) -> Result<(), CacheError> {
        let path = self.path.clone();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CacheError::Store(e.to_string())),
        };
        let dump: Dump =
            serde_json::from_slice(&bytes).map_err(|e| CacheError::Store(e.to_string()))?;
        self.inner.load_snapshot(dump.templates.into_values());
        Ok(())
    }

    /// Serializes the current contents and writes them back, with a 5-second
    /// shutdown window. Exceeding it surfaces as `ShutdownIncomplete`.
    pub async fn close(&self) -> Result<(), CacheError> {
        let dump = Dump {
            exported_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
            store_type: "file".to_string(),
            store_name: self.inner.name().to_string(),
            templates: self
                .inner
                .get_all()
                .into_iter()
                .map(|t| (t.key.to_string(), t))
                .collect(),
        };
        let path = self.path.clone();
        let write = async {
            let bytes =
                serde_json::to_vec_pretty(&dump).map_err(|e| CacheError::Store(e.to_string()))?;
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|e| CacheError::Store(e.to_string()))
        };
        match tokio::time::timeout(Duration::from_secs(5), write).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::ShutdownIncomplete),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TemplateCache for PersistentTemplateCache {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kind(&self) -> &'static str {
        "persistent"
    }

    fn get(&self, key: TemplateKey) -> TemplateLookup {
        self.inner.get(key)
    }

    fn add(&self, template: Template) {
        self.inner.add(template);
    }

    fn delete(&self, key: TemplateKey) {
        self.inner.delete(key);
    }

    fn get_all(&self) -> Vec<Template> {
        self.inner.get_all()
    }

    fn metrics(&self) -> TemplateCacheMetricsSnapshot {
        self.inner.metrics()
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

    #[tokio::test]
    async fn close_then_initialize_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!(
            "ipfix_collector_test_{}",
            std::process::id()
        ));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("templates.json");

        let writer = PersistentTemplateCache::new("dump", &path);
        writer.add(empty_template(TemplateKey::new(1, 256)));
        writer.close().await.unwrap();

        let reader = PersistentTemplateCache::new("dump", &path);
        reader.initialize().await.unwrap();
        assert!(matches!(
            reader.get(TemplateKey::new(1, 256)),
            TemplateLookup::Found(_)
        ));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn missing_file_initializes_empty_not_an_error() {
        let cache = PersistentTemplateCache::new("dump", "/nonexistent/path/templates.json");
        cache.initialize().await.unwrap();
        assert!(cache.get_all().is_empty());
    }
}
