use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::store::ConfigStore;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoreDocument {
    endpoints: Vec<String>,
}

/// Reference [`ConfigStore`] persisting the endpoint list as a single TOML
/// document, following the `serde` + `toml` load/parse convention the
/// teacher's own config layer uses for its top-level settings file.
///
/// A missing file is treated as an empty endpoint list rather than an
/// error, mirroring that same convention's "file not found → defaults"
/// fallback. Every mutation rewrites the whole file — cheap and safe for a
/// list of this size, and it sidesteps partial-write corruption entirely.
pub struct FileConfigStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    async fn load(&self) -> Result<StoreDocument, String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                let msg = format!("failed to parse {}: {e}", self.path.display());
                tracing::warn!(path = %self.path.display(), error = %e, "config store: parse failed");
                msg
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "config store: no file yet, defaulting to empty list");
                Ok(StoreDocument::default())
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "config store: read failed");
                Err(format!("failed to read {}: {e}", self.path.display()))
            }
        }
    }

    async fn save(&self, doc: &StoreDocument) -> Result<(), String> {
        let serialized = toml::to_string_pretty(doc)
            .map_err(|e| format!("failed to serialize endpoint list: {e}"))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    tracing::warn!(path = %parent.display(), error = %e, "config store: create_dir_all failed");
                    format!("failed to create {}: {e}", parent.display())
                })?;
            }
        }
        tokio::fs::write(&self.path, serialized).await.map_err(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "config store: write failed");
            format!("failed to write {}: {e}", self.path.display())
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    async fn list_endpoints(&self) -> Result<Vec<String>, String> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.endpoints)
    }

    async fn add_endpoint(&self, endpoint: &str) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        if !doc.endpoints.iter().any(|e| e == endpoint) {
            doc.endpoints.push(endpoint.to_string());
            self.save(&doc).await?;
        }
        Ok(())
    }

    async fn remove_endpoint(&self, endpoint: &str) -> Result<(), String> {
        let _guard = self.lock.lock().await;
        let mut doc = self.load().await?;
        let before = doc.endpoints.len();
        doc.endpoints.retain(|e| e != endpoint);
        if doc.endpoints.len() != before {
            self.save(&doc).await?;
        }
        Ok(())
    }
}
