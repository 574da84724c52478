//! Directory-backed store: one JSON file per key.
//!
//! `events/0xddf2...` lands at `<root>/events/0xddf2...`. Writes go to a
//! temporary file first and are renamed into place, so a concurrent reader
//! never observes a half-written member.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{AbiStore, Result, StoreError};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub struct LocalAbiStore {
    root: PathBuf,
    label: String,
}

impl LocalAbiStore {
    /// Opens (and creates if needed) the store directory.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for namespace in ["events", "functions", "contracts"] {
            tokio::fs::create_dir_all(root.join(namespace)).await?;
        }

        tracing::info!(
            target: "log_decoder::store::local",
            "Using local ABI store at {}",
            root.display()
        );

        Ok(Self {
            label: root.display().to_string(),
            root,
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if key.is_empty() || !is_plain {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AbiStore for LocalAbiStore {
    fn label(&self) -> &str {
        &self.label
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension(format!(
            "tmp-{}-{}",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::trace!(
            target: "log_decoder::store::local",
            "Wrote {} ({} bytes)",
            key,
            body.len()
        );

        Ok(())
    }
}
