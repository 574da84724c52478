//! Process-local store.
//!
//! Nothing survives a restart, so this backend is only useful for local runs
//! and tests. It counts every operation, which lets tests assert how many
//! reads and writes a resolution performed.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{AbiStore, Result, StoreError};

/// Operation counters of an [`InMemoryAbiStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub gets: usize,
    pub exists: usize,
    pub puts: usize,
}

#[derive(Debug, Default)]
pub struct InMemoryAbiStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    gets: AtomicUsize,
    exists: AtomicUsize,
    puts: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    failing_write_prefix: RwLock<Option<String>>,
}

impl InMemoryAbiStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `get` and `exists` fail with a backend error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `put` fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent `put` under `prefix` (e.g. `functions/`) fail
    /// with a backend error. Other keys are written normally.
    pub async fn fail_writes_under(&self, prefix: impl Into<String>) {
        *self.failing_write_prefix.write().await = Some(prefix.into());
    }

    /// Inserts a payload without counting it as a write.
    pub async fn seed(&self, key: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.objects.write().await.insert(key.into(), body.into());
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            gets: self.gets.load(Ordering::SeqCst),
            exists: self.exists.load(Ordering::SeqCst),
            puts: self.puts.load(Ordering::SeqCst),
        }
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("reads disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AbiStore for InMemoryAbiStore {
    fn label(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        Ok(self.objects.read().await.get(key).cloned())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.exists.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".to_string()));
        }
        if let Some(prefix) = self.failing_write_prefix.read().await.as_deref() {
            if key.starts_with(prefix) {
                return Err(StoreError::Backend(format!("writes under {prefix} disabled")));
            }
        }
        self.objects.write().await.insert(key.to_string(), body);
        Ok(())
    }
}
