//! Durable ABI cache.
//!
//! The store is a flat blob key-value space. Keys live in three disjoint
//! namespaces (see [`AbiKey`]) and every key is written at most once with
//! content derived only from the contract's published ABI, so concurrent
//! writers of the same key always agree and no locking is needed.
//!
//! A missing key is not an error: `get` returns `Ok(None)` and `exists`
//! returns `Ok(false)`.

pub mod local;
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use std::fmt;

pub use local::LocalAbiStore;
pub use memory::{InMemoryAbiStore, StoreStats};
pub use s3::{S3AbiStore, S3Config};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Store backend error: {0}")]
    Backend(String),
    #[error("Invalid store key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Blob storage used to cache ABI members.
#[async_trait]
pub trait AbiStore: Send + Sync {
    /// Short description used in log spans (bucket name, directory, ...).
    fn label(&self) -> &str;

    /// Reads a key. `Ok(None)` means the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Checks whether a key exists without reading it.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Writes a key, overwriting any previous content.
    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()>;
}

/// Store key namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbiKey {
    /// Event member keyed by its signature hash.
    Event(String),
    /// Function member keyed by its signature hash.
    Function(String),
    /// Marker for a contract whose ABI has already been fetched and split.
    Contract(String),
}

impl AbiKey {
    pub fn event(hash: &str) -> Self {
        AbiKey::Event(hash.to_lowercase())
    }

    pub fn function(hash: &str) -> Self {
        AbiKey::Function(hash.to_lowercase())
    }

    pub fn contract(address: &str) -> Self {
        AbiKey::Contract(address.to_lowercase())
    }
}

impl fmt::Display for AbiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiKey::Event(hash) => write!(f, "events/{hash}"),
            AbiKey::Function(hash) => write!(f, "functions/{hash}"),
            AbiKey::Contract(address) => write!(f, "contracts/{address}"),
        }
    }
}
