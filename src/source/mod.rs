//! Where contract ABIs come from.

pub mod etherscan;

use async_trait::async_trait;

use crate::types::AbiMember;

pub use etherscan::{EtherscanClient, EtherscanConfig};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The explorer has no ABI for this address (unverified contract, EOA, ...).
    #[error("No ABI published for contract {0}")]
    NotFound(String),
    #[error("Rate limited by ABI source: {0}")]
    RateLimited(String),
    #[error("ABI source returned an error: {0}")]
    Upstream(String),
    #[error("ABI source request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ABI source returned a malformed ABI: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl SourceError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::RateLimited(_) => true,
            SourceError::Transport(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|status| {
                        status.is_server_error() || status.as_u16() == 429
                    })
            }
            SourceError::NotFound(_) | SourceError::Upstream(_) | SourceError::Malformed(_) => {
                false
            }
        }
    }
}

/// Provider of a contract's full ABI.
///
/// Implementations are responsible for their own throttling; callers only see
/// added latency.
#[async_trait]
pub trait AbiSource: Send + Sync {
    async fn fetch_abi(&self, address: &str) -> Result<Vec<AbiMember>, SourceError>;
}
