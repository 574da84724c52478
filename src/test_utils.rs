//! Test helpers shared by unit and integration tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::source::{AbiSource, SourceError};
use crate::types::{AbiMember, Log};

pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
pub const APPROVAL_TOPIC: &str =
    "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925";

pub fn transfer_event() -> AbiMember {
    AbiMember::event("Transfer", &["address", "address", "uint256"])
}

pub fn approval_event() -> AbiMember {
    AbiMember::event("Approval", &["address", "address", "uint256"])
}

/// A trimmed ERC-20 ABI: two events, two functions and a fallback.
pub fn erc20_abi() -> Vec<AbiMember> {
    let fallback: AbiMember =
        serde_json::from_value(serde_json::json!({"type": "fallback", "payable": true}))
            .expect("static fallback member");

    vec![
        transfer_event(),
        approval_event(),
        AbiMember::function("transfer", &["address", "uint256"]),
        AbiMember::function("balanceOf", &["address"]),
        fallback,
    ]
}

pub fn transfer_log(address: &str) -> Log {
    Log::new(address, vec![TRANSFER_TOPIC.to_string()])
}

/// In-memory [`AbiSource`] serving fixed ABIs and counting every call.
#[derive(Debug, Default)]
pub struct StaticAbiSource {
    abis: Mutex<HashMap<String, Vec<AbiMember>>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
    fail_with_upstream: bool,
}

impl StaticAbiSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_abi(self, address: &str, abi: Vec<AbiMember>) -> Self {
        self.abis
            .lock()
            .expect("abi map lock")
            .insert(address.to_lowercase(), abi);
        self
    }

    /// Sleeps before answering, like a throttled explorer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answers every request with an upstream error.
    pub fn failing(mut self) -> Self {
        self.fail_with_upstream = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AbiSource for StaticAbiSource {
    async fn fetch_abi(&self, address: &str) -> Result<Vec<AbiMember>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_with_upstream {
            return Err(SourceError::Upstream("unavailable".to_string()));
        }

        self.abis
            .lock()
            .expect("abi map lock")
            .get(&address.to_lowercase())
            .cloned()
            .ok_or_else(|| SourceError::NotFound(address.to_string()))
    }
}
