//! ABI resolution with a write-once blob cache.
//!
//! Each log goes through up to three lookups, stopping at the first that
//! settles it:
//!
//! 1. `events/<topic0>`: the member was cached by an earlier resolution.
//! 2. `contracts/<address>`: the contract was already split into members and
//!    none of them hashed to `topic0`, so there is nothing left to learn.
//! 3. The ABI source: fetch the full ABI, mark the contract as processed,
//!    then cache every event and function under its signature hash while
//!    looking for the one matching `topic0`.
//!
//! Only a corrupt cached member escalates as an error. Everything else
//! (missing keys, store outages, explorer failures) yields the log unchanged.

use futures::future::join_all;
use std::sync::Arc;
use tracing::Instrument;

use crate::error::{PersistError, ResolveError};
use crate::source::AbiSource;
use crate::store::{AbiKey, AbiStore};
use crate::types::{AbiMember, Log, MemberType, ResolvedLog};

/// Everything the resolver needs, passed in explicitly.
#[derive(Clone)]
pub struct ResolverConfig {
    pub store: Arc<dyn AbiStore>,
    pub source: Arc<dyn AbiSource>,
    /// Attached to every log span. Defaults to the store label.
    pub label: Option<String>,
}

impl ResolverConfig {
    pub fn new(store: Arc<dyn AbiStore>, source: Arc<dyn AbiSource>) -> Self {
        Self {
            store,
            source,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn AbiStore>,
    source: Arc<dyn AbiSource>,
    label: String,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        let label = config
            .label
            .unwrap_or_else(|| config.store.label().to_string());
        Self {
            store: config.store,
            source: config.source,
            label,
        }
    }

    /// Resolves a batch concurrently. Output order matches input order.
    ///
    /// Every log runs to completion even if another one fails; the first
    /// error (in input order) is then returned for the whole batch.
    pub async fn resolve_batch(&self, logs: &[Log]) -> Result<Vec<ResolvedLog>, ResolveError> {
        join_all(logs.iter().map(|log| self.resolve(log)))
            .await
            .into_iter()
            .collect()
    }

    /// Resolves one log against the cache, populating it on a miss.
    pub async fn resolve(&self, log: &Log) -> Result<ResolvedLog, ResolveError> {
        let span = tracing::debug_span!(
            target: "log_decoder::resolver",
            "resolve",
            address = %log.address,
            store = %self.label,
        );
        self.resolve_inner(log).instrument(span).await
    }

    async fn resolve_inner(&self, log: &Log) -> Result<ResolvedLog, ResolveError> {
        let Some(event_hash) = log.event_hash() else {
            tracing::debug!(target: "log_decoder::resolver", "Log has no topics");
            return Ok(ResolvedLog::Unresolved(log.clone()));
        };

        if let Some(member) = self.cached_event(&event_hash).await? {
            tracing::debug!(
                target: "log_decoder::resolver",
                "Found cached member {} for {}",
                member.signature(),
                event_hash
            );
            return Ok(ResolvedLog::decoded(log.clone(), member));
        }

        let contract_key = AbiKey::contract(&log.address).to_string();
        if self.contract_processed(&contract_key).await {
            tracing::debug!(
                target: "log_decoder::resolver",
                "Contract already processed, no member for {}",
                event_hash
            );
            return Ok(ResolvedLog::Unresolved(log.clone()));
        }

        let abi = match self.source.fetch_abi(&log.address).await {
            Ok(abi) => abi,
            Err(e) => {
                tracing::debug!(
                    target: "log_decoder::resolver",
                    "Failed to fetch ABI: {}",
                    e
                );
                return Ok(ResolvedLog::Unresolved(log.clone()));
            }
        };

        if let Err(e) = self.mark_processed(&contract_key, &abi).await {
            tracing::debug!(
                target: "log_decoder::resolver",
                "Failed to save contract ABI at {}: {}",
                contract_key,
                e
            );
            return Ok(ResolvedLog::Unresolved(log.clone()));
        }

        match self.populate(&log.address, &event_hash, &abi).await {
            Some(member) => {
                tracing::debug!(
                    target: "log_decoder::resolver",
                    "Matched {} from fetched ABI",
                    member.signature()
                );
                Ok(ResolvedLog::decoded(log.clone(), member))
            }
            None => Ok(ResolvedLog::Unresolved(log.clone())),
        }
    }

    /// Reads `events/<hash>`. A failed read counts as a miss; a payload
    /// that does not parse is an error.
    async fn cached_event(&self, event_hash: &str) -> Result<Option<AbiMember>, ResolveError> {
        let key = AbiKey::event(event_hash).to_string();
        let body = match self.store.get(&key).await {
            Ok(Some(body)) => body,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::debug!(
                    target: "log_decoder::resolver",
                    "Failed to read {}: {}",
                    key,
                    e
                );
                return Ok(None);
            }
        };

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|source| ResolveError::MalformedMember { key, source })
    }

    async fn contract_processed(&self, contract_key: &str) -> bool {
        match self.store.exists(contract_key).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::debug!(
                    target: "log_decoder::resolver",
                    "Failed to check {}: {}",
                    contract_key,
                    e
                );
                false
            }
        }
    }

    async fn mark_processed(&self, contract_key: &str, abi: &[AbiMember]) -> Result<(), PersistError> {
        let body = serde_json::to_vec(abi)?;
        self.store.put(contract_key, body).await?;
        tracing::debug!(
            target: "log_decoder::resolver",
            "Saved contract ABI ({} members) at {}",
            abi.len(),
            contract_key
        );
        Ok(())
    }

    /// Caches every member and returns the one hashing to `event_hash`.
    ///
    /// All members are written even after a match, since later logs from the
    /// same contract only ever look at the cache.
    async fn populate(&self, address: &str, event_hash: &str, abi: &[AbiMember]) -> Option<AbiMember> {
        let outcomes = join_all(
            abi.iter()
                .map(|member| self.persist_member(address, event_hash, member)),
        )
        .await;

        outcomes.into_iter().flatten().next()
    }

    async fn persist_member(
        &self,
        address: &str,
        event_hash: &str,
        member: &AbiMember,
    ) -> Option<AbiMember> {
        let hash = member.signature_hash();

        tracing::trace!(
            target: "log_decoder::resolver",
            "Calculated {} from {}",
            hash,
            member.signature()
        );

        let matched = (hash == event_hash).then(|| member.clone());

        let key = match &member.member_type {
            MemberType::Event => AbiKey::event(&hash),
            MemberType::Function => AbiKey::function(&hash),
            MemberType::Other(other) => {
                tracing::warn!(
                    target: "log_decoder::resolver",
                    "Unrecognized ABI member type '{}' in contract {}",
                    other,
                    address
                );
                return matched;
            }
        };

        let key = key.to_string();
        if let Err(e) = self.write_member(&key, member).await {
            tracing::warn!(
                target: "log_decoder::resolver",
                "Failed to save member at {}: {}",
                key,
                e
            );
        }

        matched
    }

    async fn write_member(&self, key: &str, member: &AbiMember) -> Result<(), PersistError> {
        let body = serde_json::to_vec(member)?;
        self.store.put(key, body).await?;
        Ok(())
    }
}
