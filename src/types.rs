//! Wire types shared by the resolver, the stores and the HTTP layer.
//!
//! Field names follow the Ethereum JSON-RPC log shape (`camelCase`) and the
//! Solidity JSON ABI shape, so payloads round-trip through the ABI store and
//! the block explorer without loss.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// An event log as emitted by a contract.
///
/// `topics[0]`, when present, is the keccak hash of the event signature.
/// Metadata fields the resolver does not interpret are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    /// Emitting contract address (hex, case-insensitive).
    pub address: String,

    /// Indexed topics, first one being the event signature hash.
    #[serde(default)]
    pub topics: Vec<String>,

    /// Non-indexed payload (hex).
    #[serde(default)]
    pub data: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
}

impl Log {
    /// Creates a log with only the fields the resolver reads.
    pub fn new(address: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            address: address.into(),
            topics,
            data: "0x".to_string(),
            block_hash: None,
            block_number: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: None,
            removed: None,
        }
    }

    /// Lower-cased first topic, if any.
    pub fn event_hash(&self) -> Option<String> {
        self.topics.first().map(|topic| topic.to_lowercase())
    }
}

/// Kind of an ABI member, taken from its `type` field.
///
/// Only events and functions are cached. Anything else (constructor, fallback,
/// receive, error, or a missing `type`) is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberType {
    Event,
    Function,
    Other(String),
}

impl MemberType {
    pub fn as_str(&self) -> &str {
        match self {
            MemberType::Event => "event",
            MemberType::Function => "function",
            MemberType::Other(other) => other,
        }
    }

    fn is_unspecified(&self) -> bool {
        matches!(self, MemberType::Other(other) if other.is_empty())
    }
}

impl Default for MemberType {
    fn default() -> Self {
        MemberType::Other(String::new())
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for MemberType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "event" => MemberType::Event,
            "function" => MemberType::Function,
            _ => MemberType::Other(value),
        }
    }
}

impl From<MemberType> for String {
    fn from(value: MemberType) -> Self {
        match value {
            MemberType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl Serialize for MemberType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MemberType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(MemberType::from)
    }
}

/// One parameter of an ABI member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiInput {
    /// Solidity type (`address`, `uint256`, ...). Order matters for the signature.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    /// Remaining fields (`name`, `indexed`, `components`, ...), kept as fetched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AbiInput {
    pub fn new(ty: impl Into<String>) -> Self {
        Self {
            ty: Some(ty.into()),
            extra: Map::new(),
        }
    }
}

/// One entry of a contract ABI.
///
/// This is the payload cached under `events/<hash>` and `functions/<hash>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbiMember {
    #[serde(rename = "type", default, skip_serializing_if = "MemberType::is_unspecified")]
    pub member_type: MemberType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<AbiInput>>,

    /// Fields the resolver does not interpret (`outputs`, `anonymous`, `stateMutability`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AbiMember {
    pub fn new(member_type: MemberType, name: impl Into<String>, input_types: &[&str]) -> Self {
        Self {
            member_type,
            name: Some(name.into()),
            inputs: Some(input_types.iter().map(|ty| AbiInput::new(*ty)).collect()),
            extra: Map::new(),
        }
    }

    pub fn event(name: impl Into<String>, input_types: &[&str]) -> Self {
        Self::new(MemberType::Event, name, input_types)
    }

    pub fn function(name: impl Into<String>, input_types: &[&str]) -> Self {
        Self::new(MemberType::Function, name, input_types)
    }

    /// Input types in declaration order. Missing types are skipped.
    pub fn input_types(&self) -> impl Iterator<Item = &str> {
        self.inputs
            .iter()
            .flatten()
            .filter_map(|input| input.ty.as_deref())
    }
}

/// A log paired with the ABI member its first topic resolved to.
///
/// Field values are not decoded; the matched member is what a decoder would
/// need to do so.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedLog {
    #[serde(flatten)]
    pub log: Log,
    pub matched_abi: AbiMember,
}

/// Outcome of resolving one log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResolvedLog {
    Decoded(DecodedLog),
    Unresolved(Log),
}

impl ResolvedLog {
    pub fn decoded(log: Log, matched_abi: AbiMember) -> Self {
        ResolvedLog::Decoded(DecodedLog { log, matched_abi })
    }

    pub fn matched_abi(&self) -> Option<&AbiMember> {
        match self {
            ResolvedLog::Decoded(decoded) => Some(&decoded.matched_abi),
            ResolvedLog::Unresolved(_) => None,
        }
    }

    pub fn log(&self) -> &Log {
        match self {
            ResolvedLog::Decoded(decoded) => &decoded.log,
            ResolvedLog::Unresolved(log) => log,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolvedLog::Decoded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_preserves_unknown_fields() {
        let raw = json!({
            "anonymous": false,
            "inputs": [
                {"indexed": true, "name": "from", "type": "address"},
                {"indexed": true, "name": "to", "type": "address"},
                {"indexed": false, "name": "value", "type": "uint256"}
            ],
            "name": "Transfer",
            "type": "event"
        });

        let member: AbiMember = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(member.member_type, MemberType::Event);
        assert_eq!(
            member.input_types().collect::<Vec<_>>(),
            vec!["address", "address", "uint256"]
        );
        assert_eq!(serde_json::to_value(&member).unwrap(), raw);
    }

    #[test]
    fn test_unrecognized_member_type() {
        let member: AbiMember =
            serde_json::from_value(json!({"type": "fallback", "payable": true})).unwrap();
        assert_eq!(member.member_type, MemberType::Other("fallback".to_string()));
        assert!(member.name.is_none());
        assert_eq!(member.input_types().count(), 0);

        let untyped: AbiMember = serde_json::from_value(json!({"name": "foo"})).unwrap();
        assert_eq!(untyped.member_type, MemberType::default());
        assert_eq!(serde_json::to_value(&untyped).unwrap(), json!({"name": "foo"}));
    }

    #[test]
    fn test_log_camel_case_metadata() {
        let raw = json!({
            "address": "0xAbC0000000000000000000000000000000000001",
            "topics": ["0xDDF252AD1BE2C89B69C2B068FC378DAA952BA7F163C4A11628F55A4DF523B3EF"],
            "data": "0x",
            "blockNumber": "0x10",
            "logIndex": "0x0",
            "removed": false
        });

        let log: Log = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(log.block_number.as_deref(), Some("0x10"));
        assert_eq!(
            log.event_hash().unwrap(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(serde_json::to_value(&log).unwrap(), raw);
    }

    #[test]
    fn test_resolved_log_serialization() {
        let log = Log::new("0xabc", vec!["0x01".to_string()]);
        let unresolved = ResolvedLog::Unresolved(log.clone());
        assert_eq!(
            serde_json::to_value(&unresolved).unwrap(),
            serde_json::to_value(&log).unwrap()
        );

        let decoded = ResolvedLog::decoded(log, AbiMember::event("Ping", &[]));
        let value = serde_json::to_value(&decoded).unwrap();
        assert_eq!(value["address"], "0xabc");
        assert_eq!(value["matchedAbi"]["name"], "Ping");
        assert!(decoded.is_resolved());
    }
}
