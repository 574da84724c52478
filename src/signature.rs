//! Canonical signatures and their keccak256 hashes.
//!
//! The hash of `Transfer(address,address,uint256)` is what an ERC-20 contract
//! puts in `topics[0]` of every transfer log, so the same digest serves as the
//! cache key for both events and functions.

use alloy_primitives::keccak256;

use crate::types::AbiMember;

/// Builds `name(type1,type2,...)`, skipping empty types.
pub fn signature<'a, I>(name: &str, input_types: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let types = input_types
        .into_iter()
        .filter(|ty| !ty.is_empty())
        .collect::<Vec<_>>()
        .join(",");

    format!("{name}({types})")
}

/// Hashes the canonical signature: `0x` followed by 64 lower-case hex characters.
pub fn signature_hash<'a, I>(name: &str, input_types: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let digest = keccak256(signature(name, input_types).as_bytes());
    format!("0x{}", hex::encode(digest))
}

impl AbiMember {
    pub fn signature(&self) -> String {
        signature(self.name.as_deref().unwrap_or_default(), self.input_types())
    }

    pub fn signature_hash(&self) -> String {
        signature_hash(self.name.as_deref().unwrap_or_default(), self.input_types())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AbiInput;

    const TRANSFER_HASH: &str =
        "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
    const APPROVAL_HASH: &str =
        "0x8c5be1e5ebec7d5bd14f71427d1e84f3dd0314c0f7b2291e5b200ac8c7c3b925";

    #[test]
    fn test_erc20_event_hashes() {
        assert_eq!(
            signature_hash("Transfer", ["address", "address", "uint256"]),
            TRANSFER_HASH
        );
        assert_eq!(
            signature_hash("Approval", ["address", "address", "uint256"]),
            APPROVAL_HASH
        );
    }

    #[test]
    fn test_function_selector_prefix() {
        let hash = signature_hash("transfer", ["address", "uint256"]);
        assert!(hash.starts_with("0xa9059cbb"));
        assert_eq!(hash.len(), 66);
    }

    #[test]
    fn test_hash_is_sensitive_to_types_and_order() {
        let base = signature_hash("Transfer", ["address", "address", "uint256"]);
        assert_eq!(base, signature_hash("Transfer", ["address", "address", "uint256"]));
        assert_ne!(base, signature_hash("Transfer", ["address", "uint256", "address"]));
        assert_ne!(base, signature_hash("Transfer", ["address", "address", "uint128"]));
        assert_ne!(base, signature_hash("transfer", ["address", "address", "uint256"]));
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(signature("Paused", []), "Paused()");
        assert_eq!(signature("Paused", ["", ""]), "Paused()");
        assert_eq!(signature("f", ["uint8", "", "bool"]), "f(uint8,bool)");
    }

    #[test]
    fn test_member_signature() {
        let transfer = AbiMember::event("Transfer", &["address", "address", "uint256"]);
        assert_eq!(transfer.signature(), "Transfer(address,address,uint256)");
        assert_eq!(transfer.signature_hash(), TRANSFER_HASH);

        let mut no_inputs = AbiMember::function("totalSupply", &[]);
        assert_eq!(no_inputs.signature(), "totalSupply()");
        no_inputs.inputs = None;
        assert_eq!(no_inputs.signature(), "totalSupply()");

        let mut untyped = AbiMember::event("Ping", &["uint256"]);
        untyped.inputs.as_mut().unwrap().push(AbiInput {
            ty: None,
            extra: Default::default(),
        });
        assert_eq!(untyped.signature(), "Ping(uint256)");

        let nameless = AbiMember {
            name: None,
            ..AbiMember::function("ignored", &[])
        };
        assert_eq!(nameless.signature(), "()");
    }
}
