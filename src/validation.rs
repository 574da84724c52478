//! Shape checks for incoming decode requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Log;

pub const MAX_LOGS_PER_REQUEST: usize = 100;
pub const MAX_TOPICS: usize = 4;

/// Body of `POST /decode-logs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecodeLogsRequest {
    pub logs: Vec<Log>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("request body does not match the expected shape: {0}")]
    Shape(String),
    #[error("\"logs\" must contain at least 1 item")]
    EmptyBatch,
    #[error("\"logs\" must contain at most 100 items, got {0}")]
    TooManyLogs(usize),
    #[error("logs[{index}].address must be a 20-byte hex string, got {value:?}")]
    InvalidAddress { index: usize, value: String },
    #[error("logs[{index}].topics must contain at most 4 items, got {count}")]
    TooManyTopics { index: usize, count: usize },
    #[error("logs[{index}].topics[{position}] must be a 32-byte hex string, got {value:?}")]
    InvalidTopic {
        index: usize,
        position: usize,
        value: String,
    },
    #[error("logs[{index}].{field} must be a 0x-prefixed hex string")]
    InvalidHex { index: usize, field: &'static str },
}

/// Validates a parsed JSON body and turns it into a typed request.
pub fn validate_request(body: Value) -> Result<DecodeLogsRequest, ValidationError> {
    let request: DecodeLogsRequest =
        serde_json::from_value(body).map_err(|e| ValidationError::Shape(e.to_string()))?;

    if request.logs.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    if request.logs.len() > MAX_LOGS_PER_REQUEST {
        return Err(ValidationError::TooManyLogs(request.logs.len()));
    }

    for (index, log) in request.logs.iter().enumerate() {
        validate_log(index, log)?;
    }

    Ok(request)
}

fn validate_log(index: usize, log: &Log) -> Result<(), ValidationError> {
    if !is_hex_of_len(&log.address, 20) {
        return Err(ValidationError::InvalidAddress {
            index,
            value: log.address.clone(),
        });
    }

    if log.topics.len() > MAX_TOPICS {
        return Err(ValidationError::TooManyTopics {
            index,
            count: log.topics.len(),
        });
    }
    if let Some((position, topic)) = log
        .topics
        .iter()
        .enumerate()
        .find(|(_, topic)| !is_hex_of_len(topic, 32))
    {
        return Err(ValidationError::InvalidTopic {
            index,
            position,
            value: topic.clone(),
        });
    }

    if !is_hex(&log.data) {
        return Err(ValidationError::InvalidHex {
            index,
            field: "data",
        });
    }

    let optional_hex = [
        ("blockHash", &log.block_hash),
        ("blockNumber", &log.block_number),
        ("transactionHash", &log.transaction_hash),
        ("transactionIndex", &log.transaction_index),
        ("logIndex", &log.log_index),
    ];
    for (field, value) in optional_hex {
        if value.as_deref().is_some_and(|value| !is_hex(value)) {
            return Err(ValidationError::InvalidHex { index, field });
        }
    }

    Ok(())
}

fn hex_digits(value: &str) -> Option<&str> {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .filter(|digits| digits.chars().all(|c| c.is_ascii_hexdigit()))
}

fn is_hex(value: &str) -> bool {
    hex_digits(value).is_some()
}

fn is_hex_of_len(value: &str, bytes: usize) -> bool {
    hex_digits(value).is_some_and(|digits| digits.len() == bytes * 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TRANSFER: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    fn log_json() -> Value {
        json!({
            "address": USDC,
            "topics": [TRANSFER],
            "data": "0x00000000000000000000000000000000000000000000000000000000000003e8",
            "blockNumber": "0x112a880",
            "logIndex": "0x1"
        })
    }

    #[test]
    fn test_valid_request() {
        let request = validate_request(json!({"logs": [log_json(), log_json()]})).unwrap();
        assert_eq!(request.logs.len(), 2);
        assert_eq!(request.logs[0].address, USDC);
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            validate_request(json!({})),
            Err(ValidationError::Shape(_))
        ));
        assert!(matches!(
            validate_request(json!({"logs": [{"topics": []}]})),
            Err(ValidationError::Shape(_))
        ));
        assert!(matches!(
            validate_request(json!({"logs": "nope"})),
            Err(ValidationError::Shape(_))
        ));
    }

    #[test]
    fn test_batch_bounds() {
        assert_eq!(
            validate_request(json!({"logs": []})).unwrap_err(),
            ValidationError::EmptyBatch
        );

        let logs: Vec<Value> = (0..=MAX_LOGS_PER_REQUEST).map(|_| log_json()).collect();
        assert_eq!(
            validate_request(json!({ "logs": logs })).unwrap_err(),
            ValidationError::TooManyLogs(MAX_LOGS_PER_REQUEST + 1)
        );

        let logs: Vec<Value> = (0..MAX_LOGS_PER_REQUEST).map(|_| log_json()).collect();
        assert!(validate_request(json!({ "logs": logs })).is_ok());
    }

    #[test]
    fn test_field_errors() {
        let mut log = log_json();
        log["address"] = json!("0x1234");
        assert!(matches!(
            validate_request(json!({"logs": [log]})),
            Err(ValidationError::InvalidAddress { index: 0, .. })
        ));

        let mut log = log_json();
        log["topics"] = json!([TRANSFER, TRANSFER, TRANSFER, TRANSFER, TRANSFER]);
        assert!(matches!(
            validate_request(json!({"logs": [log_json(), log]})),
            Err(ValidationError::TooManyTopics { index: 1, count: 5 })
        ));

        let mut log = log_json();
        log["topics"] = json!([TRANSFER, "0xzz"]);
        assert!(matches!(
            validate_request(json!({"logs": [log]})),
            Err(ValidationError::InvalidTopic { index: 0, position: 1, .. })
        ));

        let mut log = log_json();
        log["data"] = json!("deadbeef");
        assert!(matches!(
            validate_request(json!({"logs": [log]})),
            Err(ValidationError::InvalidHex { field: "data", .. })
        ));

        let mut log = log_json();
        log["blockHash"] = json!("0xnothex");
        assert!(matches!(
            validate_request(json!({"logs": [log]})),
            Err(ValidationError::InvalidHex { field: "blockHash", .. })
        ));
    }

    #[test]
    fn test_log_without_topics_is_valid() {
        let mut log = log_json();
        log["topics"] = json!([]);
        assert!(validate_request(json!({"logs": [log]})).is_ok());
    }
}
