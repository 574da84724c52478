//! Etherscan-compatible block explorer client.
//!
//! Uses the `contract/getabi` endpoint:
//!
//! ```text
//! GET <api_url>?module=contract&action=getabi&address=<address>&apikey=<key>
//! ```
//!
//! The explorer always answers `200` with `{status, message, result}`. On
//! success `status` is `"1"` and `result` is the ABI encoded as a JSON string;
//! otherwise `result` carries a human-readable reason.

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::{AbiSource, SourceError};
use crate::retry::RetryPolicy;
use crate::types::AbiMember;

pub const DEFAULT_API_URL: &str = "https://api.etherscan.io/api";

/// Configuration for [`EtherscanClient`].
#[derive(Debug, Clone)]
pub struct EtherscanConfig {
    pub api_url: Url,

    pub api_key: Option<String>,

    /// Global request budget shared by every caller of the client (0 = unthrottled).
    pub max_requests_per_second: u32,

    pub request_timeout: Duration,

    pub retry_policy: RetryPolicy,
}

impl EtherscanConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            api_key: None,
            max_requests_per_second: 5,
            request_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_max_requests_per_second(mut self, max: u32) -> Self {
        self.max_requests_per_second = max;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

#[derive(Clone)]
pub struct EtherscanClient {
    client: reqwest::Client,
    config: EtherscanConfig,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl EtherscanClient {
    pub fn new(config: EtherscanConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let rate_limiter = NonZeroU32::new(config.max_requests_per_second)
            .map(|limit| Arc::new(RateLimiter::direct(Quota::per_second(limit))));

        Ok(Self {
            client,
            config,
            rate_limiter,
        })
    }

    async fn request_abi(&self, address: &str) -> Result<Vec<AbiMember>, SourceError> {
        if let Some(rate_limiter) = &self.rate_limiter {
            rate_limiter.until_ready().await;
        }

        let mut query = vec![
            ("module", "contract"),
            ("action", "getabi"),
            ("address", address),
        ];
        if let Some(api_key) = &self.config.api_key {
            query.push(("apikey", api_key.as_str()));
        }

        let response = self
            .client
            .get(self.config.api_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&query)
            .send()
            .await?
            .error_for_status()?;

        let body: EtherscanResponse = response.json().await?;
        parse_response(address, body)
    }
}

fn parse_response(address: &str, body: EtherscanResponse) -> Result<Vec<AbiMember>, SourceError> {
    if body.status == "1" {
        let abi_json: String = serde_json::from_value(body.result)?;
        return Ok(serde_json::from_str(&abi_json)?);
    }

    let reason = body
        .result
        .as_str()
        .filter(|reason| !reason.is_empty())
        .unwrap_or(&body.message)
        .to_string();
    let lowered = reason.to_lowercase();

    if lowered.contains("not verified") {
        Err(SourceError::NotFound(address.to_string()))
    } else if lowered.contains("rate limit") {
        Err(SourceError::RateLimited(reason))
    } else {
        Err(SourceError::Upstream(reason))
    }
}

#[async_trait]
impl AbiSource for EtherscanClient {
    async fn fetch_abi(&self, address: &str) -> Result<Vec<AbiMember>, SourceError> {
        tracing::debug!(
            target: "log_decoder::source::etherscan",
            "Fetching ABI for {}",
            address
        );

        let abi = self
            .config
            .retry_policy
            .execute(|| self.request_abi(address), SourceError::is_transient)
            .await?;

        tracing::debug!(
            target: "log_decoder::source::etherscan",
            "Fetched {} ABI member(s) for {}",
            abi.len(),
            address
        );

        Ok(abi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemberType;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Instant;

    const ADDRESS: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    fn test_config(server: &mockito::ServerGuard) -> EtherscanConfig {
        EtherscanConfig::new(Url::parse(&format!("{}/api", server.url())).unwrap())
            .with_api_key(Some("test-key".to_string()))
            .with_max_requests_per_second(0)
            .with_retry_policy(RetryPolicy::new(
                2,
                Duration::from_millis(5),
                Duration::from_millis(10),
                2.0,
            ))
    }

    fn abi_query() -> Matcher {
        Matcher::AllOf(vec![
            Matcher::UrlEncoded("module".into(), "contract".into()),
            Matcher::UrlEncoded("action".into(), "getabi".into()),
            Matcher::UrlEncoded("address".into(), ADDRESS.into()),
            Matcher::UrlEncoded("apikey".into(), "test-key".into()),
        ])
    }

    fn explorer_body(status: &str, message: &str, result: &str) -> String {
        json!({"status": status, "message": message, "result": result}).to_string()
    }

    #[tokio::test]
    async fn test_fetch_abi_success() {
        let mut server = mockito::Server::new_async().await;
        let abi = json!([
            {
                "anonymous": false,
                "inputs": [
                    {"indexed": true, "name": "from", "type": "address"},
                    {"indexed": true, "name": "to", "type": "address"},
                    {"indexed": false, "name": "value", "type": "uint256"}
                ],
                "name": "Transfer",
                "type": "event"
            },
            {"inputs": [], "name": "totalSupply", "outputs": [{"type": "uint256"}], "type": "function"}
        ]);
        let mock = server
            .mock("GET", "/api")
            .match_query(abi_query())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(explorer_body("1", "OK", &abi.to_string()))
            .create_async()
            .await;

        let client = EtherscanClient::new(test_config(&server)).unwrap();
        let members = client.fetch_abi(ADDRESS).await.unwrap();

        mock.assert_async().await;
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].member_type, MemberType::Event);
        assert_eq!(members[0].signature(), "Transfer(address,address,uint256)");
        assert_eq!(members[1].member_type, MemberType::Function);
    }

    #[tokio::test]
    async fn test_unverified_contract_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(abi_query())
            .with_status(200)
            .with_body(explorer_body("0", "NOTOK", "Contract source code not verified"))
            .expect(1)
            .create_async()
            .await;

        let client = EtherscanClient::new(test_config(&server)).unwrap();
        let err = client.fetch_abi(ADDRESS).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, SourceError::NotFound(address) if address == ADDRESS));
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(abi_query())
            .with_status(200)
            .with_body(explorer_body(
                "0",
                "NOTOK",
                "Max rate limit reached, please use API Key for higher rate limit",
            ))
            .expect(3)
            .create_async()
            .await;

        let client = EtherscanClient::new(test_config(&server)).unwrap();
        let err = client.fetch_abi(ADDRESS).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, SourceError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(abi_query())
            .with_status(502)
            .expect(3)
            .create_async()
            .await;

        let client = EtherscanClient::new(test_config(&server)).unwrap();
        let err = client.fetch_abi(ADDRESS).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, SourceError::Transport(_)));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_abi() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api")
            .match_query(abi_query())
            .with_status(200)
            .with_body(explorer_body("1", "OK", "this is not an abi"))
            .create_async()
            .await;

        let client = EtherscanClient::new(test_config(&server)).unwrap();
        let err = client.fetch_abi(ADDRESS).await.unwrap_err();

        assert!(matches!(err, SourceError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_requests_are_throttled() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(abi_query())
            .with_status(200)
            .with_body(explorer_body("1", "OK", "[]"))
            .expect(3)
            .create_async()
            .await;

        let config = test_config(&server).with_max_requests_per_second(2);
        let client = EtherscanClient::new(config).unwrap();

        let start = Instant::now();
        for _ in 0..3 {
            assert!(client.fetch_abi(ADDRESS).await.unwrap().is_empty());
        }

        mock.assert_async().await;
        // Burst of two, the third request waits for a refill.
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[test]
    fn test_parse_response_falls_back_to_message() {
        let body = EtherscanResponse {
            status: "0".to_string(),
            message: "Invalid API Key".to_string(),
            result: Value::Null,
        };
        assert!(matches!(
            parse_response(ADDRESS, body),
            Err(SourceError::Upstream(reason)) if reason == "Invalid API Key"
        ));
    }
}
