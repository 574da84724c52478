//! Configuration for the log decoder server

use clap::{Parser, ValueEnum};
use log_decoder::S3Config;
use std::path::PathBuf;
use url::Url;

/// Where decoded ABI members are cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// S3 bucket (or any S3-compatible endpoint)
    S3,
    /// Directory on the local filesystem
    Local,
    /// Process memory, lost on restart
    Memory,
}

/// Ethereum event log decoder
///
/// Matches each log's first topic against contract ABIs fetched from
/// Etherscan and caches every ABI member in a blob store.
#[derive(Parser, Debug)]
#[command(name = "log-decoder")]
#[command(about = "Resolve Ethereum event logs to their ABI definitions", long_about = None)]
pub struct Config {
    /// Host to bind the HTTP API to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP API
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// ABI store backend
    #[arg(long, env = "ABI_STORE", value_enum, default_value = "s3")]
    pub store: StoreBackend,

    /// Bucket holding the ABI cache (required with `--store s3`)
    #[arg(long, env = "BUCKET_NAME", required_if_eq("store", "s3"))]
    pub bucket_name: Option<String>,

    /// S3-compatible endpoint (MinIO, localstack, ...)
    ///
    /// When unset, the default AWS credential chain and region are used.
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    #[arg(long, env = "S3_REGION", default_value = "us-east-1")]
    pub s3_region: String,

    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    pub s3_access_key_id: Option<String>,

    #[arg(long, env = "S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub s3_secret_access_key: Option<String>,

    /// Directory for `--store local`
    #[arg(long, env = "ABI_STORE_DIR", default_value = "./abi-store")]
    pub store_dir: PathBuf,

    /// Etherscan-compatible API URL
    #[arg(long, env = "ETHERSCAN_API_URL", default_value = log_decoder::source::etherscan::DEFAULT_API_URL)]
    pub etherscan_api_url: Url,

    #[arg(long, env = "ETHERSCAN_API_KEY", hide_env_values = true)]
    pub etherscan_api_key: Option<String>,

    /// Explorer request budget, shared by all requests (0 disables throttling)
    #[arg(long, env = "ETHERSCAN_MAX_RPS", default_value = "5")]
    pub max_requests_per_second: u32,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// S3 client settings: manual when an endpoint is given, AWS defaults otherwise.
    pub fn s3_config(&self) -> Result<S3Config, String> {
        let Some(endpoint) = &self.s3_endpoint else {
            return Ok(S3Config::Aws);
        };

        match (&self.s3_access_key_id, &self.s3_secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Ok(S3Config::Manual {
                endpoint: endpoint.clone(),
                region: self.s3_region.clone(),
                access_key_id: access_key_id.clone(),
                secret_access_key: secret_access_key.clone(),
            }),
            _ => Err(
                "--s3-access-key-id and --s3-secret-access-key are required with --s3-endpoint"
                    .to_string(),
            ),
        }
    }
}
