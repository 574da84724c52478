//! Log decoder - Ethereum event log ABI resolution service.
//!
//! # Usage
//!
//! ```bash
//! # S3 cache with the default AWS credential chain
//! log-decoder --bucket-name my-abis --etherscan-api-key $KEY
//!
//! # Local MinIO
//! log-decoder --bucket-name abis --s3-endpoint http://localhost:9000 \
//!     --s3-access-key-id minio --s3-secret-access-key minio123
//!
//! # Filesystem cache for local runs
//! log-decoder --store local --store-dir ./abi-store
//! ```

mod config;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{Config, StoreBackend};
use std::sync::Arc;

use log_decoder::{
    AbiStore, EtherscanClient, EtherscanConfig, InMemoryAbiStore, LocalAbiStore, Resolver,
    ResolverConfig, S3AbiStore, ServerConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    tracing::info!(target: "log_decoder::main", "Starting log decoder");
    tracing::info!(target: "log_decoder::main", "Store: {:?}", config.store);
    tracing::info!(target: "log_decoder::main", "Etherscan API: {}", config.etherscan_api_url);
    tracing::info!(
        target: "log_decoder::main",
        "Etherscan rate limit: {} req/s",
        config.max_requests_per_second
    );

    let store = create_store(&config).await?;

    let etherscan = EtherscanClient::new(
        EtherscanConfig::new(config.etherscan_api_url.clone())
            .with_api_key(config.etherscan_api_key.clone())
            .with_max_requests_per_second(config.max_requests_per_second),
    )
    .context("Failed to create Etherscan client")?;

    let resolver = Resolver::new(ResolverConfig::new(store, Arc::new(etherscan)));

    log_decoder::run(ServerConfig::new(config.host, config.port, resolver))
        .await
        .map_err(|e| anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn create_store(config: &Config) -> Result<Arc<dyn AbiStore>> {
    let store: Arc<dyn AbiStore> = match config.store {
        StoreBackend::S3 => {
            let bucket = config
                .bucket_name
                .clone()
                .context("--bucket-name is required with --store s3")?;
            let s3_config = config.s3_config().map_err(|e| anyhow!(e))?;
            tracing::info!(target: "log_decoder::main", "Using S3 bucket {}", bucket);
            Arc::new(S3AbiStore::from_config(&s3_config, bucket).await)
        }
        StoreBackend::Local => {
            let store = LocalAbiStore::new(config.store_dir.clone())
                .await
                .with_context(|| {
                    format!("Failed to open store at {}", config.store_dir.display())
                })?;
            Arc::new(store)
        }
        StoreBackend::Memory => {
            tracing::warn!(
                target: "log_decoder::main",
                "Using in-memory store, cached ABIs are lost on restart"
            );
            Arc::new(InMemoryAbiStore::new())
        }
    };

    Ok(store)
}
