//! Log decoder - Ethereum event log ABI resolution.
//!
//! Matches each log's first topic against ABI members fetched from a block
//! explorer, caching every member in a blob store so that each contract is
//! fetched at most once.

pub mod error;
pub mod http;
pub mod resolver;
pub mod retry;
pub mod signature;
pub mod source;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use error::ResolveError;
pub use resolver::{Resolver, ResolverConfig};
pub use source::{AbiSource, EtherscanClient, EtherscanConfig, SourceError};
pub use store::{AbiKey, AbiStore, InMemoryAbiStore, LocalAbiStore, S3AbiStore, S3Config, StoreError};
pub use types::{AbiInput, AbiMember, DecodedLog, Log, MemberType, ResolvedLog};

use std::net::SocketAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any as CorsAny, CorsLayer};
use tower_http::trace::TraceLayer;

use http::create_http_router;

/// Give in-flight requests this long to finish once a shutdown signal arrives.
const SERVER_SHUTDOWN_TIMEOUT_SECS: u64 = 15;

/// Configuration for the decoder server.
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    pub resolver: Resolver,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16, resolver: Resolver) -> Self {
        Self {
            host: host.into(),
            port,
            resolver,
        }
    }
}

/// Serves the HTTP API until SIGINT or SIGTERM.
pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let cors = CorsLayer::new()
        .allow_origin(CorsAny)
        .allow_methods(CorsAny)
        .allow_headers(CorsAny);

    let app = create_http_router(config.resolver)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!(target: "log_decoder::main", "Server listening on {}", addr);
    tracing::info!(target: "log_decoder::main", "   POST /decode-logs");
    tracing::info!(target: "log_decoder::main", "   GET  /health");

    let shutdown_token = CancellationToken::new();
    let server_shutdown_token = shutdown_token.clone();

    let shutdown_signal = async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(target: "log_decoder::main", "Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(target: "log_decoder::main", "Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!(target: "log_decoder::main", "Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
            _ = terminate => {
                tracing::info!(target: "log_decoder::main", "Received SIGTERM, initiating graceful shutdown...");
            }
        }

        server_shutdown_token.cancel();
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(target: "log_decoder::main", "Server error: {}", e);
            }
        }
        _ = async {
            shutdown_token.cancelled().await;
            tokio::time::sleep(Duration::from_secs(SERVER_SHUTDOWN_TIMEOUT_SECS)).await;
        } => {
            tracing::warn!(
                target: "log_decoder::main",
                "Server connections did not close within {}s, forcing shutdown",
                SERVER_SHUTDOWN_TIMEOUT_SECS
            );
        }
    }

    tracing::info!(target: "log_decoder::main", "Log decoder shutdown complete");

    Ok(())
}
