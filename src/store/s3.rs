//! S3-backed store.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::Builder as S3ConfigBuilder,
    error::SdkError,
    operation::{get_object::GetObjectError, head_object::HeadObjectError},
    primitives::ByteStream,
    Client as S3Client,
};
use std::time::Instant;

use super::{AbiStore, Result, StoreError};

/// S3 client configuration.
#[derive(Debug, Clone)]
pub enum S3Config {
    /// Use the default AWS SDK credential chain.
    Aws,
    /// Use manually specified credentials and endpoint (MinIO, localstack, ...).
    Manual {
        endpoint: String,
        region: String,
        access_key_id: String,
        secret_access_key: String,
    },
}

impl S3Config {
    /// Creates an S3 client from this configuration.
    pub async fn create_s3_client(&self) -> S3Client {
        match self {
            Self::Manual {
                endpoint,
                region,
                access_key_id,
                secret_access_key,
            } => {
                let credentials =
                    Credentials::new(access_key_id, secret_access_key, None, None, "manual");
                let config = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(region.clone()))
                    .endpoint_url(endpoint)
                    .credentials_provider(credentials)
                    .load()
                    .await;
                let s3_config_builder = S3ConfigBuilder::from(&config).force_path_style(true);

                tracing::info!(target: "log_decoder::store::s3", "Manually configuring S3 client for {}", endpoint);
                S3Client::from_conf(s3_config_builder.build())
            }
            Self::Aws => {
                tracing::info!(target: "log_decoder::store::s3", "Using default AWS S3 client");
                let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
                S3Client::new(&config)
            }
        }
    }
}

/// ABI store over a single S3 bucket.
#[derive(Clone, Debug)]
pub struct S3AbiStore {
    s3_client: S3Client,
    bucket: String,
}

impl S3AbiStore {
    pub fn new(s3_client: S3Client, bucket: String) -> Self {
        Self { s3_client, bucket }
    }

    pub async fn from_config(config: &S3Config, bucket: String) -> Self {
        Self::new(config.create_s3_client().await, bucket)
    }
}

fn backend_error(operation: &str, key: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("{operation} {key} failed: {err}"))
}

#[async_trait]
impl AbiStore for S3AbiStore {
    fn label(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let start = Instant::now();
        let response = match self
            .s3_client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), GetObjectError::NoSuchKey(_)) =>
            {
                return Ok(None);
            }
            Err(e) => return Err(backend_error("GetObject", key, e)),
        };

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| backend_error("GetObject body of", key, e))?;

        tracing::trace!(
            target: "log_decoder::store::s3",
            "GetObject {} took {:?}",
            key,
            start.elapsed()
        );

        Ok(Some(body.into_bytes().to_vec()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .s3_client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
            {
                Ok(false)
            }
            Err(e) => Err(backend_error("HeadObject", key, e)),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>) -> Result<()> {
        let start = Instant::now();
        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| backend_error("PutObject", key, e))?;

        tracing::trace!(
            target: "log_decoder::store::s3",
            "PutObject {} took {:?}",
            key,
            start.elapsed()
        );

        Ok(())
    }
}
