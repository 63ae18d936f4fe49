//! OpenDAL-backed remote store.

use bytes::Bytes;
use opendal::{Operator, services};

use crate::TRACING_TARGET;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::BlobStore;

/// Remote object store wrapping an OpenDAL [`Operator`].
///
/// The remote store is treated as a flat key-value space; keys carry no
/// hierarchy semantics. URLs are built from the configured public base
/// URL when one exists, otherwise rendered with the `objstore://`
/// scheme so callers can still distinguish remote locations.
#[derive(Clone)]
pub struct RemoteStore {
    operator: Operator,
    config: StoreConfig,
}

impl RemoteStore {
    /// Creates a new remote store from configuration.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let operator = Self::create_operator(&config)?;

        tracing::info!(
            target: TRACING_TARGET,
            backend = config.backend_name(),
            "Remote store initialized"
        );

        Ok(Self { operator, config })
    }

    /// Returns the configuration for this store.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the URL under which `key` resolves once stored.
    pub fn url_for(&self, key: &str) -> String {
        match self.config.public_base_url() {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
            None => format!("objstore://{}/{}", self.config.backend_name(), key),
        }
    }

    /// Verify that the backing store is reachable.
    ///
    /// Issues a stat for a probe key; a not-found response is treated
    /// as success (the bucket/container exists), any other error is
    /// propagated.
    pub async fn verify_reachable(&self) -> StoreResult<()> {
        match self.operator.stat("_fixly_verify_probe").await {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == opendal::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Creates an OpenDAL operator based on configuration.
    #[allow(unreachable_patterns)]
    fn create_operator(config: &StoreConfig) -> StoreResult<Operator> {
        match config {
            #[cfg(feature = "s3")]
            StoreConfig::S3(s3) => {
                let mut builder = services::S3::default()
                    .bucket(&s3.bucket)
                    .region(&s3.region);

                if let Some(ref endpoint) = s3.endpoint {
                    builder = builder.endpoint(endpoint);
                }

                if let Some(ref access_key_id) = s3.access_key_id {
                    builder = builder.access_key_id(access_key_id);
                }

                if let Some(ref secret_access_key) = s3.secret_access_key {
                    builder = builder.secret_access_key(secret_access_key);
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StoreError::init(e.to_string()))
            }

            #[cfg(feature = "gcs")]
            StoreConfig::Gcs(gcs) => {
                let builder = services::Gcs::default().bucket(&gcs.bucket);

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StoreError::init(e.to_string()))
            }

            #[cfg(feature = "azblob")]
            StoreConfig::AzureBlob(azblob) => {
                let mut builder = services::Azblob::default().container(&azblob.container);

                if let Some(ref account_name) = azblob.account_name {
                    builder = builder.account_name(account_name);
                }

                if let Some(ref account_key) = azblob.account_key {
                    builder = builder.account_key(account_key);
                }

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StoreError::init(e.to_string()))
            }

            #[cfg(feature = "fs")]
            StoreConfig::Fs(fs) => {
                let builder = services::Fs::default().root(&fs.root);

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StoreError::init(e.to_string()))
            }

            #[cfg(any(feature = "memory", test))]
            StoreConfig::Memory => {
                let builder = services::Memory::default();

                Operator::new(builder)
                    .map(|op| op.finish())
                    .map_err(|e| StoreError::init(e.to_string()))
            }

            // Reached when the config names a backend whose cargo
            // feature is disabled.
            #[allow(unreachable_patterns)]
            other => Err(StoreError::init(format!(
                "backend {:?} is not supported with current features",
                other.backend_name()
            ))),
        }
    }
}

#[async_trait::async_trait]
impl BlobStore for RemoteStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StoreResult<String> {
        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            size = data.len(),
            content_type = %content_type,
            "Writing object"
        );

        self.operator
            .write_with(key, data)
            .content_type(content_type)
            .await?;

        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            "Object write complete"
        );

        Ok(self.url_for(key))
    }

    async fn get(&self, key: &str) -> StoreResult<Bytes> {
        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            "Reading object"
        );

        let data = self.operator.read(key).await?.to_bytes();

        Ok(data)
    }

    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.operator.exists(key).await?)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            key = %key,
            "Deleting object"
        );

        self.operator.delete(key).await?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<String>> {
        use futures::TryStreamExt;

        let entries: Vec<_> = self.operator.lister(prefix).await?.try_collect().await?;

        Ok(entries.into_iter().map(|e| e.path().to_string()).collect())
    }
}
