//! Store configuration types.

use serde::{Deserialize, Serialize};

/// Remote store backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum StoreConfig {
    /// Amazon S3 compatible storage.
    S3(S3Config),
    /// Google Cloud Storage.
    Gcs(GcsConfig),
    /// Azure Blob Storage.
    AzureBlob(AzblobConfig),
    /// Local filesystem (tests, single-node deployments).
    Fs(FsConfig),
    /// In-memory storage (tests).
    Memory,
}

impl StoreConfig {
    /// Returns the backend name as a static string.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::S3(_) => "s3",
            Self::Gcs(_) => "gcs",
            Self::AzureBlob(_) => "azblob",
            Self::Fs(_) => "fs",
            Self::Memory => "memory",
        }
    }

    /// Returns the base URL under which stored keys are publicly
    /// resolvable, if the backend advertises one.
    pub fn public_base_url(&self) -> Option<&str> {
        match self {
            Self::S3(config) => config.public_base_url.as_deref(),
            Self::Gcs(config) => config.public_base_url.as_deref(),
            Self::AzureBlob(config) => config.public_base_url.as_deref(),
            Self::Fs(_) | Self::Memory => None,
        }
    }
}

/// Amazon S3 configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Config {
    /// Bucket name.
    pub bucket: String,
    /// AWS region.
    pub region: String,
    /// Custom endpoint URL (for S3-compatible storage like MinIO, R2).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Access key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,
    /// Secret access key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,
    /// Base URL under which objects are publicly resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

impl S3Config {
    /// Creates a new S3 configuration.
    pub fn new(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: region.into(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            public_base_url: None,
        }
    }

    /// Sets the custom endpoint (for S3-compatible storage).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the access credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    /// Sets the public base URL for stored objects.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }
}

/// Google Cloud Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcsConfig {
    /// Bucket name.
    pub bucket: String,
    /// Base URL under which objects are publicly resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

impl GcsConfig {
    /// Creates a new GCS configuration.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            public_base_url: None,
        }
    }

    /// Sets the public base URL for stored objects.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }
}

/// Azure Blob Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AzblobConfig {
    /// Container name.
    pub container: String,
    /// Storage account name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    /// Storage account key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_key: Option<String>,
    /// Base URL under which objects are publicly resolvable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

impl AzblobConfig {
    /// Creates a new Azure Blob configuration.
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            account_name: None,
            account_key: None,
            public_base_url: None,
        }
    }

    /// Sets the account credentials.
    pub fn with_account(
        mut self,
        account_name: impl Into<String>,
        account_key: impl Into<String>,
    ) -> Self {
        self.account_name = Some(account_name.into());
        self.account_key = Some(account_key.into());
        self
    }

    /// Sets the public base URL for stored objects.
    pub fn with_public_base_url(mut self, url: impl Into<String>) -> Self {
        self.public_base_url = Some(url.into());
        self
    }
}

/// Local filesystem configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsConfig {
    /// Root directory for stored objects.
    pub root: String,
}

impl FsConfig {
    /// Creates a new filesystem configuration.
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}
