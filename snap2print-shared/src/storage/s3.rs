use async_trait::async_trait;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, error, info};

use super::{FilePayload, FileStore, StorageError, StorageKind};

/// Connection settings for an S3-compatible bucket
#[derive(Clone)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    /// Public URL prefix for stored objects, if the bucket is exposed
    pub public_base: Option<String>,
}

impl std::fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Settings")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("public_base", &self.public_base)
            .finish()
    }
}

impl S3Settings {
    /// Returns settings only when bucket, endpoint and both keys are present
    ///
    /// Blank values count as missing.
    pub fn from_parts(
        bucket: Option<String>,
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        region: Option<String>,
        public_base: Option<String>,
    ) -> Option<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        Some(Self {
            bucket: present(bucket)?,
            endpoint: present(endpoint)?,
            access_key_id: present(access_key_id)?,
            secret_access_key: present(secret_access_key)?,
            region: present(region).unwrap_or_else(|| "auto".to_string()),
            public_base: present(public_base),
        })
    }
}

/// Formats the reference recorded for an uploaded object
///
/// `{public_base}/{key}` when a public base is configured (trailing slash
/// trimmed), otherwise `s3://{bucket}/{key}`.
pub fn object_reference(public_base: Option<&str>, bucket: &str, key: &str) -> String {
    match public_base {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!("s3://{bucket}/{key}"),
    }
}

/// Uploads into an S3-compatible bucket using path-style addressing
pub struct S3Storage {
    settings: S3Settings,
    client: aws_sdk_s3::Client,
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("settings", &self.settings)
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl S3Storage {
    /// Builds a client with static credentials and the configured endpoint
    pub async fn new(settings: S3Settings) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id.clone(),
            settings.secret_access_key.clone(),
            None,
            None,
            "snap2print-static",
        );

        debug!(endpoint = %settings.endpoint, region = %settings.region, "Building S3 client");

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()))
            .endpoint_url(&settings.endpoint)
            .credentials_provider(credentials)
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();

        info!(bucket = %settings.bucket, "Object storage enabled");

        Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            settings,
        }
    }

    /// Uses a pre-built client
    pub fn with_client(settings: S3Settings, client: aws_sdk_s3::Client) -> Self {
        Self { settings, client }
    }
}

#[async_trait]
impl FileStore for S3Storage {
    fn kind(&self) -> StorageKind {
        StorageKind::S3
    }

    async fn put(&self, key: &str, payload: &FilePayload) -> Result<String, StorageError> {
        debug!(bucket = %self.settings.bucket, key, size = payload.size(), "Uploading object");

        self.client
            .put_object()
            .bucket(&self.settings.bucket)
            .key(key)
            .body(ByteStream::from(payload.bytes.clone()))
            .content_type(payload.content_type_or_default())
            .send()
            .await
            .map_err(|e| {
                let message = aws_sdk_s3::error::DisplayErrorContext(&e).to_string();
                error!(bucket = %self.settings.bucket, key, error = %message, "S3 put_object failed");
                StorageError::Upload(message)
            })?;

        Ok(object_reference(
            self.settings.public_base.as_deref(),
            &self.settings.bucket,
            key,
        ))
    }

    async fn health_check(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.settings.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| {
                StorageError::Unavailable(aws_sdk_s3::error::DisplayErrorContext(&e).to_string())
            })
    }
}
