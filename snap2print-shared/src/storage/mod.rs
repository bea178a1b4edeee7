//! Upload storage.
//!
//! Every uploaded file is written exactly once, either to a local directory
//! or to an S3-compatible bucket, and the caller gets back a reference string
//! that is stored on the print job. Which backend is used is decided once per
//! process from configuration: object storage is enabled only when bucket,
//! endpoint and both credentials are all set.
//!
//! ```no_run
//! use snap2print_shared::storage::{FilePayload, StorageConfig, StorageRouter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let router = StorageRouter::from_config(StorageConfig::disk("uploads")).await?;
//! let stored = router
//!     .store(&FilePayload::new("notes.pdf", Some("application/pdf".into()), vec![1, 2, 3]))
//!     .await?;
//! assert!(stored.reference.starts_with("/uploads/"));
//! # Ok(())
//! # }
//! ```

mod disk;
mod s3;

pub use disk::{DiskStorage, UPLOADS_URL_PREFIX};
pub use s3::{object_reference, S3Settings, S3Storage};

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use rand::RngCore;
use tracing::{debug, error};

use crate::models::print_job::DEFAULT_CONTENT_TYPE;

/// Errors raised while writing or probing storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("object storage upload failed: {0}")]
    Upload(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// One uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct FilePayload {
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl FilePayload {
    pub fn new(
        original_name: impl Into<String>,
        content_type: Option<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            original_name: original_name.into(),
            content_type,
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Declared content type, or `application/octet-stream`
    pub fn content_type_or_default(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Result of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Resolvable reference recorded on the print job
    pub reference: String,
    /// Object key / file name the bytes were written under
    pub key: String,
    pub size_bytes: u64,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Disk,
    S3,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Disk => "disk",
            StorageKind::S3 => "s3",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A place uploaded bytes can be written to
#[async_trait]
pub trait FileStore: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// Writes the payload under `key` and returns its reference
    async fn put(&self, key: &str, payload: &FilePayload) -> Result<String, StorageError>;

    /// Checks the backend can accept writes
    async fn health_check(&self) -> Result<(), StorageError>;
}

/// Storage settings resolved from the environment
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
    /// Set only when object storage is fully configured
    pub s3: Option<S3Settings>,
    /// Accepted content types; empty accepts everything
    pub allowed_content_types: Vec<String>,
}

impl StorageConfig {
    /// Disk-backed config accepting every content type
    pub fn disk(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            s3: None,
            allowed_content_types: Vec::new(),
        }
    }
}

/// Routes uploads to the backend selected at startup
#[derive(Clone)]
pub struct StorageRouter {
    backend: Arc<dyn FileStore>,
    allowed_content_types: Arc<Vec<String>>,
}

impl StorageRouter {
    pub fn new(backend: Arc<dyn FileStore>, allowed_content_types: Vec<String>) -> Self {
        Self {
            backend,
            allowed_content_types: Arc::new(allowed_content_types),
        }
    }

    /// Builds the S3 backend when configured, otherwise prepares the uploads
    /// directory and uses disk
    pub async fn from_config(config: StorageConfig) -> Result<Self, StorageError> {
        let backend: Arc<dyn FileStore> = match config.s3 {
            Some(settings) => Arc::new(S3Storage::new(settings).await),
            None => Arc::new(DiskStorage::new(config.uploads_dir).await?),
        };

        Ok(Self::new(backend, config.allowed_content_types))
    }

    pub fn kind(&self) -> StorageKind {
        self.backend.kind()
    }

    /// Whether a declared content type passes the allowlist
    ///
    /// Entries ending in `/*` match a whole family (`image/*`).
    pub fn is_allowed(&self, content_type: &str) -> bool {
        content_type_allowed(&self.allowed_content_types, content_type)
    }

    /// Writes one file under a fresh unique key
    pub async fn store(&self, payload: &FilePayload) -> Result<StoredFile, StorageError> {
        let key = object_key(
            &payload.original_name,
            Utc::now().timestamp_millis(),
            &random_suffix(),
        );

        let reference = self.backend.put(&key, payload).await.map_err(|e| {
            error!(key = %key, backend = %self.kind(), error = %e, "Failed to store upload");
            e
        })?;

        debug!(key = %key, reference = %reference, size = payload.size(), "Stored upload");

        Ok(StoredFile {
            reference,
            key,
            size_bytes: payload.size() as u64,
            content_type: payload.content_type_or_default().to_string(),
        })
    }

    pub async fn health_check(&self) -> Result<(), StorageError> {
        self.backend.health_check().await
    }
}

/// Replaces every character outside `[A-Za-z0-9._-]` with `_`
///
/// An empty name becomes `file`.
pub fn sanitize_filename(name: &str) -> String {
    if name.is_empty() {
        return "file".to_string();
    }

    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Longest sanitized name kept in an object key
const MAX_KEY_NAME_LEN: usize = 120;

/// Longest extension (dot included) preserved when a name is shortened
const MAX_EXTENSION_LEN: usize = 16;

/// `{millis}-{suffix}-{sanitized name}`
///
/// Names over `MAX_KEY_NAME_LEN` are shortened, keeping the extension, so
/// the key stays within filesystem name limits.
pub fn object_key(original_name: &str, millis: i64, suffix: &str) -> String {
    let name = shorten_name(sanitize_filename(original_name));
    format!("{}-{}-{}", millis, suffix, name)
}

// Input is sanitized ASCII, so byte offsets are char boundaries.
fn shorten_name(name: String) -> String {
    if name.len() <= MAX_KEY_NAME_LEN {
        return name;
    }

    let extension = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LEN => &name[dot..],
        _ => "",
    };
    format!(
        "{}{}",
        &name[..MAX_KEY_NAME_LEN - extension.len()],
        extension
    )
}

fn random_suffix() -> String {
    let mut bytes = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn content_type_allowed(allowed: &[String], content_type: &str) -> bool {
    if allowed.is_empty() {
        return true;
    }

    let content_type = content_type.trim().to_ascii_lowercase();
    allowed.iter().any(|entry| match entry.strip_suffix("/*") {
        Some(family) => content_type
            .split_once('/')
            .is_some_and(|(head, _)| head == family),
        None => *entry == content_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.pdf"), "notes.pdf");
        assert_eq!(sanitize_filename("my notes (1).pdf"), "my_notes__1_.pdf");
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_filename("résumé.pdf"), "r_sum_.pdf");
        assert_eq!(sanitize_filename(""), "file");
    }

    #[test]
    fn test_object_key_format() {
        assert_eq!(
            object_key("Lab Report.pdf", 1700000000000, "0a1b2c3d"),
            "1700000000000-0a1b2c3d-Lab_Report.pdf"
        );
    }

    #[test]
    fn test_object_key_shortens_long_names() {
        let long = format!("{}.pdf", "a".repeat(250));
        let key = object_key(&long, 1_700_000_000_000, "0a1b2c3d");
        let name = key.trim_start_matches("1700000000000-0a1b2c3d-");

        assert_eq!(name.len(), MAX_KEY_NAME_LEN);
        assert!(name.ends_with(".pdf"));
        assert!(name.starts_with("aaaa"));

        // An overlong "extension" is not preserved
        let no_ext = format!("report.{}", "x".repeat(200));
        let name = shorten_name(sanitize_filename(&no_ext));
        assert_eq!(name.len(), MAX_KEY_NAME_LEN);
        assert!(name.starts_with("report."));

        // Short names pass through untouched
        assert_eq!(shorten_name("notes.pdf".to_string()), "notes.pdf");
    }

    #[test]
    fn test_random_suffix_is_hex() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_content_type_allowlist() {
        assert!(content_type_allowed(&[], "application/zip"));

        let allowed = vec!["application/pdf".to_string(), "image/*".to_string()];
        assert!(content_type_allowed(&allowed, "application/pdf"));
        assert!(content_type_allowed(&allowed, "image/png"));
        assert!(content_type_allowed(&allowed, "IMAGE/JPEG"));
        assert!(!content_type_allowed(&allowed, "application/zip"));
        assert!(!content_type_allowed(&allowed, "imagery"));
    }

    #[test]
    fn test_payload_default_content_type() {
        let payload = FilePayload::new("a.bin", None, vec![0u8; 4]);
        assert_eq!(payload.content_type_or_default(), "application/octet-stream");
        assert_eq!(payload.size(), 4);

        let empty = FilePayload::new("a.bin", Some(String::new()), Vec::new());
        assert_eq!(empty.content_type_or_default(), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_router_stores_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let router = StorageRouter::from_config(StorageConfig::disk(dir.path()))
            .await
            .unwrap();
        assert_eq!(router.kind(), StorageKind::Disk);

        let payload = FilePayload::new("notes.pdf", Some("application/pdf".into()), b"%PDF".to_vec());
        let first = router.store(&payload).await.unwrap();
        let second = router.store(&payload).await.unwrap();

        assert_ne!(first.reference, second.reference);
        assert!(first.key.ends_with("-notes.pdf"));
        assert_eq!(first.size_bytes, 4);
        assert_eq!(first.content_type, "application/pdf");

        let on_disk = tokio::fs::read(dir.path().join(&first.key)).await.unwrap();
        assert_eq!(on_disk, b"%PDF");
    }
}
