//! Print job submission.
//!
//! A submission names a shop, a submitter and zero or more files with shared
//! print options. Everything that can be checked without side effects is
//! checked first (shop exists, name present, options valid, content types
//! allowed); only then are files written and jobs created, one per file.
//!
//! Multi-file submissions are processed concurrently and are not
//! transactional: if one file fails, jobs already created for its siblings
//! are kept and reported in [`SubmissionError::PartialFailure`].

use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::models::{CreatePrintJob, PrintJob, PrintType, Shop};
use crate::storage::{FilePayload, StorageError, StorageRouter};
use crate::store::{Store, StoreError};

/// Status reported for metadata-only submissions
pub const RECEIVED_STATUS: &str = "received";

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Shop not found")]
    ShopNotFound,

    #[error("{0}")]
    Validation(String),

    #[error("failed to store {file}: {source}")]
    Storage {
        file: String,
        #[source]
        source: StorageError,
    },

    /// Some files failed; the jobs in `created` were kept
    #[error("{} of {} files failed to submit", .failures.len(), .failures.len() + .created.len())]
    PartialFailure {
        created: Vec<PrintJob>,
        failures: Vec<FileFailure>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A file that could not be stored or recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

/// Print options exactly as the client sent them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrintOptionsInput {
    pub copies: Option<String>,
    pub print_type: Option<String>,
}

/// Validated print options shared by every job of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintOptions {
    pub copies: i32,
    pub print_type: PrintType,
}

fn blank_to_none(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl PrintOptionsInput {
    pub fn new(copies: Option<String>, print_type: Option<String>) -> Self {
        Self { copies, print_type }
    }

    /// Applies defaults and rejects values that are present but invalid
    pub fn resolve(&self) -> Result<PrintOptions, SubmissionError> {
        let copies = match blank_to_none(self.copies.as_deref()) {
            None => 1,
            Some(raw) => match raw.parse::<i32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(SubmissionError::Validation(
                        "copies must be a whole number of at least 1".to_string(),
                    ))
                }
            },
        };

        let print_type = match blank_to_none(self.print_type.as_deref()) {
            None => PrintType::default(),
            Some(raw) => raw
                .parse::<PrintType>()
                .map_err(|e| SubmissionError::Validation(e.to_string()))?,
        };

        Ok(PrintOptions { copies, print_type })
    }
}

/// A file-bearing submission
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub shop_id: String,
    pub student_name: Option<String>,
    pub options: PrintOptionsInput,
    pub files: Vec<FilePayload>,
}

/// Metadata-only submission body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataSubmission {
    pub student_name: Option<String>,
    /// Number or numeric string
    pub copies: Option<JsonValue>,
    pub print_type: Option<String>,
    pub file_count: Option<u32>,
    pub file_names: Vec<String>,
}

/// Informational acknowledgement of a metadata-only submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataReceipt {
    pub shop_id: String,
    pub student_name: String,
    pub print_type: PrintType,
    pub copies: i32,
    pub file_count: u32,
    pub file_names: Vec<String>,
    pub status: String,
}

/// Validates submissions, stores their files and records their jobs
#[derive(Clone)]
pub struct SubmissionPipeline {
    store: Arc<dyn Store>,
    storage: StorageRouter,
}

struct Validated {
    shop: Shop,
    student_name: String,
    options: PrintOptions,
}

impl SubmissionPipeline {
    pub fn new(store: Arc<dyn Store>, storage: StorageRouter) -> Self {
        Self { store, storage }
    }

    /// Checks shop, submitter name and options, in that order
    async fn validate(
        &self,
        shop_id: &str,
        student_name: Option<&str>,
        options: &PrintOptionsInput,
    ) -> Result<Validated, SubmissionError> {
        let shop = self
            .store
            .find_shop(shop_id)
            .await?
            .ok_or(SubmissionError::ShopNotFound)?;

        let student_name = blank_to_none(student_name)
            .ok_or_else(|| SubmissionError::Validation("Student name is required".to_string()))?
            .to_string();

        let options = options.resolve()?;

        Ok(Validated {
            shop,
            student_name,
            options,
        })
    }

    fn check_content_types(&self, files: &[FilePayload]) -> Result<(), SubmissionError> {
        for file in files {
            let content_type = file.content_type_or_default();
            if !self.storage.is_allowed(content_type) {
                return Err(SubmissionError::Validation(format!(
                    "File type {content_type} is not allowed ({})",
                    file.original_name
                )));
            }
        }
        Ok(())
    }

    async fn store_and_record(
        &self,
        validated: &Validated,
        file: &FilePayload,
    ) -> Result<PrintJob, SubmissionError> {
        let stored = self
            .storage
            .store(file)
            .await
            .map_err(|source| SubmissionError::Storage {
                file: file.original_name.clone(),
                source,
            })?;

        let job = self
            .store
            .create_job(CreatePrintJob {
                shop_ref: validated.shop.id,
                student_name: validated.student_name.clone(),
                file_original_name: file.original_name.clone(),
                file_path: stored.reference,
                file_size_bytes: stored.size_bytes as i64,
                file_content_type: Some(stored.content_type),
                copies: Some(validated.options.copies),
                print_type: Some(validated.options.print_type),
            })
            .await?;

        Ok(job)
    }

    /// Single-file submission; exactly one file is required
    pub async fn submit_one(&self, request: SubmissionRequest) -> Result<PrintJob, SubmissionError> {
        let validated = self
            .validate(
                &request.shop_id,
                request.student_name.as_deref(),
                &request.options,
            )
            .await?;

        let file = match request.files.as_slice() {
            [file] => file,
            [] => return Err(SubmissionError::Validation("No file uploaded".to_string())),
            _ => {
                return Err(SubmissionError::Validation(
                    "Expected exactly one file".to_string(),
                ))
            }
        };
        self.check_content_types(std::slice::from_ref(file))?;

        let job = self.store_and_record(&validated, file).await?;

        info!(
            shop_id = %request.shop_id,
            job_id = %job.id,
            copies = job.copies,
            print_type = %job.print_type,
            "Print job submitted"
        );
        Ok(job)
    }

    /// Multi-file submission; one job per file, created concurrently
    ///
    /// Returns the created jobs in the order the files were given. An empty
    /// file list is valid and creates nothing.
    pub async fn submit_many(
        &self,
        request: SubmissionRequest,
    ) -> Result<Vec<PrintJob>, SubmissionError> {
        let validated = self
            .validate(
                &request.shop_id,
                request.student_name.as_deref(),
                &request.options,
            )
            .await?;
        self.check_content_types(&request.files)?;

        let outcomes = join_all(
            request
                .files
                .iter()
                .map(|file| self.store_and_record(&validated, file)),
        )
        .await;

        let mut created = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (file, outcome) in request.files.iter().zip(outcomes) {
            match outcome {
                Ok(job) => created.push(job),
                Err(e) => failures.push(FileFailure {
                    file: file.original_name.clone(),
                    message: e.to_string(),
                }),
            }
        }

        if !failures.is_empty() {
            warn!(
                shop_id = %request.shop_id,
                created = created.len(),
                failed = failures.len(),
                "Multi-file submission partially failed"
            );
            return Err(SubmissionError::PartialFailure { created, failures });
        }

        info!(
            shop_id = %request.shop_id,
            jobs = created.len(),
            copies = validated.options.copies,
            print_type = %validated.options.print_type,
            "Print jobs submitted"
        );
        Ok(created)
    }

    /// Metadata-only submission; validates and acknowledges, writes nothing
    pub async fn submit_metadata(
        &self,
        shop_id: &str,
        metadata: MetadataSubmission,
    ) -> Result<MetadataReceipt, SubmissionError> {
        let options = PrintOptionsInput::new(
            metadata.copies.as_ref().and_then(json_to_string),
            metadata.print_type.clone(),
        );
        let validated = self
            .validate(shop_id, metadata.student_name.as_deref(), &options)
            .await?;

        let file_count = metadata
            .file_count
            .unwrap_or(metadata.file_names.len() as u32);

        info!(shop_id, file_count, "Print job metadata received");

        Ok(MetadataReceipt {
            shop_id: validated.shop.shop_id,
            student_name: validated.student_name,
            print_type: validated.options.print_type,
            copies: validated.options.copies,
            file_count,
            file_names: metadata.file_names,
            status: RECEIVED_STATUS.to_string(),
        })
    }
}

fn json_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateShop, JobStatus};
    use crate::storage::{FileStore, StorageConfig, StorageKind};
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    fn options(copies: Option<&str>, print_type: Option<&str>) -> PrintOptionsInput {
        PrintOptionsInput::new(copies.map(String::from), print_type.map(String::from))
    }

    fn pdf(name: &str) -> FilePayload {
        FilePayload::new(name, Some("application/pdf".to_string()), b"%PDF-1.4".to_vec())
    }

    fn request(shop_id: &str, name: Option<&str>, files: Vec<FilePayload>) -> SubmissionRequest {
        SubmissionRequest {
            shop_id: shop_id.to_string(),
            student_name: name.map(String::from),
            options: options(Some("3"), Some("color")),
            files,
        }
    }

    async fn setup() -> (SubmissionPipeline, Arc<MemoryStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::new());
        store
            .create_shop(CreateShop::named("shop-abc123", "Acme Prints"))
            .await
            .unwrap();
        let storage = StorageRouter::from_config(StorageConfig::disk(dir.path()))
            .await
            .unwrap();
        (
            SubmissionPipeline::new(store.clone(), storage),
            store,
            dir,
        )
    }

    fn file_count(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[test]
    fn test_options_defaults() {
        let resolved = options(None, None).resolve().unwrap();
        assert_eq!(resolved.copies, 1);
        assert_eq!(resolved.print_type, PrintType::Bw);

        let blank = options(Some("  "), Some("")).resolve().unwrap();
        assert_eq!(blank, resolved);
    }

    #[test]
    fn test_options_parse() {
        let resolved = options(Some(" 3 "), Some("color")).resolve().unwrap();
        assert_eq!(resolved.copies, 3);
        assert_eq!(resolved.print_type, PrintType::Color);
    }

    #[test]
    fn test_options_reject_invalid() {
        for copies in ["0", "-2", "two", "1.5"] {
            assert!(matches!(
                options(Some(copies), None).resolve(),
                Err(SubmissionError::Validation(_))
            ));
        }
        assert!(matches!(
            options(None, Some("sepia")).resolve(),
            Err(SubmissionError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_one_creates_job() {
        let (pipeline, _store, dir) = setup().await;

        let job = pipeline
            .submit_one(request("shop-abc123", Some("  Asha "), vec![pdf("notes.pdf")]))
            .await
            .unwrap();

        assert_eq!(job.student_name, "Asha");
        assert_eq!(job.copies, 3);
        assert_eq!(job.print_type, PrintType::Color);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.file_size_bytes, 8);
        assert!(job.file_path.starts_with("/uploads/"));
        assert_eq!(file_count(&dir), 1);
    }

    #[tokio::test]
    async fn test_unknown_shop_writes_nothing() {
        let (pipeline, _store, dir) = setup().await;

        let err = pipeline
            .submit_many(request("shop-nope00", Some("Asha"), vec![pdf("a.pdf")]))
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::ShopNotFound));
        assert_eq!(file_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_shop_checked_before_name() {
        let (pipeline, _store, _dir) = setup().await;

        let err = pipeline
            .submit_one(request("shop-nope00", None, vec![pdf("a.pdf")]))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::ShopNotFound));
    }

    #[tokio::test]
    async fn test_missing_name_rejected() {
        let (pipeline, _store, dir) = setup().await;

        for name in [None, Some(""), Some("   ")] {
            let err = pipeline
                .submit_one(request("shop-abc123", name, vec![pdf("a.pdf")]))
                .await
                .unwrap_err();
            assert!(matches!(err, SubmissionError::Validation(_)));
        }
        assert_eq!(file_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_submit_one_requires_a_file() {
        let (pipeline, _store, _dir) = setup().await;

        let err = pipeline
            .submit_one(request("shop-abc123", Some("Asha"), vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(_)));
    }

    #[tokio::test]
    async fn test_submit_many_fans_out() {
        let (pipeline, store, dir) = setup().await;

        let jobs = pipeline
            .submit_many(request(
                "shop-abc123",
                Some("Asha"),
                vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")],
            ))
            .await
            .unwrap();

        assert_eq!(jobs.len(), 3);
        let paths: std::collections::HashSet<_> = jobs.iter().map(|j| &j.file_path).collect();
        assert_eq!(paths.len(), 3);
        assert!(jobs
            .iter()
            .all(|j| j.copies == 3 && j.print_type == PrintType::Color && j.student_name == "Asha"));
        assert_eq!(file_count(&dir), 3);
        assert_eq!(store.list_jobs_by_shop("shop-abc123").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_submit_many_empty_list() {
        let (pipeline, _store, _dir) = setup().await;

        let jobs = pipeline
            .submit_many(request("shop-abc123", Some("Asha"), vec![]))
            .await
            .unwrap();
        assert!(jobs.is_empty());
    }

    #[tokio::test]
    async fn test_disallowed_type_rejected_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryStore::with_demo_shop());
        let storage = StorageRouter::from_config(StorageConfig {
            allowed_content_types: vec!["application/pdf".to_string()],
            ..StorageConfig::disk(dir.path())
        })
        .await
        .unwrap();
        let pipeline = SubmissionPipeline::new(store.clone(), storage);

        let zip = FilePayload::new("a.zip", Some("application/zip".into()), vec![1, 2]);
        let err = pipeline
            .submit_many(request("test-shop", Some("Asha"), vec![pdf("a.pdf"), zip]))
            .await
            .unwrap_err();

        assert!(matches!(err, SubmissionError::Validation(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(store.list_jobs_by_shop("test-shop").await.unwrap().is_empty());
    }

    /// Fails every write for files named `fail*`
    struct FlakyStorage;

    #[async_trait]
    impl FileStore for FlakyStorage {
        fn kind(&self) -> StorageKind {
            StorageKind::Disk
        }

        async fn put(&self, key: &str, payload: &FilePayload) -> Result<String, StorageError> {
            if payload.original_name.starts_with("fail") {
                Err(StorageError::Upload("simulated outage".to_string()))
            } else {
                Ok(format!("/uploads/{key}"))
            }
        }

        async fn health_check(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_created_jobs() {
        let store = Arc::new(MemoryStore::with_demo_shop());
        let storage = StorageRouter::new(Arc::new(FlakyStorage), Vec::new());
        let pipeline = SubmissionPipeline::new(store.clone(), storage);

        let err = pipeline
            .submit_many(request(
                "test-shop",
                Some("Asha"),
                vec![pdf("ok-1.pdf"), pdf("fail.pdf"), pdf("ok-2.pdf")],
            ))
            .await
            .unwrap_err();

        match err {
            SubmissionError::PartialFailure { created, failures } => {
                assert_eq!(created.len(), 2);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].file, "fail.pdf");
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert_eq!(store.list_jobs_by_shop("test-shop").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_submit_one_storage_failure() {
        let store = Arc::new(MemoryStore::with_demo_shop());
        let storage = StorageRouter::new(Arc::new(FlakyStorage), Vec::new());
        let pipeline = SubmissionPipeline::new(store.clone(), storage);

        let err = pipeline
            .submit_one(request("test-shop", Some("Asha"), vec![pdf("fail.pdf")]))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Storage { .. }));
        assert!(store.list_jobs_by_shop("test-shop").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_receipt() {
        let (pipeline, store, dir) = setup().await;

        let metadata: MetadataSubmission = serde_json::from_value(serde_json::json!({
            "studentName": "Asha",
            "copies": 2,
            "printType": "color",
            "fileNames": ["a.pdf", "b.pdf"]
        }))
        .unwrap();

        let receipt = pipeline.submit_metadata("shop-abc123", metadata).await.unwrap();
        assert_eq!(receipt.status, "received");
        assert_eq!(receipt.copies, 2);
        assert_eq!(receipt.file_count, 2);
        assert_eq!(receipt.shop_id, "shop-abc123");

        assert!(store.list_jobs_by_shop("shop-abc123").await.unwrap().is_empty());
        assert_eq!(file_count(&dir), 0);
    }

    #[tokio::test]
    async fn test_metadata_validates_shop_and_name() {
        let (pipeline, _store, _dir) = setup().await;

        let err = pipeline
            .submit_metadata("shop-nope00", MetadataSubmission::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::ShopNotFound));

        let err = pipeline
            .submit_metadata("shop-abc123", MetadataSubmission::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Validation(_)));
    }
}
