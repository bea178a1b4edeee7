//! Persistence for shops, owners and print jobs.
//!
//! [`Store`] is the single interface the rest of the system talks to. One
//! backend is chosen at startup and shared behind an `Arc<dyn Store>`:
//!
//! - [`PostgresStore`]: durable, backed by sqlx
//! - [`MemoryStore`]: process-local maps behind a `tokio::sync::RwLock`
//!
//! Both backends implement identical semantics, including validation of new
//! jobs and status strings.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use std::fmt;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    CreatePrintJob, CreateShop, CreateUser, JobStatus, PrintJob, PrintType, Shop, User,
};

/// Errors returned by store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Input rejected; nothing was written
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// A uniqueness constraint was violated
    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            let constraint = db_err.constraint().unwrap_or_default();
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    let message = if constraint.contains("email") {
                        "User with this email already exists"
                    } else if constraint.contains("shop_id") {
                        "Shop ID already exists"
                    } else {
                        "Resource already exists"
                    };
                    return StoreError::Conflict(message.to_string());
                }
                // foreign_key_violation
                Some("23503") => {
                    return StoreError::Validation("Referenced shop does not exist".to_string());
                }
                // check_violation
                Some("23514") => {
                    return StoreError::Validation("copies must be at least 1".to_string());
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// Which backend a store is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::Postgres => "postgres",
            StoreBackend::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    fn backend(&self) -> StoreBackend;

    /// Checks the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    // Shops

    /// Creates a shop; `Conflict` if the identifier is taken
    async fn create_shop(&self, data: CreateShop) -> Result<Shop, StoreError>;

    async fn find_shop(&self, shop_id: &str) -> Result<Option<Shop>, StoreError>;

    /// Creates or renames a shop by identifier
    ///
    /// A new shop without a name is named after its identifier.
    async fn upsert_shop(&self, shop_id: &str, name: Option<String>) -> Result<Shop, StoreError>;

    /// Deletes a shop together with its jobs and owner account
    async fn delete_shop(&self, shop_id: &str) -> Result<bool, StoreError>;

    // Owners

    /// Creates the owner account and its shop atomically
    ///
    /// Either both records exist afterwards or neither does. A duplicate
    /// email yields `Conflict`.
    async fn register_owner(
        &self,
        user: CreateUser,
        shop: CreateShop,
    ) -> Result<(User, Shop), StoreError>;

    /// Case-insensitive lookup
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    // Print jobs

    /// Creates a pending job
    ///
    /// `Validation` if copies is below 1 or the shop reference does not exist.
    async fn create_job(&self, data: CreatePrintJob) -> Result<PrintJob, StoreError>;

    async fn find_job(&self, id: Uuid) -> Result<Option<PrintJob>, StoreError>;

    /// Lists a shop's jobs newest first; `NotFound` if the shop does not exist
    async fn list_jobs_by_shop(&self, shop_id: &str) -> Result<Vec<PrintJob>, StoreError>;

    /// Sets a job's status from its wire value
    ///
    /// `Validation` (with no change) unless `status` is `pending` or
    /// `completed`; `NotFound` for an unknown id.
    async fn set_job_status(&self, id: Uuid, status: &str) -> Result<PrintJob, StoreError>;

    /// Deletes a job record; false if it did not exist
    async fn delete_job(&self, id: Uuid) -> Result<bool, StoreError>;
}

/// Resolves copies and print type defaults for a new job
pub(crate) fn resolve_job_options(data: &CreatePrintJob) -> Result<(i32, PrintType), StoreError> {
    let copies = data.copies.unwrap_or(1);
    if copies < 1 {
        return Err(StoreError::Validation(
            "copies must be at least 1".to_string(),
        ));
    }
    Ok((copies, data.print_type.unwrap_or_default()))
}

pub(crate) fn parse_status(status: &str) -> Result<JobStatus, StoreError> {
    status
        .parse::<JobStatus>()
        .map_err(|e| StoreError::Validation(e.to_string()))
}

pub(crate) fn shop_not_found() -> StoreError {
    StoreError::NotFound("Shop not found".to_string())
}

pub(crate) fn job_not_found() -> StoreError {
    StoreError::NotFound("Print job not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(copies: Option<i32>, print_type: Option<PrintType>) -> CreatePrintJob {
        CreatePrintJob {
            shop_ref: Uuid::new_v4(),
            student_name: "Asha".to_string(),
            file_original_name: "notes.pdf".to_string(),
            file_path: "/uploads/notes.pdf".to_string(),
            file_size_bytes: 10,
            file_content_type: None,
            copies,
            print_type,
        }
    }

    #[test]
    fn test_resolve_job_options_defaults() {
        assert_eq!(
            resolve_job_options(&new_job(None, None)).unwrap(),
            (1, PrintType::Bw)
        );
        assert_eq!(
            resolve_job_options(&new_job(Some(3), Some(PrintType::Color))).unwrap(),
            (3, PrintType::Color)
        );
    }

    #[test]
    fn test_resolve_job_options_rejects_zero_copies() {
        let err = resolve_job_options(&new_job(Some(0), None)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_parse_status() {
        assert_eq!(parse_status("completed").unwrap(), JobStatus::Completed);
        assert!(matches!(parse_status("done"), Err(StoreError::Validation(_))));
    }
}
