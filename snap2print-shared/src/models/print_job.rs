/// Print job model and database operations
///
/// One print job is created per uploaded file. A multi-file submission fans
/// out into independent jobs that share the submitter name and print options.
///
/// # State Machine
///
/// ```text
/// pending ⇄ completed
/// ```
///
/// Jobs start `pending`; the shop owner toggles them freely. There is no
/// terminal state.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE print_type AS ENUM ('bw', 'color');
/// CREATE TYPE job_status AS ENUM ('pending', 'completed');
///
/// CREATE TABLE print_jobs (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     seq BIGSERIAL NOT NULL,
///     shop_ref UUID NOT NULL REFERENCES shops(id) ON DELETE CASCADE,
///     student_name VARCHAR(255) NOT NULL,
///     file_original_name VARCHAR(512) NOT NULL,
///     file_path TEXT NOT NULL,
///     file_size_bytes BIGINT NOT NULL,
///     file_content_type VARCHAR(255) NOT NULL DEFAULT 'application/octet-stream',
///     copies INTEGER NOT NULL DEFAULT 1 CHECK (copies >= 1),
///     print_type print_type NOT NULL DEFAULT 'bw',
///     status job_status NOT NULL DEFAULT 'pending',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
/// );
/// ```
///
/// Rows are returned joined with `shops` so every job carries the shareable
/// `shop_id` alongside the surrogate `shop_ref`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

/// Content type recorded when the client declares none
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Colour mode of a print job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "print_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PrintType {
    /// Black and white
    #[default]
    Bw,
    Color,
}

impl PrintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrintType::Bw => "bw",
            PrintType::Color => "color",
        }
    }
}

/// Lifecycle status of a print job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Completed => "completed",
        }
    }

    /// The status a dashboard toggle moves to
    pub fn toggled(&self) -> Self {
        match self {
            JobStatus::Pending => JobStatus::Completed,
            JobStatus::Completed => JobStatus::Pending,
        }
    }
}

/// Raised when a wire string is not one of an enum's accepted values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {field}. Must be {expected}")]
pub struct InvalidVariant {
    pub field: &'static str,
    pub expected: &'static str,
}

impl FromStr for PrintType {
    type Err = InvalidVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bw" => Ok(PrintType::Bw),
            "color" => Ok(PrintType::Color),
            _ => Err(InvalidVariant {
                field: "printType",
                expected: "'bw' or 'color'",
            }),
        }
    }
}

impl FromStr for JobStatus {
    type Err = InvalidVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "completed" => Ok(JobStatus::Completed),
            _ => Err(InvalidVariant {
                field: "status",
                expected: "'pending' or 'completed'",
            }),
        }
    }
}

impl fmt::Display for PrintType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single file queued for printing at a shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: Uuid,

    /// Shareable identifier of the owning shop
    pub shop_id: String,

    /// Surrogate key of the owning shop
    pub shop_ref: Uuid,

    pub student_name: String,
    pub file_original_name: String,

    /// Storage reference: `/uploads/{key}`, a public URL, or `s3://bucket/key`
    pub file_path: String,

    pub file_size_bytes: i64,
    pub file_content_type: String,

    /// Always at least 1
    pub copies: i32,

    pub print_type: PrintType,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a print job
///
/// `copies` and `print_type` fall back to 1 and black-and-white.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrintJob {
    pub shop_ref: Uuid,
    pub student_name: String,
    pub file_original_name: String,
    pub file_path: String,
    pub file_size_bytes: i64,
    pub file_content_type: Option<String>,
    pub copies: Option<i32>,
    pub print_type: Option<PrintType>,
}

const JOB_COLUMNS: &str = "j.id, s.shop_id, j.shop_ref, j.student_name, j.file_original_name, \
     j.file_path, j.file_size_bytes, j.file_content_type, j.copies, j.print_type, j.status, \
     j.created_at, j.updated_at";

impl PrintJob {
    /// Inserts a job with defaults already resolved
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation when `shop_ref` does not exist, or a
    /// check violation when `copies` is below 1.
    pub async fn create<'e, E>(
        executor: E,
        data: CreatePrintJob,
        copies: i32,
        print_type: PrintType,
    ) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "WITH j AS ( \
                INSERT INTO print_jobs (shop_ref, student_name, file_original_name, file_path, \
                                        file_size_bytes, file_content_type, copies, print_type) \
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                RETURNING * \
             ) \
             SELECT {JOB_COLUMNS} FROM j JOIN shops s ON s.id = j.shop_ref"
        );

        sqlx::query_as::<_, PrintJob>(&sql)
            .bind(data.shop_ref)
            .bind(data.student_name)
            .bind(data.file_original_name)
            .bind(data.file_path)
            .bind(data.file_size_bytes)
            .bind(
                data.file_content_type
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            )
            .bind(copies)
            .bind(print_type)
            .fetch_one(executor)
            .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs j JOIN shops s ON s.id = j.shop_ref WHERE j.id = $1"
        );

        sqlx::query_as::<_, PrintJob>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Lists a shop's jobs, newest first
    ///
    /// Jobs created within the same clock tick are ordered by insertion.
    pub async fn list_by_shop<'e, E>(executor: E, shop_ref: Uuid) -> Result<Vec<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM print_jobs j JOIN shops s ON s.id = j.shop_ref \
             WHERE j.shop_ref = $1 \
             ORDER BY j.created_at DESC, j.seq DESC"
        );

        sqlx::query_as::<_, PrintJob>(&sql)
            .bind(shop_ref)
            .fetch_all(executor)
            .await
    }

    /// Sets the status and bumps `updated_at`
    ///
    /// Returns None if the job does not exist.
    pub async fn set_status<'e, E>(
        executor: E,
        id: Uuid,
        status: JobStatus,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "WITH j AS ( \
                UPDATE print_jobs SET status = $2, updated_at = clock_timestamp() \
                WHERE id = $1 RETURNING * \
             ) \
             SELECT {JOB_COLUMNS} FROM j JOIN shops s ON s.id = j.shop_ref"
        );

        sqlx::query_as::<_, PrintJob>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(executor)
            .await
    }

    /// Deletes the job record; the stored file is left in place
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM print_jobs WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
