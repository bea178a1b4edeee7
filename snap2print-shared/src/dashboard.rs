//! Shop owner dashboard operations.
//!
//! [`Dashboard`] is the server-side query/mutation surface: list a shop's
//! jobs and flip or delete them. The pure helpers [`filter_jobs`] and
//! [`summarize`] work over an already-fetched listing and are shared by the
//! API and the polling client.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::models::{JobStatus, PrintJob};
use crate::store::{Store, StoreError};

/// How often the dashboard refreshes its listing
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct Dashboard {
    store: Arc<dyn Store>,
}

impl Dashboard {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// A shop's jobs, newest first
    pub async fn get_jobs(&self, shop_id: &str) -> Result<Vec<PrintJob>, StoreError> {
        self.store.list_jobs_by_shop(shop_id).await
    }

    /// Sets a job's status from its wire value (`pending` / `completed`)
    pub async fn set_status(&self, job_id: Uuid, status: &str) -> Result<PrintJob, StoreError> {
        let job = self.store.set_job_status(job_id, status).await?;
        info!(job_id = %job.id, status = %job.status, "Print job status changed");
        Ok(job)
    }

    pub async fn mark_done(&self, job_id: Uuid) -> Result<PrintJob, StoreError> {
        self.set_status(job_id, JobStatus::Completed.as_str()).await
    }

    pub async fn undo(&self, job_id: Uuid) -> Result<PrintJob, StoreError> {
        self.set_status(job_id, JobStatus::Pending.as_str()).await
    }

    /// Hands a job to the printer
    ///
    /// There is no spooler integration: the job is simply marked completed.
    pub async fn send_to_printer(&self, job_id: Uuid) -> Result<PrintJob, StoreError> {
        info!(%job_id, "Sending print job to printer");
        self.mark_done(job_id).await
    }

    /// Deletes a job; false if it did not exist
    pub async fn delete_job(&self, job_id: Uuid) -> Result<bool, StoreError> {
        let deleted = self.store.delete_job(job_id).await?;
        if deleted {
            info!(%job_id, "Print job deleted");
        }
        Ok(deleted)
    }
}

/// Jobs whose submitter name or filename contains `query`, ignoring case
///
/// A blank query returns every job. Order is preserved.
pub fn filter_jobs(jobs: &[PrintJob], query: &str) -> Vec<PrintJob> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return jobs.to_vec();
    }

    jobs.iter()
        .filter(|job| {
            job.student_name.to_lowercase().contains(&needle)
                || job.file_original_name.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect()
}

/// Counts shown above the job list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    /// Sum of copies over pending jobs
    pub pending_pages: i64,
}

pub fn summarize(jobs: &[PrintJob]) -> JobSummary {
    jobs.iter().fold(JobSummary::default(), |mut summary, job| {
        summary.total += 1;
        match job.status {
            JobStatus::Pending => {
                summary.pending += 1;
                summary.pending_pages += i64::from(job.copies);
            }
            JobStatus::Completed => summary.completed += 1,
        }
        summary
    })
}
