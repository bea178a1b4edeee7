//! HTTP client for the Snap2Print API.
//!
//! Owner-side calls ([`DashboardClient::get_jobs`], [`DashboardClient::set_status`],
//! [`DashboardClient::delete_job`]) back the dashboard; [`DashboardClient::submit_files`]
//! and [`DashboardClient::submit_metadata`] shape requests the way the student app
//! sends them. Requests are never retried.

use std::time::Duration;

use reqwest::{multipart, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use snap2print_shared::{
    models::{JobStatus, PrintJob, PrintType, Shop},
    storage::FilePayload,
    submission::MetadataReceipt,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounds of the copies stepper
pub const MIN_COPIES: u32 = 1;
pub const MAX_COPIES: u32 = 50;

/// Print options picked in the submission wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintPreferences {
    copies: u32,
    pub print_type: PrintType,
}

impl Default for PrintPreferences {
    fn default() -> Self {
        Self {
            copies: MIN_COPIES,
            print_type: PrintType::Bw,
        }
    }
}

impl PrintPreferences {
    /// Preferences with `copies` clamped to the stepper range
    pub fn new(copies: u32, print_type: PrintType) -> Self {
        Self {
            copies: copies.clamp(MIN_COPIES, MAX_COPIES),
            print_type,
        }
    }

    pub fn copies(&self) -> u32 {
        self.copies
    }

    pub fn set_copies(&mut self, copies: u32) {
        self.copies = copies.clamp(MIN_COPIES, MAX_COPIES);
    }

    pub fn increment(&mut self) {
        self.set_copies(self.copies.saturating_add(1));
    }

    pub fn decrement(&mut self) {
        self.set_copies(self.copies.saturating_sub(1));
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    job: MetadataReceipt,
}

/// Client for one Snap2Print API server
#[derive(Debug, Clone)]
pub struct DashboardClient {
    client: Client,
    base_url: String,
}

impl DashboardClient {
    /// Client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Configuration(e.to_string()))?;
        Self::with_client(base_url, client)
    }

    /// Client using a preconfigured `reqwest::Client`
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Configuration(format!(
                "API URL must start with http:// or https://, got {base_url}"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Looks up a shop; `ShopNotFound` on 404
    pub async fn get_shop(&self, shop_id: &str) -> Result<Shop, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/shops/{shop_id}")))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::ShopNotFound(shop_id.to_string()));
        }
        Ok(check(response).await?.json().await?)
    }

    /// A shop's jobs, newest first
    pub async fn get_jobs(&self, shop_id: &str) -> Result<Vec<PrintJob>, ClientError> {
        let response = self
            .client
            .get(self.url(&format!("/api/print-jobs/{shop_id}")))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Sets a job's status
    ///
    /// The poller is not notified; wrap the call in
    /// [`RefreshHandle::after`](crate::poller::RefreshHandle::after) to refresh the listing.
    pub async fn set_status(&self, job_id: Uuid, status: JobStatus) -> Result<PrintJob, ClientError> {
        let response = self
            .client
            .patch(self.url(&format!("/api/print-jobs/status/{job_id}")))
            .json(&json!({ "status": status.as_str() }))
            .send()
            .await?;
        let job: PrintJob = check(response).await?.json().await?;
        debug!(%job_id, status = %job.status.as_str(), "Job status updated");
        Ok(job)
    }

    /// Marks a job completed through the print action
    ///
    /// Like [`set_status`](Self::set_status), this does not refresh a running poller.
    pub async fn send_to_printer(&self, job_id: Uuid) -> Result<PrintJob, ClientError> {
        let response = self
            .client
            .post(self.url(&format!("/api/print-jobs/{job_id}/print")))
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Deletes a job; pair with `RefreshHandle::after` to refresh the listing
    pub async fn delete_job(&self, job_id: Uuid) -> Result<(), ClientError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/print-jobs/{job_id}")))
            .send()
            .await?;
        check(response).await?;
        debug!(%job_id, "Job deleted");
        Ok(())
    }

    /// Submits files as one multi-file request
    ///
    /// The shop is checked first so an unknown shop surfaces as
    /// `ShopNotFound` before any bytes are sent.
    pub async fn submit_files(
        &self,
        shop_id: &str,
        student_name: &str,
        preferences: PrintPreferences,
        files: Vec<FilePayload>,
    ) -> Result<Vec<PrintJob>, ClientError> {
        self.get_shop(shop_id).await?;

        let mut form = multipart::Form::new()
            .text("studentName", student_name.to_string())
            .text("copies", preferences.copies().to_string())
            .text("printType", preferences.print_type.as_str());

        for file in files {
            let content_type = file.content_type_or_default().to_string();
            let part = multipart::Part::bytes(file.bytes.to_vec())
                .file_name(file.original_name)
                .mime_str(&content_type)?;
            form = form.part("files", part);
        }

        let response = self
            .client
            .post(self.url(&format!("/api/print-jobs/{shop_id}/uploads")))
            .multipart(form)
            .send()
            .await?;
        let jobs: Vec<PrintJob> = check(response).await?.json().await?;
        debug!(shop_id, count = jobs.len(), "Submitted print jobs");
        Ok(jobs)
    }

    /// Sends the metadata-only submission and returns the server's receipt
    pub async fn submit_metadata(
        &self,
        shop_id: &str,
        student_name: &str,
        preferences: PrintPreferences,
        file_names: Vec<String>,
    ) -> Result<MetadataReceipt, ClientError> {
        let body = json!({
            "studentName": student_name,
            "copies": preferences.copies(),
            "printType": preferences.print_type.as_str(),
            "fileCount": file_names.len(),
            "fileNames": file_names,
        });

        let response = self
            .client
            .post(self.url(&format!("/api/print-jobs/{shop_id}/metadata")))
            .json(&body)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::ShopNotFound(shop_id.to_string()));
        }
        let body: MetadataResponse = check(response).await?.json().await?;
        Ok(body.job)
    }
}

/// Passes 2xx responses through and turns the rest into `ClientError::Api`
async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(ClientError::Api {
        status,
        message: error_message(status, &text),
    })
}

/// The server's `{message}` when present, else the status reason
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_clamped() {
        assert_eq!(PrintPreferences::new(0, PrintType::Bw).copies(), 1);
        assert_eq!(PrintPreferences::new(51, PrintType::Color).copies(), 50);

        let mut prefs = PrintPreferences::default();
        assert_eq!(prefs.copies(), 1);
        assert_eq!(prefs.print_type, PrintType::Bw);

        prefs.decrement();
        assert_eq!(prefs.copies(), 1);

        prefs.set_copies(49);
        prefs.increment();
        prefs.increment();
        assert_eq!(prefs.copies(), 50);
    }

    #[test]
    fn test_base_url_validation() {
        let client = DashboardClient::new("http://localhost:4000/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:4000");
        assert_eq!(client.url("/health"), "http://localhost:4000/health");

        assert!(matches!(
            DashboardClient::new("localhost:4000"),
            Err(ClientError::Configuration(_))
        ));
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(
                StatusCode::BAD_REQUEST,
                r#"{"error":"bad_request","message":"Student name is required"}"#
            ),
            "Student name is required"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>upstream down</html>"),
            "Bad Gateway"
        );
    }
}
