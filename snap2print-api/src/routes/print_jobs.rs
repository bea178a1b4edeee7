/// Print job endpoints
///
/// Submission (public, used by the student app):
///
/// - `POST /api/print-jobs/:shopId/upload` - one file, multipart field `file`
/// - `POST /api/print-jobs/:shopId/uploads` - many files, repeated field `files`
/// - `POST /api/print-jobs/:shopId/metadata` - JSON acknowledgement, stores nothing
///
/// Multipart submissions also carry the text fields `studentName`, `copies`
/// and `printType`, applied to every file of the request.
///
/// Dashboard (used by the shop owner):
///
/// - `GET /api/print-jobs/:shopId` - jobs newest first
/// - `PATCH /api/print-jobs/status/:jobId` - `{"status": "pending" | "completed"}`
/// - `POST /api/print-jobs/:jobId/print` - send to printer (marks completed)
/// - `DELETE /api/print-jobs/:jobId`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{ApiJson, ApiMultipart},
    routes::shops::MessageResponse,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use snap2print_shared::{
    models::PrintJob,
    storage::FilePayload,
    submission::{MetadataReceipt, MetadataSubmission, PrintOptionsInput, SubmissionRequest},
};
use uuid::Uuid;

/// Multipart field carrying the file of a single upload
pub const SINGLE_FILE_FIELD: &str = "file";

/// Multipart field carrying each file of a multi-file upload
pub const MULTI_FILE_FIELD: &str = "files";

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub message: String,
    pub job: MetadataReceipt,
}

/// Unparseable ids cannot name an existing job
fn parse_job_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound("Print job not found".to_string()))
}

/// Collects a multipart submission
///
/// Files are read from `file_field` (a trailing `[]` is tolerated); unknown
/// fields are ignored.
async fn read_submission(
    shop_id: String,
    mut multipart: Multipart,
    file_field: &str,
) -> ApiResult<SubmissionRequest> {
    let mut student_name = None;
    let mut copies = None;
    let mut print_type = None;
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "studentName" => student_name = Some(field.text().await?),
            "copies" => copies = Some(field.text().await?),
            "printType" => print_type = Some(field.text().await?),
            other if other.trim_end_matches("[]") == file_field => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                files.push(FilePayload::new(original_name, content_type, bytes));
            }
            other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
        }
    }

    Ok(SubmissionRequest {
        shop_id,
        student_name,
        options: PrintOptionsInput::new(copies, print_type),
        files,
    })
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Path(shop_id): Path<String>,
) -> ApiResult<Json<Vec<PrintJob>>> {
    let jobs = state.dashboard.get_jobs(&shop_id).await?;
    Ok(Json(jobs))
}

/// Single-file submission
///
/// # Errors
///
/// - `400 Bad Request`: missing name or file, invalid options, disallowed type
/// - `404 Not Found`: unknown shop
/// - `413 Payload Too Large`: body over the configured limit
pub async fn upload_one(
    State(state): State<AppState>,
    Path(shop_id): Path<String>,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<(StatusCode, Json<PrintJob>)> {
    let request = read_submission(shop_id, multipart, SINGLE_FILE_FIELD).await?;
    let job = state.submissions.submit_one(request).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// Multi-file submission; one job per file
///
/// When some files fail after others were stored, the response is 500 and
/// `details.created` lists the jobs that were kept.
pub async fn upload_many(
    State(state): State<AppState>,
    Path(shop_id): Path<String>,
    ApiMultipart(multipart): ApiMultipart,
) -> ApiResult<(StatusCode, Json<Vec<PrintJob>>)> {
    let request = read_submission(shop_id, multipart, MULTI_FILE_FIELD).await?;
    let jobs = state.submissions.submit_many(request).await?;
    Ok((StatusCode::CREATED, Json(jobs)))
}

pub async fn submit_metadata(
    State(state): State<AppState>,
    Path(shop_id): Path<String>,
    ApiJson(metadata): ApiJson<MetadataSubmission>,
) -> ApiResult<(StatusCode, Json<MetadataResponse>)> {
    let receipt = state.submissions.submit_metadata(&shop_id, metadata).await?;
    Ok((
        StatusCode::CREATED,
        Json(MetadataResponse {
            message: "Print job metadata received successfully".to_string(),
            job: receipt,
        }),
    ))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Json<PrintJob>> {
    let job_id = parse_job_id(&job_id)?;
    let job = state.dashboard.set_status(job_id, req.status.trim()).await?;
    Ok(Json(job))
}

pub async fn send_to_printer(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<PrintJob>> {
    let job_id = parse_job_id(&job_id)?;
    let job = state.dashboard.send_to_printer(job_id).await?;
    Ok(Json(job))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let job_id = parse_job_id(&job_id)?;
    if !state.dashboard.delete_job(job_id).await? {
        return Err(ApiError::NotFound("Print job not found".to_string()));
    }

    Ok(Json(MessageResponse {
        message: "Print job deleted successfully".to_string(),
    }))
}
