/// Health check endpoint
///
/// Reports the server version and the state of the job store and the
/// upload storage backend.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "storage": "disk",
///   "database": "in-memory"
/// }
/// ```
///
/// `status` is `degraded` when the database is disconnected or the storage
/// backend fails its health check.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use snap2print_shared::store::StoreBackend;

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: String,

    pub version: String,

    /// Active storage backend: `disk` or `s3`
    pub storage: String,

    /// `connected`, `disconnected` or `in-memory`
    pub database: String,
}

pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database = match state.store.backend() {
        StoreBackend::Memory => "in-memory",
        StoreBackend::Postgres => match state.store.ping().await {
            Ok(()) => "connected",
            Err(e) => {
                tracing::warn!(error = %e, "Database health check failed");
                "disconnected"
            }
        },
    };

    let storage_ok = match state.storage.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, backend = %state.storage.kind(), "Storage health check failed");
            false
        }
    };

    let healthy = database != "disconnected" && storage_ok;

    Ok(Json(HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: state.storage.kind().to_string(),
        database: database.to_string(),
    }))
}
