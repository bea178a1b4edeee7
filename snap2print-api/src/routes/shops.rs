/// Shop endpoints
///
/// - `POST /api/shops` - Create a shop with a generated `shop-xxxxxx` id
/// - `GET /api/shops/:id` - Look up a shop
/// - `PUT /api/shops/:id` - Create or rename a shop by identifier
/// - `DELETE /api/shops/:id` - Delete a shop with its jobs and owner

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use snap2print_shared::models::{shop::generate_shop_id, CreateShop, Shop};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateShopRequest {
    #[serde(default)]
    #[validate(length(max = 120, message = "name must be at most 120 characters"))]
    pub name: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpsertShopRequest {
    #[validate(length(min = 1, max = 120, message = "name must be 1 to 120 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Creates a shop
///
/// ```text
/// POST /api/shops
/// {"name": "Acme Prints"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: name missing or blank
pub async fn create_shop(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateShopRequest>,
) -> ApiResult<(StatusCode, Json<Shop>)> {
    req.validate()?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let shop = state
        .store
        .create_shop(CreateShop::named(generate_shop_id(), name))
        .await?;

    tracing::info!(shop_id = %shop.shop_id, name = %shop.name, "Shop created");

    Ok((StatusCode::CREATED, Json(shop)))
}

pub async fn get_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<String>,
) -> ApiResult<Json<Shop>> {
    state
        .store
        .find_shop(&shop_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Shop not found".to_string()))
}

/// Creates or renames a shop
///
/// The body is optional; a new shop without a name is named after its
/// identifier. A body that is present must be valid JSON.
pub async fn upsert_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Shop>> {
    let body = body?;
    let req: UpsertShopRequest = if body.iter().all(u8::is_ascii_whitespace) {
        UpsertShopRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))?
    };
    req.validate()?;

    let name = req
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let shop = state.store.upsert_shop(&shop_id, name).await?;

    Ok(Json(shop))
}

pub async fn delete_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    if !state.store.delete_shop(&shop_id).await? {
        return Err(ApiError::NotFound("Shop not found".to_string()));
    }

    tracing::info!(%shop_id, "Shop deleted");

    Ok(Json(MessageResponse {
        message: "Shop deleted successfully".to_string(),
    }))
}
