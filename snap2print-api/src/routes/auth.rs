/// Shop owner authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Create an owner account and its shop
/// - `POST /api/auth/login` - Exchange credentials for a session token
/// - `GET /api/auth/profile` - Current owner (requires `Authorization: Bearer`)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ApiJson,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use snap2print_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::{
        shop::generate_shop_id,
        user::{normalize_email, UserProfile},
        CreateShop, CreateUser, User,
    },
};
use validator::Validate;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 120, message = "Shop name must be at most 120 characters"))]
    pub shop_name: String,

    /// Free-text address, empty when omitted
    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// Register and login response
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

fn issue_token(state: &AppState, user: &User) -> ApiResult<String> {
    let claims = jwt::Claims::with_expiration(
        user.id,
        user.email.clone(),
        user.shop_id.clone(),
        Duration::hours(state.config.jwt.expires_in_hours),
    );
    Ok(jwt::create_token(&claims, state.jwt_secret())?)
}

/// Registers a shop owner
///
/// Creates the owner account and a shop named after `shopName` in one
/// atomic step, then signs the owner in.
///
/// ```text
/// POST /api/auth/register
/// {
///   "email": "owner@acme.test",
///   "password": "secret1",
///   "shopName": "Acme Prints",
///   "location": "12 Campus Road"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "message": "Registration successful",
///   "token": "eyJ...",
///   "user": {"id": "...", "email": "owner@acme.test", "shopName": "Acme Prints",
///            "location": "12 Campus Road", "shopId": "shop-1a2b3c"}
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, bad email, short password
/// - `409 Conflict`: email already registered
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    if req.email.trim().is_empty() || req.password.is_empty() || req.shop_name.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Email, password, and shop name are required".to_string(),
        ));
    }

    req.validate()?;

    password::validate_password_length(&req.password).map_err(|message| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message,
        }])
    })?;

    let email = normalize_email(&req.email);
    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = password::hash_password_async(req.password).await?;
    let shop_name = req.shop_name.trim().to_string();
    let location = req.location.unwrap_or_default().trim().to_string();
    let shop_id = generate_shop_id();

    let (user, shop) = state
        .store
        .register_owner(
            CreateUser {
                email: email.clone(),
                password_hash,
                shop_name: shop_name.clone(),
                location: location.clone(),
                shop_id: shop_id.clone(),
            },
            CreateShop {
                shop_id,
                name: shop_name,
                email: Some(email),
                phone: None,
                address: Some(location).filter(|l| !l.is_empty()),
            },
        )
        .await?;

    tracing::info!(user_id = %user.id, shop_id = %shop.shop_id, "Shop owner registered");

    let token = issue_token(&state, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Registration successful".to_string(),
            token,
            user: UserProfile::from(&user),
        }),
    ))
}

/// Logs a shop owner in
///
/// Unknown email, wrong password and disabled accounts all answer 401.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let user = state
        .store
        .find_user_by_email(&normalize_email(&req.email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized(
            "Account is disabled. Please contact support.".to_string(),
        ));
    }

    if !password::verify_password_async(req.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    let token = issue_token(&state, &user)?;
    tracing::info!(user_id = %user.id, "Shop owner logged in");

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: UserProfile::from(&user),
    }))
}

/// Returns the signed-in owner
///
/// A token whose account was since deleted or disabled is treated as
/// unauthenticated.
pub async fn profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state
        .store
        .find_user_by_id(auth.user_id)
        .await?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Not authenticated".to_string()))?;

    Ok(Json(ProfileResponse {
        user: UserProfile::from(&user),
    }))
}
