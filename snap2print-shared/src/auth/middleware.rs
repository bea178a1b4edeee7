/// Bearer-token authentication for owner routes
///
/// The middleware reads `Authorization: Bearer <jwt>`, validates it and
/// stores an [`AuthContext`] in the request extensions. A missing header is
/// 401; a header that is present but malformed, expired or forged is 403.
///
/// ```no_run
/// use axum::{routing::get, Extension, Router};
/// use snap2print_shared::auth::middleware::{create_jwt_middleware, AuthContext};
///
/// async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
///     auth.shop_id
/// }
///
/// let app: Router = Router::new()
///     .route("/me", get(whoami))
///     .layer(axum::middleware::from_fn(create_jwt_middleware("secret")));
/// ```

use std::future::Future;
use std::pin::Pin;

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_token, Claims, JwtError};

/// Authenticated owner attached to the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,
    pub shop_id: String,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            shop_id: claims.shop_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No Authorization header
    MissingCredentials,

    /// Header present but not `Bearer <token>`
    InvalidFormat(String),

    /// Bad signature, wrong issuer or expired
    InvalidToken(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
            AuthError::InvalidFormat(_) | AuthError::InvalidToken(_) => StatusCode::FORBIDDEN,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AuthError::MissingCredentials => "Access token required".to_string(),
            AuthError::InvalidFormat(msg) | AuthError::InvalidToken(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let error = match self {
            AuthError::MissingCredentials => "unauthorized",
            _ => "forbidden",
        };
        let body = Json(serde_json::json!({
            "error": error,
            "message": self.message(),
        }));
        (self.status(), body).into_response()
    }
}

/// Validates the bearer token of a request
pub fn authenticate(req: &Request, secret: &str) -> Result<AuthContext, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        _ => AuthError::InvalidToken("Invalid or expired token".to_string()),
    })?;

    Ok(claims.into())
}

pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth = authenticate(&req, &secret)?;
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

type MiddlewareFuture = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Closure form of [`jwt_auth_middleware`] for `axum::middleware::from_fn`
pub fn create_jwt_middleware(
    secret: impl Into<String>,
) -> impl Fn(Request, Next) -> MiddlewareFuture + Clone {
    let secret = secret.into();
    move |req, next| {
        let secret = secret.clone();
        Box::pin(jwt_auth_middleware(secret, req, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::create_token;
    use axum::body::Body;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-bytes";

    fn request(auth: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/auth/profile");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = authenticate(&request(None), SECRET).unwrap_err();
        assert_eq!(err, AuthError::MissingCredentials);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_bad_token_is_forbidden() {
        let err = authenticate(&request(Some("Bearer nonsense")), SECRET).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let err = authenticate(&request(Some("Basic abc")), SECRET).unwrap_err();
        assert!(matches!(err, AuthError::InvalidFormat(_)));
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_valid_token_yields_context() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, "owner@acme.test", "shop-a1b2c3"), SECRET)
            .unwrap();

        let auth = authenticate(&request(Some(&format!("Bearer {token}"))), SECRET).unwrap();
        assert_eq!(auth.user_id, user_id);
        assert_eq!(auth.shop_id, "shop-a1b2c3");
    }

    #[test]
    fn test_error_response_status() {
        assert_eq!(
            AuthError::MissingCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidToken("x".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
