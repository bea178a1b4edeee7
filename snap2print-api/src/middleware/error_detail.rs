/// Development-mode internal error detail
///
/// [`ApiError::InternalError`](crate::error::ApiError) answers with a generic
/// message and stashes the real cause in an [`InternalErrorDetail`] response
/// extension. Outside production this middleware rewrites the body so the
/// cause becomes the message.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{ErrorResponse, InternalErrorDetail};

pub async fn expose_internal_errors(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let Some(detail) = response.extensions().get::<InternalErrorDetail>().cloned() else {
        return response;
    };

    let status = response.status();
    let body = Json(ErrorResponse {
        error: "internal_error".to_string(),
        message: detail.0,
        details: None,
    });
    (status, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, INTERNAL_ERROR_MESSAGE};
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    fn router(expose: bool) -> Router {
        let router = Router::new()
            .route(
                "/boom",
                get(|| async { ApiError::InternalError("disk on fire".into()) }),
            )
            .route(
                "/missing",
                get(|| async { ApiError::NotFound("Shop not found".into()) }),
            );
        if expose {
            router.layer(axum::middleware::from_fn(expose_internal_errors))
        } else {
            router
        }
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_detail_exposed_in_development() {
        let (status, body) = get_json(router(true), "/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "disk on fire");
    }

    #[tokio::test]
    async fn test_detail_hidden_without_layer() {
        let (status, body) = get_json(router(false), "/boom").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_other_errors_untouched() {
        let (status, body) = get_json(router(true), "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Shop not found");
    }
}
