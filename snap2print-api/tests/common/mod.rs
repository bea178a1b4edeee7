/// Common test utilities for integration tests
///
/// Every test gets its own router backed by a fresh in-memory store and a
/// temporary uploads directory, so tests run in parallel without a
/// database.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use snap2print_api::app::{build_router, AppState};
use snap2print_api::config::Config;
use snap2print_shared::storage::StorageRouter;
use snap2print_shared::store::{MemoryStore, Store};
use tempfile::TempDir;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

const BOUNDARY: &str = "snap2print-test-boundary";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub uploads: TempDir,
}

impl TestContext {
    /// Development-mode server with the `test-shop` demo shop
    pub async fn new() -> Self {
        Self::with_env(&[]).await
    }

    /// Server with extra configuration variables
    pub async fn with_env(vars: &[(&str, &str)]) -> Self {
        let uploads = TempDir::new().expect("temp dir");
        let uploads_dir = uploads.path().to_string_lossy().to_string();

        let mut env: HashMap<String, String> = HashMap::from([
            ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
            ("UPLOADS_DIR".to_string(), uploads_dir),
        ]);
        for (key, value) in vars {
            env.insert(key.to_string(), value.to_string());
        }
        let config = Config::from_lookup(|key| env.get(key).cloned()).expect("config");

        let storage = StorageRouter::from_config(config.storage_config())
            .await
            .expect("storage");

        let store = Arc::new(MemoryStore::with_demo_shop());
        let dyn_store: Arc<dyn Store> = store.clone();
        let app = build_router(AppState::new(dyn_store, storage, config));

        Self {
            app,
            store,
            uploads,
        }
    }

    /// Sends a request and returns status plus JSON body (Null when empty)
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(empty_request("GET", uri)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.send(empty_request("DELETE", uri)).await
    }

    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        self.send(json_request(method, uri, body)).await
    }

    /// Registers an owner and returns the response body
    pub async fn register(&self, email: &str, shop_name: &str) -> serde_json::Value {
        let (status, body) = self
            .send_json(
                "POST",
                "/api/auth/register",
                serde_json::json!({
                    "email": email,
                    "password": "secret1",
                    "shopName": shop_name,
                    "location": "12 Campus Road",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

/// One part of a multipart body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        field: &'a str,
        name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

/// Builds a `multipart/form-data` POST request
pub fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                field,
                name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .expect("request")
}

pub fn pdf<'a>(field: &'a str, name: &'a str, bytes: &'a [u8]) -> Part<'a> {
    Part::File {
        field,
        name,
        content_type: "application/pdf",
        bytes,
    }
}
