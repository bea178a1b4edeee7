/// Application state and router builder
///
/// This module defines the shared application state and builds the Axum
/// router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use snap2print_api::{app::AppState, config::Config};
/// use snap2print_shared::{storage::StorageRouter, store::MemoryStore};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let storage = StorageRouter::from_config(config.storage_config()).await?;
/// let state = AppState::new(Arc::new(MemoryStore::with_demo_shop()), storage, config);
/// let app = snap2print_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    middleware::{error_detail::expose_internal_errors, security::SecurityHeadersLayer},
    routes,
};
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use snap2print_shared::{
    auth::middleware::create_jwt_middleware,
    dashboard::Dashboard,
    storage::{StorageKind, StorageRouter},
    store::Store,
    submission::SubmissionPipeline,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Job store chosen at startup (Postgres or in-memory)
    pub store: Arc<dyn Store>,

    /// Upload storage chosen at startup (disk or S3)
    pub storage: StorageRouter,

    pub submissions: SubmissionPipeline,

    pub dashboard: Dashboard,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, storage: StorageRouter, config: Config) -> Self {
        Self {
            submissions: SubmissionPipeline::new(store.clone(), storage.clone()),
            dashboard: Dashboard::new(store.clone()),
            store,
            storage,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check
/// ├── /uploads/:file                   # Stored uploads (disk backend only)
/// └── /api/
///     ├── /shops/
///     │   ├── POST   /
///     │   └── GET | PUT | DELETE /:shopId
///     ├── /auth/
///     │   ├── POST /register
///     │   ├── POST /login
///     │   └── GET  /profile            # Bearer token
///     └── /print-jobs/
///         ├── GET    /:shopId
///         ├── POST   /:shopId/upload
///         ├── POST   /:shopId/uploads
///         ├── POST   /:shopId/metadata
///         ├── PATCH  /status/:jobId
///         ├── POST   /:jobId/print
///         └── DELETE /:jobId
/// ```
///
/// Shop and job identifiers share the `/:id` segment because the router
/// requires one parameter name per position.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Internal error detail (development only)
/// 2. Upload body limit
/// 3. Logging (tower-http TraceLayer)
/// 4. Compression
/// 5. CORS
/// 6. Security headers
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let shop_routes = Router::new()
        .route("/", post(routes::shops::create_shop))
        .route(
            "/:id",
            get(routes::shops::get_shop)
                .put(routes::shops::upsert_shop)
                .delete(routes::shops::delete_shop),
        );

    let profile_routes = Router::new()
        .route("/profile", get(routes::auth::profile))
        .route_layer(axum::middleware::from_fn(create_jwt_middleware(
            config.jwt.secret.clone(),
        )));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .merge(profile_routes);

    let print_job_routes = Router::new()
        .route("/status/:id", patch(routes::print_jobs::update_status))
        .route(
            "/:id",
            get(routes::print_jobs::list_jobs).delete(routes::print_jobs::delete_job),
        )
        .route("/:id/upload", post(routes::print_jobs::upload_one))
        .route("/:id/uploads", post(routes::print_jobs::upload_many))
        .route("/:id/metadata", post(routes::print_jobs::submit_metadata))
        .route("/:id/print", post(routes::print_jobs::send_to_printer));

    let api_routes = Router::new()
        .nest("/shops", shop_routes)
        .nest("/auth", auth_routes)
        .nest("/print-jobs", print_job_routes);

    let mut router = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api_routes);

    if state.storage.kind() == StorageKind::Disk {
        router = router.nest_service("/uploads", ServeDir::new(&config.storage.uploads_dir));
    }

    if !config.api.production {
        router = router.layer(axum::middleware::from_fn(expose_internal_errors));
    }

    router
        .layer(DefaultBodyLimit::max(config.storage.max_upload_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors_layer(&config))
        .layer(SecurityHeadersLayer::new(config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}
