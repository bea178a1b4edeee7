/// Configuration management for the API server
///
/// Loaded from environment variables (a `.env` file is honoured in
/// development).
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default: 0.0.0.0:4000)
/// - `APP_ENV`: `development` (default) or `production`
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: `*`)
/// - `DATABASE_URL`: PostgreSQL URL; when unset jobs are kept in memory
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `JWT_SECRET`: token signing key, at least 32 characters (required)
/// - `JWT_EXPIRES_IN_HOURS`: token lifetime (default: 168)
/// - `UPLOADS_DIR`: directory for disk uploads (default: `uploads`)
/// - `MAX_UPLOAD_BYTES`: request body limit (default: 10 MiB)
/// - `ALLOWED_CONTENT_TYPES`: comma-separated allowlist, e.g. `application/pdf,image/*`
/// - `S3_BUCKET`, `S3_ENDPOINT`, `S3_ACCESS_KEY_ID`, `S3_SECRET_ACCESS_KEY`:
///   all four enable object storage
/// - `S3_REGION` (default: `auto`), `S3_PUBLIC_BASE`
/// - `SEED_DEMO_SHOP`: seed `test-shop` into the in-memory store (default: true)
///
/// # Example
///
/// ```no_run
/// use snap2print_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use snap2print_shared::auth::jwt::DEFAULT_EXPIRATION_HOURS;
use snap2print_shared::storage::{S3Settings, StorageConfig};

/// Default request body limit: 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,

    /// None selects the in-memory store
    pub database: Option<DatabaseConfig>,

    pub jwt: JwtConfig,

    pub storage: StorageSettings,

    /// Seed the demo shop when running in memory
    pub seed_demo_shop: bool,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Enables HSTS and hides internal error details
    pub production: bool,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// IMPORTANT: keep secret; at least 32 bytes.
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub expires_in_hours: i64,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub allowed_content_types: Vec<String>,
    pub s3: Option<S3Settings>,
}

fn parse_list(raw: Option<String>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if `JWT_SECRET` is missing or too short, or a
    /// numeric / boolean variable does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = var("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("API_PORT")
            .map(|v| v.parse::<u16>())
            .transpose()
            .context("API_PORT must be a port number")?
            .unwrap_or(4000);

        let app_env = var("APP_ENV").unwrap_or_else(|| "development".to_string());
        let production = match app_env.to_ascii_lowercase().as_str() {
            "production" => true,
            "development" | "test" => false,
            other => anyhow::bail!("APP_ENV must be development or production, got {other}"),
        };

        let cors_origins = match var("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => vec!["*".to_string()],
        };

        let database = match var("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: var("DATABASE_MAX_CONNECTIONS")
                    .map(|v| v.parse::<u32>())
                    .transpose()
                    .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?
                    .unwrap_or(10),
            }),
            None => None,
        };

        let secret = var("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        let expires_in_hours = var("JWT_EXPIRES_IN_HOURS")
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("JWT_EXPIRES_IN_HOURS must be an integer")?
            .unwrap_or(DEFAULT_EXPIRATION_HOURS);
        if expires_in_hours <= 0 {
            anyhow::bail!("JWT_EXPIRES_IN_HOURS must be positive");
        }

        let storage = StorageSettings {
            uploads_dir: var("UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes: var("MAX_UPLOAD_BYTES")
                .map(|v| v.parse::<usize>())
                .transpose()
                .context("MAX_UPLOAD_BYTES must be a byte count")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            allowed_content_types: parse_list(var("ALLOWED_CONTENT_TYPES")),
            s3: S3Settings::from_parts(
                var("S3_BUCKET"),
                var("S3_ENDPOINT"),
                var("S3_ACCESS_KEY_ID"),
                var("S3_SECRET_ACCESS_KEY"),
                var("S3_REGION"),
                var("S3_PUBLIC_BASE"),
            ),
        };

        let seed_demo_shop = match var("SEED_DEMO_SHOP") {
            Some(raw) => parse_bool(&raw)
                .with_context(|| format!("SEED_DEMO_SHOP must be true or false, got {raw}"))?,
            None => true,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                production,
                cors_origins,
            },
            database,
            jwt: JwtConfig {
                secret,
                expires_in_hours,
            },
            storage,
            seed_demo_shop,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Storage settings in the form the storage router expects
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            uploads_dir: self.storage.uploads_dir.clone(),
            s3: self.storage.s3.clone(),
            allowed_content_types: self.storage.allowed_content_types.clone(),
        }
    }
}
