//! # Snap2Print Shared Library
//!
//! Domain types and business logic used by the Snap2Print API server and the
//! shop dashboard client.
//!
//! ## Module Organization
//!
//! - `models`: shops, owners and print jobs, with their Postgres queries
//! - `store`: the [`store::Store`] interface and its Postgres and in-memory backends
//! - `storage`: disk / S3 upload storage chosen once per process
//! - `submission`: validation and fan-out of print job submissions
//! - `dashboard`: shop-scoped job listing, status changes and view helpers
//! - `auth`: password hashing, session tokens and auth middleware
//! - `db`: connection pool and embedded migrations

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod models;
pub mod storage;
pub mod store;
pub mod submission;

/// Current version of the Snap2Print shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
