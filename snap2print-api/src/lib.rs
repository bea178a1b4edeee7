//! # Snap2Print API Server Library
//!
//! HTTP surface for print job submission and the shop owner dashboard.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: JSON and multipart extractors with `ApiError` rejections
//! - `middleware`: Security headers and development error detail
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
