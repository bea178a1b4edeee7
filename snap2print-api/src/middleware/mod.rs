/// Middleware modules for the API server
///
/// - `security`: OWASP response headers
/// - `error_detail`: exposes internal error detail outside production

pub mod error_detail;
pub mod security;
