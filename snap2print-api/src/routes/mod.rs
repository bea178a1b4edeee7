/// API route handlers
///
/// Organized by resource:
///
/// - `health`: Health check endpoint
/// - `shops`: Shop create / lookup / upsert / delete
/// - `auth`: Owner registration, login and profile
/// - `print_jobs`: Submission and dashboard endpoints

pub mod auth;
pub mod health;
pub mod print_jobs;
pub mod shops;
