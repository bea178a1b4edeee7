/// Owner authentication
///
/// - [`password`]: Argon2id hashing and the registration length rule
/// - [`jwt`]: HS256 session tokens carrying the owner's shop identifier
/// - [`middleware`]: axum middleware that turns a bearer token into an
///   [`middleware::AuthContext`]

pub mod jwt;
pub mod middleware;
pub mod password;
