use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by [`DashboardClient`](crate::client::DashboardClient)
#[derive(Debug, Error)]
pub enum ClientError {
    /// Non-2xx response; `message` comes from the server's `{message}` body
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },

    /// The shop a submission targets does not exist
    #[error("Shop not found: {0}")]
    ShopNotFound(String),

    /// Transport failure or undecodable response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid base URL or client settings
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ClientError {
    /// Status code of an API error
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::ShopNotFound(_) => Some(StatusCode::NOT_FOUND),
            ClientError::Http(e) => e.status(),
            ClientError::Configuration(_) => None,
        }
    }
}
