//! # Snap2Print Dashboard Client
//!
//! HTTP client for the Snap2Print API as used by the shop owner dashboard
//! and the student submission app.
//!
//! ## Modules
//!
//! - `client`: typed calls for shops, job listing, status changes and submissions
//! - `poller`: periodic listing refresh with immediate refresh after mutations
//! - `config`: environment configuration for the terminal dashboard
//! - `error`: client error type
//!
//! ## Example
//!
//! ```no_run
//! use snap2print_dashboard::client::DashboardClient;
//!
//! # async fn example() -> Result<(), snap2print_dashboard::error::ClientError> {
//! let client = DashboardClient::new("http://localhost:4000")?;
//! let jobs = client.get_jobs("test-shop").await?;
//! println!("{} jobs", jobs.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod poller;
