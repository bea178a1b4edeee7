/// Terminal dashboard configuration
///
/// # Environment Variables
///
/// - `SNAP2PRINT_API_URL`: API base URL (default: `http://localhost:4000`)
/// - `SNAP2PRINT_SHOP_ID`: shop to watch (required)
/// - `POLL_INTERVAL_SECS`: refresh period (default: 5)

use std::env;
use std::time::Duration;

use anyhow::Context;
use snap2print_shared::dashboard::POLL_INTERVAL;

pub const DEFAULT_API_URL: &str = "http://localhost:4000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub api_url: String,
    pub shop_id: String,
    pub poll_interval: Duration,
}

impl DashboardConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let shop_id = var("SNAP2PRINT_SHOP_ID")
            .context("SNAP2PRINT_SHOP_ID environment variable is required")?;

        let poll_interval = match var("POLL_INTERVAL_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .with_context(|| format!("POLL_INTERVAL_SECS must be a number, got {raw}"))?;
                if secs == 0 {
                    anyhow::bail!("POLL_INTERVAL_SECS must be at least 1");
                }
                Duration::from_secs(secs)
            }
            None => POLL_INTERVAL,
        };

        Ok(Self {
            api_url: var("SNAP2PRINT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            shop_id,
            poll_interval,
        })
    }
}
