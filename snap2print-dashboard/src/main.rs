//! # Snap2Print Terminal Dashboard
//!
//! Watches one shop's print queue and logs each refreshed listing with its
//! pending / completed counts.
//!
//! ## Usage
//!
//! ```bash
//! SNAP2PRINT_SHOP_ID=test-shop cargo run -p snap2print-dashboard
//! ```

use anyhow::Context;
use snap2print_dashboard::{client::DashboardClient, config::DashboardConfig, poller::JobPoller};
use snap2print_shared::dashboard::summarize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snap2print_dashboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DashboardConfig::from_env().context("Failed to load configuration")?;
    let client = DashboardClient::new(config.api_url.clone())?;

    let shop = client
        .get_shop(&config.shop_id)
        .await
        .with_context(|| format!("Cannot open dashboard for {}", config.shop_id))?;
    tracing::info!(shop_id = %shop.shop_id, name = %shop.name, api = %client.base_url(), "Watching print queue");

    let cancel = CancellationToken::new();
    let poller = JobPoller::new(client, shop.shop_id.clone(), config.poll_interval);
    let (handle, mut listings) = poller.spawn(cancel.clone());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        shutdown.cancel();
    });

    while let Some(result) = listings.recv().await {
        let jobs = match result {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!(error = %e, "Listing unavailable");
                continue;
            }
        };

        let summary = summarize(&jobs);
        tracing::info!(
            total = summary.total,
            pending = summary.pending,
            completed = summary.completed,
            pending_pages = summary.pending_pages,
            "Queue"
        );
        for job in &jobs {
            tracing::info!(
                id = %job.id,
                student = %job.student_name,
                file = %job.file_original_name,
                copies = job.copies,
                print_type = job.print_type.as_str(),
                status = job.status.as_str(),
                "  job"
            );
        }
    }

    handle.await.context("Poller task failed")?;
    Ok(())
}
