/// Periodic job listing refresh
///
/// [`JobPoller`] fetches a shop's listing immediately, then every
/// `interval`, sending each result down a channel. A [`RefreshHandle`]
/// triggers an extra fetch right away (used after a status change or
/// delete) and restarts the interval. The loop ends when its
/// `CancellationToken` fires or the receiver is dropped.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use snap2print_dashboard::{client::DashboardClient, poller::JobPoller};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DashboardClient::new("http://localhost:4000")?;
/// let poller = JobPoller::new(client, "test-shop", Duration::from_secs(5));
/// let cancel = CancellationToken::new();
/// let (handle, mut listings) = poller.spawn(cancel.clone());
///
/// if let Some(Ok(jobs)) = listings.recv().await {
///     println!("{} jobs", jobs.len());
/// }
/// cancel.cancel();
/// handle.await?;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;
use std::time::Duration;

use snap2print_shared::models::PrintJob;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::client::DashboardClient;
use crate::error::ClientError;

/// One refresh outcome
pub type PollResult = Result<Vec<PrintJob>, ClientError>;

/// Buffered listings before the poller waits on the consumer
const CHANNEL_CAPACITY: usize = 8;

/// Requests an immediate refresh from a running poller
#[derive(Debug, Clone)]
pub struct RefreshHandle(Arc<Notify>);

impl RefreshHandle {
    pub fn refresh(&self) {
        self.0.notify_one();
    }

    /// Awaits a mutation and refreshes the listing if it succeeded
    ///
    /// ```no_run
    /// # use snap2print_dashboard::{client::DashboardClient, poller::RefreshHandle};
    /// # use snap2print_shared::models::JobStatus;
    /// # async fn example(client: DashboardClient, refresh: RefreshHandle, id: uuid::Uuid)
    /// #     -> Result<(), snap2print_dashboard::error::ClientError> {
    /// refresh.after(client.set_status(id, JobStatus::Completed)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn after<T, F>(&self, mutation: F) -> Result<T, ClientError>
    where
        F: std::future::Future<Output = Result<T, ClientError>>,
    {
        let result = mutation.await;
        if result.is_ok() {
            self.refresh();
        }
        result
    }
}

pub struct JobPoller {
    client: DashboardClient,
    shop_id: String,
    interval: Duration,
    refresh: Arc<Notify>,
}

impl JobPoller {
    pub fn new(client: DashboardClient, shop_id: impl Into<String>, interval: Duration) -> Self {
        Self {
            client,
            shop_id: shop_id.into(),
            interval,
            refresh: Arc::new(Notify::new()),
        }
    }

    pub fn refresh_handle(&self) -> RefreshHandle {
        RefreshHandle(self.refresh.clone())
    }

    /// Runs the poller on a background task
    pub fn spawn(self, cancel: CancellationToken) -> (JoinHandle<()>, mpsc::Receiver<PollResult>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(self.run(cancel, tx));
        (handle, rx)
    }

    /// Polls until cancelled or the receiver goes away
    pub async fn run(self, cancel: CancellationToken, listings: mpsc::Sender<PollResult>) {
        tracing::info!(shop_id = %self.shop_id, interval = ?self.interval, "Job poller starting");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = self.refresh.notified() => ticker.reset(),
                _ = ticker.tick() => {}
            }

            let result = self.client.get_jobs(&self.shop_id).await;
            match &result {
                Ok(jobs) => tracing::debug!(shop_id = %self.shop_id, count = jobs.len(), "Fetched job listing"),
                Err(e) => tracing::warn!(shop_id = %self.shop_id, error = %e, "Failed to fetch job listing"),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = listings.send(result) => {
                    if sent.is_err() {
                        tracing::debug!("Listing receiver dropped");
                        break;
                    }
                }
            }
        }

        tracing::info!(shop_id = %self.shop_id, "Job poller stopped");
    }
}
