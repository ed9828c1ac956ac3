use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::fx::RateCache;

/// Background exchange-rate refresher
#[derive(Clone)]
pub struct RateRefreshScheduler {
    cache: Arc<RateCache>,
    interval: Duration,
    task: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl RateRefreshScheduler {
    pub fn new(cache: Arc<RateCache>, interval: Duration) -> Self {
        Self {
            cache,
            interval,
            task: Arc::new(RwLock::new(None)),
        }
    }

    /// Start the refresh loop, replacing any loop already running
    pub async fn start(&self) {
        self.stop().await;

        let cache = Arc::clone(&self.cache);
        let period = self.interval;
        log::info!(
            "Starting background rate refresh for {} every {}s",
            cache.base_currency(),
            period.as_secs()
        );

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                interval.tick().await;

                // Failures are already logged by the cache and served from stale data
                if cache.refresh_if_stale().await {
                    log::debug!("Background rate refresh tick completed a refresh");
                }
            }
        });

        *self.task.write().await = Some(handle);
    }

    /// Stop the refresh loop
    pub async fn stop(&self) {
        if let Some(handle) = self.task.write().await.take() {
            handle.abort();
            log::info!("Background rate refresh stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .read()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
