/// Background loop that keeps the dashboard in step with Spotify
use super::{SyncDriver, TickOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

struct PollerTask {
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Owns at most one polling loop.
///
/// `start` on a running poller does nothing; `stop` waits for the loop to
/// finish its current tick and exit.
pub struct Poller {
    driver: Arc<SyncDriver>,
    interval: Duration,
    task: Mutex<Option<PollerTask>>,
}

impl Poller {
    pub fn new(driver: Arc<SyncDriver>, interval: Duration) -> Self {
        Self {
            driver,
            interval,
            task: Mutex::new(None),
        }
    }

    /// Start polling. Returns `false` if a loop was already running.
    pub async fn start(&self) -> bool {
        let mut task = self.task.lock().await;
        if let Some(existing) = task.as_ref() {
            if !existing.handle.is_finished() {
                tracing::debug!("Dashboard poller already running");
                return false;
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(poll_loop(self.driver.clone(), self.interval, stop_rx));
        *task = Some(PollerTask { stop_tx, handle });

        tracing::info!("Dashboard poller started (every {:?})", self.interval);
        true
    }

    /// Signal the loop and wait for it to exit. No-op when not running.
    pub async fn stop(&self) {
        // Held until the loop has exited so a concurrent start cannot overlap it
        let mut task = self.task.lock().await;
        let Some(PollerTask { stop_tx, handle }) = task.take() else {
            return;
        };

        let _ = stop_tx.send(true);
        if let Err(e) = handle.await {
            tracing::warn!("Dashboard poller ended abnormally: {}", e);
        }
        tracing::info!("Dashboard poller stopped");
    }

    pub async fn is_running(&self) -> bool {
        matches!(self.task.lock().await.as_ref(), Some(task) if !task.handle.is_finished())
    }
}

async fn poll_loop(driver: Arc<SyncDriver>, period: Duration, mut stop_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = ticker.tick() => {}
        }

        match driver.poll_tick().await {
            Ok(TickOutcome::Updated(_)) => tracing::debug!("Dashboard refreshed"),
            Ok(TickOutcome::NoChangeNeeded) => {}
            Ok(TickOutcome::NoTrackPlaying) => tracing::debug!("Nothing playing, dashboard left as is"),
            Ok(TickOutcome::NoActiveDevice) => tracing::debug!("No active device, dashboard left as is"),
            Ok(TickOutcome::RateLimited(delay)) => {
                tracing::warn!("Rate limited by Spotify, backing off for {:?}", delay);
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                ticker.reset();
            }
            Err(e) => tracing::warn!("Dashboard poll failed: {}", e),
        }
    }

    tracing::debug!("Dashboard poll loop exited");
}
