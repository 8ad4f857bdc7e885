//! Idle namespace expiry.

use std::sync::Arc;
use std::time::Duration;

use sqlsandbox_commons::NamespaceName;
use tokio::task::JoinHandle;

use super::NamespaceManager;

impl NamespaceManager {
    /// Drop every namespace unused for longer than `ttl`.
    ///
    /// A namespace whose lock is currently held (a load or query in flight) is
    /// skipped and reconsidered on the next sweep. Returns the dropped names.
    pub fn sweep_idle(&self, ttl: Duration) -> Vec<NamespaceName> {
        let candidates: Vec<_> = self
            .entries
            .iter()
            .filter(|entry| entry.value().idle_for() > ttl)
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut dropped = Vec::new();
        for entry in candidates {
            let Ok(_exclusive) = Arc::clone(&entry.lock).try_write_owned() else {
                log::debug!("Skipping busy namespace {} during idle sweep", entry.name);
                continue;
            };

            // Used again between the scan and taking the lock.
            if entry.idle_for() <= ttl {
                continue;
            }

            match self.remove_entry(&entry) {
                Ok(true) => dropped.push(entry.name.clone()),
                Ok(false) => {},
                Err(e) => log::warn!("Failed to drop idle namespace {}: {}", entry.name, e),
            }
        }

        if !dropped.is_empty() {
            log::info!("Idle sweep dropped {} namespace(s)", dropped.len());
        }
        dropped
    }
}

/// Run [`NamespaceManager::sweep_idle`] every `interval` until the returned
/// handle is aborted.
pub fn spawn_idle_sweeper(
    manager: Arc<NamespaceManager>,
    ttl: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    log::debug!(
        "Starting idle namespace sweeper: ttl={}s, interval={}s",
        ttl.as_secs(),
        interval.as_secs()
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            manager.sweep_idle(ttl);
        }
    })
}
