//! Identity-change driven cache invalidation
//!
//! Whenever the active principal changes (login, logout, account switch) the
//! host fires an [`IdentityChange`] on an [`IdentitySignal`]. An
//! [`IdentityWatcher`] subscribed to that signal wipes the decision cache so no
//! decision computed under the old identity outlives the switch.

use std::sync::Arc;

use labgate_cache::DecisionCache;
use labgate_const::IDENTITY_CHANNEL_CAPACITY;
use labgate_observe::metrics;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// The active principal moved from `previous` to `current`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityChange {
    pub previous: Option<String>,
    pub current: Option<String>,
}

impl IdentityChange {
    pub fn new(previous: Option<&str>, current: Option<&str>) -> Self {
        Self { previous: previous.map(str::to_string), current: current.map(str::to_string) }
    }
}

/// Broadcast source for identity changes
#[derive(Debug, Clone)]
pub struct IdentitySignal {
    sender: broadcast::Sender<IdentityChange>,
}

impl IdentitySignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(IDENTITY_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Announce a change; returns the number of subscribers that will see it
    pub fn notify(&self, change: IdentityChange) -> usize {
        self.sender.send(change).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<IdentityChange> {
        self.sender.subscribe()
    }
}

impl Default for IdentitySignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Background task clearing the decision cache on every identity change
pub struct IdentityWatcher {
    cache: Arc<DecisionCache>,
    changes: broadcast::Receiver<IdentityChange>,
}

impl IdentityWatcher {
    /// Subscribe to `signal`; changes fired after this call are observed
    pub fn new(signal: &IdentitySignal, cache: Arc<DecisionCache>) -> Self {
        Self { cache, changes: signal.subscribe() }
    }

    /// Start the background watch loop
    ///
    /// Returns the task handle and a sender that stops the loop. The loop also
    /// ends on its own once every `IdentitySignal` clone has been dropped.
    pub fn start(self) -> (JoinHandle<()>, watch::Sender<()>) {
        info!("Starting identity cache invalidation watcher");

        let (shutdown_tx, shutdown_rx) = watch::channel(());

        let handle = tokio::spawn(async move {
            self.watch_loop(shutdown_rx).await;
        });

        (handle, shutdown_tx)
    }

    async fn watch_loop(mut self, mut shutdown_rx: watch::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Identity watcher received shutdown signal");
                    return;
                }
                change = self.changes.recv() => {
                    match change {
                        Ok(change) => {
                            debug!(
                                previous = ?change.previous,
                                current = ?change.current,
                                "Identity changed, invalidating decision cache"
                            );
                            self.invalidate().await;
                        },
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Missed events still mean the identity moved
                            warn!(skipped, "Identity watcher lagged behind");
                            self.invalidate().await;
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Identity signal closed, stopping watcher");
                            return;
                        },
                    }
                }
            }
        }
    }

    async fn invalidate(&self) {
        self.cache.invalidate_all().await;
        metrics::record_cache_invalidation("all");
    }
}
