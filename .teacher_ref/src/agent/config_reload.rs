//! Configuration hot-reload task.
//!
//! Listens for [`ReloadEvent`]s from a [`ConfigWatcher`] and reloads
//! configuration from the database, updating the shared [`HotReloadConfig`]
//! so all components see the new values without a restart.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::bootstrap::BootstrapConfig;
use crate::config::Config;
use crate::db::Database;
use crate::hot_reload::{HotReloadConfig, ReloadEvent};

/// Default debounce duration to coalesce rapid reload events.
const DEBOUNCE_DURATION: Duration = Duration::from_millis(500);

/// Spawn a background task that reloads configuration on [`ReloadEvent`]s.
///
/// The task listens on the provided broadcast receiver and, after a 500ms
/// debounce window, reloads `Config` from the database and updates the
/// shared `HotReloadConfig`. This means rapid successive events (e.g.
/// multiple file writes) are collapsed into a single reload.
///
/// # Arguments
///
/// * `rx` - Broadcast receiver for reload events (obtained via
///   [`ConfigWatcher::subscribe`]).
/// * `hot_config` - The shared hot-reload config container to update.
/// * `db` - Database handle used to reload settings via `Config::from_db`.
/// * `user_id` - The user ID passed to `Config::from_db`.
///
/// # Returns
///
/// A `JoinHandle` for the spawned task. The task runs until the broadcast
/// sender is dropped (all senders gone) or the tokio runtime shuts down.
pub fn spawn_config_reload_task(
    rx: broadcast::Receiver<ReloadEvent>,
    hot_config: HotReloadConfig<Config>,
    db: Arc<dyn Database>,
    user_id: String,
) -> JoinHandle<()> {
    tokio::spawn(config_reload_loop(rx, hot_config, db, user_id))
}

/// The inner reload loop, extracted for testability.
async fn config_reload_loop(
    mut rx: broadcast::Receiver<ReloadEvent>,
    hot_config: HotReloadConfig<Config>,
    db: Arc<dyn Database>,
    user_id: String,
) {
    tracing::info!("Config hot-reload task started");

    loop {
        // Wait for the first event.
        let first_event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Closed) => {
                tracing::info!("Config reload channel closed, stopping hot-reload task");
                return;
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(
                    "Config reload receiver lagged by {} events, performing reload",
                    n
                );
                ReloadEvent::DatabaseChanged
            }
        };

        tracing::debug!("Config reload event received: {:?}", first_event);

        // Debounce: wait a short period and drain any additional events
        // that arrive within the window to avoid redundant reloads.
        tokio::time::sleep(DEBOUNCE_DURATION).await;
        let mut coalesced_count: u64 = 0;
        loop {
            match rx.try_recv() {
                Ok(_) => {
                    coalesced_count += 1;
                }
                Err(broadcast::error::TryRecvError::Empty) => break,
                Err(broadcast::error::TryRecvError::Closed) => {
                    tracing::info!(
                        "Config reload channel closed during debounce, stopping hot-reload task"
                    );
                    return;
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(
                        "Config reload receiver lagged by {} events during debounce",
                        n
                    );
                    coalesced_count += n;
                    break;
                }
            }
        }

        if coalesced_count > 0 {
            tracing::debug!(
                "Coalesced {} additional reload events during debounce window",
                coalesced_count
            );
        }

        // Reload configuration from the database.
        let old_generation = hot_config.generation();
        let bootstrap = BootstrapConfig::load();

        match Config::from_db(db.as_ref(), &user_id, &bootstrap).await {
            Ok(new_config) => {
                hot_config.update(new_config).await;
                let new_generation = hot_config.generation();
                tracing::info!(
                    "Configuration reloaded successfully (generation {} -> {})",
                    old_generation,
                    new_generation
                );
            }
            Err(e) => {
                tracing::error!("Failed to reload configuration: {}", e);
            }
        }
    }
}
