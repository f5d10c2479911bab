//! Typing indicator loops for active runs.
//!
//! Channels that expose a typing action get a periodic refresh while a run
//! is in flight, so the conversation shows activity between streamed edits.
//! Loops are keyed by session id and cancelled when the run ends or the
//! session goes idle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::channels::adapter::{AdapterMap, ChannelName};

/// Interval between typing refreshes. Most providers expire the indicator
/// after ~5-10 seconds.
pub const TYPING_INTERVAL: Duration = Duration::from_secs(6);

pub struct TypingManager {
    adapters: Arc<AdapterMap>,
    loops: Mutex<HashMap<String, JoinHandle<()>>>,
    interval: Duration,
}

impl TypingManager {
    pub fn new(adapters: Arc<AdapterMap>) -> Self {
        Self::with_interval(adapters, TYPING_INTERVAL)
    }

    pub fn with_interval(adapters: Arc<AdapterMap>, interval: Duration) -> Self {
        Self {
            adapters,
            loops: Mutex::new(HashMap::new()),
            interval,
        }
    }

    /// Start a typing loop for `session_id` if the channel supports typing
    /// and no loop is running yet.
    pub async fn start(&self, session_id: &str, channel: ChannelName, peer_id: &str) {
        let Some(adapter) = self.adapters.get(&channel) else {
            return;
        };
        if !adapter.capabilities().typing {
            return;
        }

        let mut loops = self.loops.lock().await;
        if loops.contains_key(session_id) {
            return;
        }

        let adapter = Arc::clone(adapter);
        let peer_id = peer_id.to_string();
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            loop {
                if let Err(error) = adapter.send_typing(&peer_id).await {
                    tracing::warn!(%channel, %error, "typing update failed");
                }
                tokio::time::sleep(interval).await;
            }
        });
        loops.insert(session_id.to_string(), handle);
    }

    /// Cancel the typing loop for `session_id`, if any.
    pub async fn stop(&self, session_id: &str) {
        if let Some(handle) = self.loops.lock().await.remove(session_id) {
            handle.abort();
        }
    }

    /// Cancel every loop. Used during shutdown.
    pub async fn stop_all(&self) {
        let mut loops = self.loops.lock().await;
        for (_, handle) in loops.drain() {
            handle.abort();
        }
    }
}
