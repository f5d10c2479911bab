//! Debounced delivery of streamed draft text.
//!
//! The flush engine owns every adapter interaction the stream layer makes:
//! debounced progress edits while the run produces text, and the final
//! edit that replaces the draft with the completed reply. Flush and
//! finalize are serialized per session so at most one progress message is
//! ever created for a run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::bridge::{RunState, SessionRunRegistry};
use crate::channels::{AdapterMap, ChannelName};

use super::state::StreamStateStore;

/// Handle to a scheduled flush. Cancelling is explicit; a handle that
/// fires is cleared by the fired task itself.
#[derive(Debug)]
pub struct TimerHandle {
    handle: JoinHandle<()>,
}

impl TimerHandle {
    pub fn from_join_handle(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }
}

/// Timer abstraction, injectable for deterministic tests.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle;
}

/// Production scheduler backed by `tokio::time`.
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle {
        TimerHandle {
            handle: tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                task.await;
            }),
        }
    }
}

pub struct FlushEngine {
    channel: ChannelName,
    adapters: Arc<AdapterMap>,
    registry: Arc<SessionRunRegistry>,
    state: Arc<StreamStateStore>,
    flush_ms: u64,
    scheduler: Arc<dyn Scheduler>,
    locks: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FlushEngine {
    pub fn new(
        channel: ChannelName,
        adapters: Arc<AdapterMap>,
        registry: Arc<SessionRunRegistry>,
        state: Arc<StreamStateStore>,
        flush_ms: u64,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            channel,
            adapters,
            registry,
            state,
            flush_ms,
            scheduler,
            locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Note new draft text and arm the debounce timer.
    pub fn mark_pending(self: &Arc<Self>, session_id: &str) {
        let exists = self
            .state
            .with(session_id, |state| {
                state.pending = true;
            })
            .is_some();
        if exists {
            self.schedule_flush(session_id);
        }
    }

    pub async fn on_session_idle(self: &Arc<Self>, session_id: &str) {
        self.flush(session_id, true).await;
    }

    pub fn has_streamed_message(&self, session_id: &str) -> bool {
        self.state.message_id(session_id).is_some()
    }

    pub fn clear_session(&self, session_id: &str) {
        self.state.clear_session(session_id);
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.remove(session_id);
    }

    /// Replace the streamed draft with the final reply via one last edit.
    ///
    /// Returns `false` whenever the edit path is unusable: no active run,
    /// nothing streamed yet, text over the adapter limit, or the edit call
    /// failing. A failed edit keeps the streamed message id so the caller
    /// can tell a draft is still on the wire.
    pub async fn finalize_reply(
        self: &Arc<Self>,
        session_id: &str,
        peer_id: &str,
        text: &str,
    ) -> bool {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;

        if self.resolve_run(session_id, false).is_none() {
            return false;
        }
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        self.flush_now(session_id, true).await;

        let Some(message_id) = self.state.message_id(session_id) else {
            return false;
        };
        let Some(adapter) = self.adapters.get(&self.channel) else {
            return false;
        };
        if !adapter.capabilities().progress {
            return false;
        }
        if text.chars().count() > adapter.max_text_length() {
            return false;
        }

        match adapter
            .send_text_progress(peer_id, text, Some(message_id))
            .await
        {
            Ok(receipt) => {
                self.state.with(session_id, |state| {
                    state.message_id = Some(receipt.message_id);
                    state.text = text.to_string();
                    state.pending = false;
                });
                true
            }
            Err(error) => {
                tracing::warn!(
                    session_id,
                    message_id,
                    %error,
                    "final reply edit failed"
                );
                false
            }
        }
    }

    async fn flush(self: &Arc<Self>, session_id: &str, force: bool) {
        let lock = self.session_lock(session_id);
        let _guard = lock.lock().await;
        self.flush_now(session_id, force).await;
    }

    /// One flush attempt. Caller holds the session lock.
    async fn flush_now(&self, session_id: &str, force: bool) {
        let ready = self.state.with(session_id, |state| {
            if state.disabled {
                return false;
            }
            if force {
                if let Some(timer) = state.timer.take() {
                    timer.cancel();
                }
            }
            state.pending
        });
        if ready != Some(true) {
            return;
        }

        let Some(run) = self.resolve_run(session_id, true) else {
            return;
        };
        if run.streaming_suppressed() {
            self.state.with(session_id, |state| state.pending = false);
            return;
        }

        let Some(adapter) = self.adapters.get(&self.channel) else {
            return;
        };
        if !adapter.capabilities().progress {
            return;
        }

        let next_text = self
            .state
            .with(session_id, |state| state.text.trim().to_string())
            .unwrap_or_default();
        if next_text.is_empty() {
            self.state.with(session_id, |state| state.pending = false);
            return;
        }
        if next_text.chars().count() > adapter.max_text_length() {
            self.state.with(session_id, |state| state.disabled = true);
            tracing::debug!(
                session_id,
                length = next_text.chars().count(),
                limit = adapter.max_text_length(),
                "stream disabled, draft over message limit"
            );
            return;
        }

        let message_id = self
            .state
            .with(session_id, |state| {
                state.pending = false;
                state.message_id
            })
            .flatten();

        match adapter
            .send_text_progress(&run.peer_id, &next_text, message_id)
            .await
        {
            Ok(receipt) => {
                self.state.with(session_id, |state| {
                    state.message_id = Some(receipt.message_id);
                });
            }
            Err(error) => {
                tracing::warn!(session_id, %error, "stream flush failed");
            }
        }
    }

    fn schedule_flush(self: &Arc<Self>, session_id: &str) {
        let engine = Arc::clone(self);
        let session = session_id.to_string();
        let flush_ms = self.flush_ms;
        self.state.with(session_id, move |state| {
            if state.disabled || state.timer.is_some() {
                return;
            }
            let scheduler = Arc::clone(&engine.scheduler);
            let timer_session = session.clone();
            state.timer = Some(scheduler.schedule(
                Duration::from_millis(flush_ms),
                Box::pin(async move {
                    engine.state.with(&timer_session, |state| {
                        state.timer = None;
                    });
                    engine.flush(&timer_session, false).await;
                }),
            ));
        });
    }

    fn session_lock(&self, session_id: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn resolve_run(&self, session_id: &str, include_suppressed: bool) -> Option<Arc<RunState>> {
        let run = self.registry.get(session_id)?;
        if run.channel != self.channel {
            return None;
        }
        if !include_suppressed && run.streaming_suppressed() {
            return None;
        }
        Some(run)
    }
}
