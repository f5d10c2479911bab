//! Streaming reply coordination.
//!
//! Channels whose adapter can edit a previously sent message get live
//! draft updates while the agent is still producing text:
//!
//! ```text
//!   agent events ──> EventRouter ──> StreamCoordinator (per channel)
//!                                        │  role / part-type gating
//!                                        │  anti-regression merge
//!                                        ▼
//!                                   FlushEngine ──debounce──> adapter edits
//! ```
//!
//! Channels without edit support get a [`NoopStreamCoordinator`]; the full
//! reply is then sent once by run execution.

mod coordinator;
mod events;
mod flush;
mod roles;
mod state;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{MessageRole, PartSnapshot};
use crate::channels::ChannelName;

pub use coordinator::EditStreamCoordinator;
pub use events::EventRouter;
pub use flush::{FlushEngine, Scheduler, TimerHandle, TokioScheduler};
pub use roles::RoleIndex;
pub use state::{merge_text_prefer_non_regressing, StreamStateStore};

/// Per-channel hook points for live draft streaming.
///
/// All methods are driven by the agent event stream except
/// [`finalize_reply`](StreamCoordinator::finalize_reply) and
/// [`has_streamed_message`](StreamCoordinator::has_streamed_message),
/// which run execution calls when the turn completes.
#[async_trait]
pub trait StreamCoordinator: Send + Sync {
    /// A message's role became known (or was updated).
    async fn on_message_updated(&self, session_id: &str, message_id: &str, role: MessageRole);

    /// A part snapshot arrived, possibly carrying a delta.
    async fn on_message_part_updated(&self, part: &PartSnapshot, delta: Option<&str>);

    /// A bare text delta arrived without a full snapshot.
    async fn on_message_part_delta(
        &self,
        session_id: &str,
        message_id: &str,
        part_id: &str,
        delta: &str,
    );

    /// The session went idle; flush whatever is pending.
    async fn on_session_idle(&self, session_id: &str);

    /// Replace the streamed draft with the final reply text.
    ///
    /// Returns `true` when the reply was delivered by editing the streamed
    /// message, `false` when the caller must deliver it another way.
    async fn finalize_reply(&self, session_id: &str, peer_id: &str, text: &str) -> bool;

    /// Whether a draft message has already been sent for this session.
    async fn has_streamed_message(&self, session_id: &str) -> bool;

    /// Drop all streaming state for the session.
    async fn clear_session(&self, session_id: &str);
}

/// Coordinator used for channels without message editing. Every hook is a
/// no-op and finalize always falls through to a plain send.
#[derive(Default)]
pub struct NoopStreamCoordinator;

#[async_trait]
impl StreamCoordinator for NoopStreamCoordinator {
    async fn on_message_updated(&self, _session_id: &str, _message_id: &str, _role: MessageRole) {}

    async fn on_message_part_updated(&self, _part: &PartSnapshot, _delta: Option<&str>) {}

    async fn on_message_part_delta(
        &self,
        _session_id: &str,
        _message_id: &str,
        _part_id: &str,
        _delta: &str,
    ) {
    }

    async fn on_session_idle(&self, _session_id: &str) {}

    async fn finalize_reply(&self, _session_id: &str, _peer_id: &str, _text: &str) -> bool {
        false
    }

    async fn has_streamed_message(&self, _session_id: &str) -> bool {
        false
    }

    async fn clear_session(&self, _session_id: &str) {}
}

/// Channel-to-coordinator lookup with a shared no-op fallback.
pub struct StreamCoordinatorRegistry {
    coordinators: HashMap<ChannelName, Arc<dyn StreamCoordinator>>,
    noop: Arc<dyn StreamCoordinator>,
}

impl StreamCoordinatorRegistry {
    pub fn new() -> Self {
        Self {
            coordinators: HashMap::new(),
            noop: Arc::new(NoopStreamCoordinator),
        }
    }

    pub fn register(&mut self, channel: ChannelName, coordinator: Arc<dyn StreamCoordinator>) {
        self.coordinators.insert(channel, coordinator);
    }

    pub fn get(&self, channel: ChannelName) -> Arc<dyn StreamCoordinator> {
        self.coordinators
            .get(&channel)
            .cloned()
            .unwrap_or_else(|| self.noop.clone())
    }
}

impl Default for StreamCoordinatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_falls_back_to_noop() {
        let registry = StreamCoordinatorRegistry::new();
        let coordinator = registry.get(ChannelName::Email);
        assert!(!coordinator.finalize_reply("s1", "peer", "hello").await);
        assert!(!coordinator.has_streamed_message("s1").await);
    }
}
