//! Conversation-to-session binding.
//!
//! Each (channel, session key) pair maps to exactly one agent session.
//! First contact creates the session and persists the binding; every later
//! message reuses it. `/reset` deletes the binding, so the next message
//! binds fresh.

use std::sync::Arc;

use crate::agent::AgentRuntime;
use crate::channels::{ChannelName, SessionKey};
use crate::error::Result;
use crate::store::BridgeStore;

/// Outcome of a binding lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session_id: String,
    /// Whether an existing binding was reused.
    pub reused: bool,
}

pub struct SessionBindingService {
    store: Arc<dyn BridgeStore>,
    agent: Arc<dyn AgentRuntime>,
}

impl SessionBindingService {
    pub fn new(store: Arc<dyn BridgeStore>, agent: Arc<dyn AgentRuntime>) -> Self {
        Self { store, agent }
    }

    /// Return the session bound to this conversation, creating and
    /// persisting one on first contact.
    ///
    /// If session creation succeeds but the binding write fails, the error
    /// propagates and no reply is produced; the orphaned agent session is
    /// abandoned rather than used unbound.
    pub async fn resolve_session(
        &self,
        channel: ChannelName,
        session_key: &SessionKey,
    ) -> Result<ResolvedSession> {
        if let Some(record) = self.store.get_session(channel, session_key.as_str()).await? {
            tracing::debug!(
                channel = %channel,
                session_key = session_key.as_str(),
                session_id = %record.session_id,
                "reusing bound session"
            );
            return Ok(ResolvedSession {
                session_id: record.session_id,
                reused: true,
            });
        }

        let session_id = self.agent.create_session().await?;
        self.store
            .bind_session(channel, session_key.as_str(), &session_id)
            .await?;
        tracing::info!(
            channel = %channel,
            session_key = session_key.as_str(),
            session_id = %session_id,
            "bound new session"
        );
        Ok(ResolvedSession {
            session_id,
            reused: false,
        })
    }

    /// Drop the binding for this conversation. Missing bindings are a no-op.
    pub async fn reset_session(
        &self,
        channel: ChannelName,
        session_key: &SessionKey,
    ) -> Result<()> {
        self.store
            .delete_session(channel, session_key.as_str())
            .await?;
        Ok(())
    }
}
