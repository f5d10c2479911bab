//! The inbound pipeline: everything that happens between an adapter
//! receiving a message and a run landing on the session queue.
//!
//! Stage order is fixed: dedup, access control, slash commands, session
//! binding, run enqueue. Each stage can terminate the pipeline; later
//! stages never run after a denial or a handled command.

use std::sync::Arc;

use crate::channels::{
    resolve_access_identity, InboundDeduper, InboundMessage, OutboundDispatcher,
};
use crate::error::Result;
use crate::store::BridgeStore;

use super::access::AccessControlService;
use super::binding::SessionBindingService;
use super::commands::InboundCommandService;
use super::execution::{RunExecutionService, RunInput};
use super::registry::SessionRunRegistry;

pub struct InboundPipeline {
    outbound: Arc<OutboundDispatcher>,
    store: Arc<dyn BridgeStore>,
    registry: Arc<SessionRunRegistry>,
    access: Arc<AccessControlService>,
    commands: Arc<InboundCommandService>,
    binding: Arc<SessionBindingService>,
    execution: Arc<RunExecutionService>,
    deduper: InboundDeduper,
}

impl InboundPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        outbound: Arc<OutboundDispatcher>,
        store: Arc<dyn BridgeStore>,
        registry: Arc<SessionRunRegistry>,
        access: Arc<AccessControlService>,
        commands: Arc<InboundCommandService>,
        binding: Arc<SessionBindingService>,
        execution: Arc<RunExecutionService>,
    ) -> Self {
        Self {
            outbound,
            store,
            registry,
            access,
            commands,
            binding,
            execution,
            deduper: InboundDeduper::default(),
        }
    }

    /// Run the pipeline for one inbound message. Returns once the run is
    /// enqueued; the run itself executes on the session queue.
    pub async fn handle_inbound(&self, message: InboundMessage) -> Result<()> {
        if !self.outbound.adapters().contains_key(&message.channel) {
            return Ok(());
        }

        if self.deduper.is_duplicate(&message) {
            tracing::debug!(
                channel = %message.channel,
                peer_id = %message.peer_id,
                "duplicate inbound ignored"
            );
            return Ok(());
        }

        tracing::debug!(
            channel = %message.channel,
            peer_id = %message.peer_id,
            from_me = message.from_me,
            length = message.text.len(),
            preview = preview(message.text.trim()),
            "inbound received"
        );
        tracing::info!(
            channel = %message.channel,
            peer_id = %message.peer_id,
            length = message.text.len(),
            "received message"
        );

        let identity = resolve_access_identity(&message);
        if !self
            .access
            .allow_inbound(&message, &identity.access_key)
            .await?
        {
            return Ok(());
        }

        let trimmed = message.text.trim();
        if trimmed.starts_with('/') {
            let handled = self
                .commands
                .handle_command(
                    message.channel,
                    &identity.session_key,
                    &message.peer_id,
                    trimmed,
                )
                .await?;
            if handled {
                return Ok(());
            }
        }

        let resolved = self
            .binding
            .resolve_session(message.channel, &identity.session_key)
            .await?;

        let execution = Arc::clone(&self.execution);
        let session_id = resolved.session_id.clone();
        let session_key = identity.session_key;
        self.registry.enqueue(&resolved.session_id, async move {
            execution
                .execute(RunInput {
                    message,
                    session_key,
                    session_id,
                })
                .await;
        });
        Ok(())
    }

    /// Like [`handle_inbound`](Self::handle_inbound), but waits until the
    /// session's queue drains. Used by adapters that must not return until
    /// the reply has been delivered.
    pub async fn dispatch_inbound(&self, message: InboundMessage) -> Result<()> {
        let identity = resolve_access_identity(&message);
        let channel = message.channel;
        self.handle_inbound(message).await?;

        if let Some(record) = self
            .store
            .get_session(channel, identity.session_key.as_str())
            .await?
        {
            self.registry.wait_idle(&record.session_id).await;
        }
        Ok(())
    }
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}
