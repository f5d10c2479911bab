//! Best-effort outbound dispatch over the adapter map.
//!
//! Every service that wants to reply goes through [`OutboundDispatcher`]
//! instead of holding adapters directly. Send failures are logged and
//! swallowed; an unreachable channel must never take down the inbound
//! pipeline.

use std::sync::Arc;

use crate::channels::adapter::{AdapterMap, ChannelName, OutboundKind, SendOptions};

pub struct OutboundDispatcher {
    adapters: Arc<AdapterMap>,
}

impl OutboundDispatcher {
    pub fn new(adapters: Arc<AdapterMap>) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &Arc<AdapterMap> {
        &self.adapters
    }

    /// Send `text` to `peer_id` on `channel`, logging any failure.
    pub async fn send_text(
        &self,
        channel: ChannelName,
        peer_id: &str,
        text: &str,
        kind: OutboundKind,
    ) {
        let Some(adapter) = self.adapters.get(&channel) else {
            tracing::warn!(%channel, "outbound dropped: no adapter registered");
            return;
        };

        if let Err(error) = adapter
            .send_text(peer_id, text, SendOptions { kind })
            .await
        {
            tracing::warn!(%channel, peer_id, %error, "outbound send failed");
        } else {
            tracing::debug!(%channel, peer_id, length = text.len(), ?kind, "outbound sent");
        }
    }
}
