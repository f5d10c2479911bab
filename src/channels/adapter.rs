//! Normalized channel adapter contract.
//!
//! Every channel implementation (socket, webhook, or polling) converts its
//! wire protocol into [`InboundMessage`] values and exposes the outbound
//! operations defined by [`Adapter`]. The bridge core never talks to a wire
//! protocol directly; it only sees this contract.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

/// The nine channel identifiers the bridge knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelName {
    Telegram,
    WhatsApp,
    Slack,
    Discord,
    Feishu,
    DingTalk,
    Email,
    Mochat,
    Qq,
}

impl ChannelName {
    /// All channels, in configuration order.
    pub const ALL: [ChannelName; 9] = [
        ChannelName::Telegram,
        ChannelName::WhatsApp,
        ChannelName::Slack,
        ChannelName::Discord,
        ChannelName::Feishu,
        ChannelName::DingTalk,
        ChannelName::Email,
        ChannelName::Mochat,
        ChannelName::Qq,
    ];

    /// Canonical lowercase identifier used in config files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelName::Telegram => "telegram",
            ChannelName::WhatsApp => "whatsapp",
            ChannelName::Slack => "slack",
            ChannelName::Discord => "discord",
            ChannelName::Feishu => "feishu",
            ChannelName::DingTalk => "dingtalk",
            ChannelName::Email => "email",
            ChannelName::Mochat => "mochat",
            ChannelName::Qq => "qq",
        }
    }

    /// Human-readable label for status output.
    pub fn label(&self) -> &'static str {
        match self {
            ChannelName::Telegram => "Telegram",
            ChannelName::WhatsApp => "WhatsApp",
            ChannelName::Slack => "Slack",
            ChannelName::Discord => "Discord",
            ChannelName::Feishu => "Feishu",
            ChannelName::DingTalk => "DingTalk",
            ChannelName::Email => "Email",
            ChannelName::Mochat => "MoChat",
            ChannelName::Qq => "QQ",
        }
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelName {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelName::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ChannelError::NotFound(s.to_string()))
    }
}

/// A normalized inbound message produced by a channel adapter.
///
/// `raw` carries the opaque provider payload; the bridge only inspects it to
/// extract sender identity and delivery keys, never to format output.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel: ChannelName,
    /// Channel-defined conversation handle (chat id, channel id, thread id).
    pub peer_id: String,
    pub text: String,
    pub raw: Option<serde_json::Value>,
    /// Self-echo flag for channels without reliable sender-is-bot metadata.
    pub from_me: bool,
}

impl InboundMessage {
    pub fn new(channel: ChannelName, peer_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel,
            peer_id: peer_id.into(),
            text: text.into(),
            raw: None,
            from_me: false,
        }
    }

    pub fn with_raw(mut self, raw: serde_json::Value) -> Self {
        self.raw = Some(raw);
        self
    }
}

/// Classification of outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundKind {
    /// An agent-generated reply.
    Reply,
    /// A bridge-generated notice (denials, pairing codes, errors).
    System,
    /// Tool activity updates.
    Tool,
}

/// Options for [`Adapter::send_text`].
#[derive(Debug, Clone, Copy)]
pub struct SendOptions {
    pub kind: OutboundKind,
}

/// Capability flags each adapter declares.
///
/// Callers must check the relevant flag before invoking the optional
/// operations; the default trait methods reject with
/// [`ChannelError::Unsupported`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterCapabilities {
    /// Supports create-or-edit live progress messages.
    pub progress: bool,
    /// Supports typing indicators.
    pub typing: bool,
    /// Supports file attachments.
    pub file: bool,
}

/// Receipt returned by [`Adapter::send_text_progress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReceipt {
    /// Provider message id of the created or edited message.
    pub message_id: i64,
}

/// The contract every channel implementation must satisfy.
///
/// Outbound calls may fail (network, auth); callers are expected to catch
/// and log rather than let a send failure take down the pipeline.
#[async_trait]
pub trait Adapter: Send + Sync {
    fn name(&self) -> ChannelName;

    /// Hard per-message text length limit imposed by the channel.
    fn max_text_length(&self) -> usize;

    fn capabilities(&self) -> AdapterCapabilities;

    /// Open the adapter's long-lived connection (socket, listener, or poll loop).
    async fn start(&self) -> Result<(), ChannelError>;

    /// Close the connection, allowing in-flight sends to complete or time out.
    async fn stop(&self) -> Result<(), ChannelError>;

    async fn send_text(
        &self,
        peer_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<(), ChannelError>;

    /// Create or edit a live progress message.
    ///
    /// With `message_id = None` a new message is created and its id returned;
    /// with `Some(id)` the existing message is edited in place.
    async fn send_text_progress(
        &self,
        _peer_id: &str,
        _text: &str,
        _message_id: Option<i64>,
    ) -> Result<ProgressReceipt, ChannelError> {
        Err(ChannelError::Unsupported {
            channel: self.name().to_string(),
            operation: "send_text_progress".to_string(),
        })
    }

    async fn send_typing(&self, _peer_id: &str) -> Result<(), ChannelError> {
        Err(ChannelError::Unsupported {
            channel: self.name().to_string(),
            operation: "send_typing".to_string(),
        })
    }

    async fn send_file(
        &self,
        _peer_id: &str,
        _path: &Path,
        _caption: Option<&str>,
    ) -> Result<(), ChannelError> {
        Err(ChannelError::Unsupported {
            channel: self.name().to_string(),
            operation: "send_file".to_string(),
        })
    }
}

/// Shared map of active adapters keyed by channel.
pub type AdapterMap = HashMap<ChannelName, Arc<dyn Adapter>>;
