//! Agent runtime contract and event model.
//!
//! The bridge never embeds the agent; it consumes it through two surfaces:
//! [`AgentRuntime`] for "create a conversation" and "run a turn", and a
//! stream of [`AgentEvent`] values describing in-progress output. The event
//! shapes carry only what the streaming coordinator needs: role, part id,
//! part type, and text/delta fields.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::channels::ChannelName;
use crate::error::AgentError;

/// Role of the message a part belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Type of an output part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartType {
    Text,
    Reasoning,
    Tool,
}

/// Full snapshot of one output part, as carried by part-updated events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartSnapshot {
    pub session_id: String,
    pub message_id: String,
    pub part_id: String,
    pub part_type: PartType,
    #[serde(default)]
    pub text: String,
    /// Text parts the agent marked as not user-facing.
    #[serde(default)]
    pub ignored: bool,
}

/// Events delivered by the agent runtime's event stream.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A message's metadata changed; this is where a message's role becomes
    /// known.
    MessageUpdated {
        session_id: String,
        message_id: String,
        role: MessageRole,
    },
    /// A part snapshot, optionally paired with the delta that produced it.
    MessagePartUpdated {
        part: PartSnapshot,
        delta: Option<String>,
    },
    /// An incremental text append for a part.
    MessagePartDelta {
        session_id: String,
        message_id: String,
        part_id: String,
        delta: String,
    },
    /// The session has no more work in flight.
    SessionIdle { session_id: String },
}

impl AgentEvent {
    pub fn session_id(&self) -> &str {
        match self {
            AgentEvent::MessageUpdated { session_id, .. } => session_id,
            AgentEvent::MessagePartUpdated { part, .. } => &part.session_id,
            AgentEvent::MessagePartDelta { session_id, .. } => session_id,
            AgentEvent::SessionIdle { session_id } => session_id,
        }
    }
}

/// One part of a completed turn's response.
#[derive(Debug, Clone)]
pub struct ResponsePart {
    pub part_type: PartType,
    pub text: String,
    pub ignored: bool,
}

impl ResponsePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            part_type: PartType::Text,
            text: text.into(),
            ignored: false,
        }
    }
}

/// The authoritative result of one agent turn.
#[derive(Debug, Clone, Default)]
pub struct PromptResponse {
    pub parts: Vec<ResponsePart>,
}

impl PromptResponse {
    /// Join the user-facing text parts into the final reply.
    pub fn reply_text(&self) -> String {
        self.parts
            .iter()
            .filter(|part| part.part_type == PartType::Text && !part.ignored)
            .map(|part| part.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

/// Reference to a concrete model at a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider_id: String,
    pub model_id: String,
}

impl ModelRef {
    pub fn new(provider_id: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            model_id: model_id.into(),
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider_id, self.model_id)
    }
}

/// Model presets selectable via slash command (`/opus`, `/codex`).
pub fn model_preset(name: &str) -> Option<ModelRef> {
    match name {
        "opus" => Some(ModelRef::new("anthropic", "claude-opus-4-5")),
        "codex" => Some(ModelRef::new("openai", "gpt-5.2-codex")),
        _ => None,
    }
}

/// Per-conversation model overrides, in memory only.
#[derive(Default)]
pub struct ModelStore {
    overrides: RwLock<HashMap<(ChannelName, String), ModelRef>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(
        &self,
        channel: ChannelName,
        peer_key: &str,
        default: Option<&ModelRef>,
    ) -> Option<ModelRef> {
        let overrides = self.overrides.read().await;
        overrides
            .get(&(channel, peer_key.to_string()))
            .cloned()
            .or_else(|| default.cloned())
    }

    pub async fn set(&self, channel: ChannelName, peer_key: &str, model: Option<ModelRef>) {
        let mut overrides = self.overrides.write().await;
        match model {
            Some(model) => {
                overrides.insert((channel, peer_key.to_string()), model);
            }
            None => {
                overrides.remove(&(channel, peer_key.to_string()));
            }
        }
    }
}

/// The "run a turn" surface of the agent runtime.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Create a new agent conversation and return its identifier.
    async fn create_session(&self) -> Result<String, AgentError>;

    /// Run one turn in `session_id` and return the completed response.
    /// Partial output arrives separately on the event stream.
    async fn prompt(
        &self,
        session_id: &str,
        text: &str,
        model: Option<&ModelRef>,
    ) -> Result<PromptResponse, AgentError>;
}

/// Runtime used when no agent backend has been wired up yet. Every call
/// fails with [`AgentError::Unavailable`], which the pipeline reports to the
/// sender as a backend error.
pub struct UnconfiguredRuntime;

#[async_trait]
impl AgentRuntime for UnconfiguredRuntime {
    async fn create_session(&self) -> Result<String, AgentError> {
        Err(AgentError::Unavailable(
            "no agent runtime configured".to_string(),
        ))
    }

    async fn prompt(
        &self,
        _session_id: &str,
        _text: &str,
        _model: Option<&ModelRef>,
    ) -> Result<PromptResponse, AgentError> {
        Err(AgentError::Unavailable(
            "no agent runtime configured".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_text_skips_ignored_and_non_text() {
        let response = PromptResponse {
            parts: vec![
                ResponsePart {
                    part_type: PartType::Reasoning,
                    text: "thinking".to_string(),
                    ignored: false,
                },
                ResponsePart {
                    part_type: PartType::Text,
                    text: "first".to_string(),
                    ignored: false,
                },
                ResponsePart {
                    part_type: PartType::Text,
                    text: "hidden".to_string(),
                    ignored: true,
                },
                ResponsePart {
                    part_type: PartType::Text,
                    text: "second".to_string(),
                    ignored: false,
                },
            ],
        };
        assert_eq!(response.reply_text(), "first\nsecond");
    }

    #[tokio::test]
    async fn test_model_override_and_reset() {
        let store = ModelStore::new();
        let default = ModelRef::new("anthropic", "claude-opus-4-5");
        assert_eq!(
            store
                .get(ChannelName::Slack, "C1", Some(&default))
                .await
                .unwrap(),
            default
        );

        let preset = model_preset("codex").unwrap();
        store
            .set(ChannelName::Slack, "C1", Some(preset.clone()))
            .await;
        assert_eq!(
            store
                .get(ChannelName::Slack, "C1", Some(&default))
                .await
                .unwrap(),
            preset
        );

        store.set(ChannelName::Slack, "C1", None).await;
        assert_eq!(
            store
                .get(ChannelName::Slack, "C1", Some(&default))
                .await
                .unwrap(),
            default
        );
    }

    #[test]
    fn test_event_session_id_accessor() {
        let event = AgentEvent::SessionIdle {
            session_id: "ses_1".to_string(),
        };
        assert_eq!(event.session_id(), "ses_1");
    }
}
