//! Slash commands handled inside the bridge, before the agent is involved.

use std::sync::Arc;

use crate::agent::{model_preset, ModelStore};
use crate::channels::{ChannelName, OutboundDispatcher, OutboundKind, SessionKey};
use crate::config::Config;
use crate::error::Result;
use crate::store::BridgeStore;

const HELP_TEXT: &str = "/opus - Claude Opus 4.5\n/codex - GPT 5.2 Codex\n/model - show current\n/reset - start fresh\n/help - this";

pub struct InboundCommandService {
    config: Arc<Config>,
    store: Arc<dyn BridgeStore>,
    models: Arc<ModelStore>,
    outbound: Arc<OutboundDispatcher>,
}

impl InboundCommandService {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn BridgeStore>,
        models: Arc<ModelStore>,
        outbound: Arc<OutboundDispatcher>,
    ) -> Self {
        Self {
            config,
            store,
            models,
            outbound,
        }
    }

    /// Handle a slash command. Returns `true` if the command was recognized;
    /// unknown commands fall through to the agent as ordinary text.
    pub async fn handle_command(
        &self,
        channel: ChannelName,
        session_key: &SessionKey,
        reply_peer_id: &str,
        text: &str,
    ) -> Result<bool> {
        let mut parts = text[1..].split_whitespace();
        let command = parts.next().unwrap_or("").to_lowercase();

        if let Some(preset) = model_preset(&command) {
            self.models
                .set(channel, session_key.as_str(), Some(preset.clone()))
                .await;
            self.send(
                channel,
                reply_peer_id,
                &format!("Model switched to {preset}"),
            )
            .await;
            tracing::info!(
                channel = %channel,
                session_key = session_key.as_str(),
                model = %preset,
                "model switched via command"
            );
            return Ok(true);
        }

        match command.as_str() {
            "model" => {
                let current = self
                    .models
                    .get(channel, session_key.as_str(), self.config.model.as_ref())
                    .await;
                let label = current
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "default".to_string());
                self.send(channel, reply_peer_id, &format!("Current model: {label}"))
                    .await;
                Ok(true)
            }
            "reset" => {
                self.models.set(channel, session_key.as_str(), None).await;
                self.store
                    .delete_session(channel, session_key.as_str())
                    .await?;
                self.send(
                    channel,
                    reply_peer_id,
                    "Session and model reset. Send a message to start fresh.",
                )
                .await;
                tracing::info!(
                    channel = %channel,
                    session_key = session_key.as_str(),
                    "session and model reset"
                );
                Ok(true)
            }
            "help" => {
                self.send(channel, reply_peer_id, HELP_TEXT).await;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn send(&self, channel: ChannelName, peer_id: &str, text: &str) {
        self.outbound
            .send_text(channel, peer_id, text, OutboundKind::System)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::channels::{
        Adapter, AdapterCapabilities, AdapterMap, SendOptions,
    };
    use crate::config::ConfigFile;
    use crate::error::ChannelError;
    use crate::store::MemoryStore;

    struct RecordingAdapter {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Adapter for RecordingAdapter {
        fn name(&self) -> ChannelName {
            ChannelName::Telegram
        }

        fn max_text_length(&self) -> usize {
            4096
        }

        fn capabilities(&self) -> AdapterCapabilities {
            AdapterCapabilities::default()
        }

        async fn start(&self) -> std::result::Result<(), ChannelError> {
            Ok(())
        }

        async fn stop(&self) -> std::result::Result<(), ChannelError> {
            Ok(())
        }

        async fn send_text(
            &self,
            _peer_id: &str,
            text: &str,
            _options: SendOptions,
        ) -> std::result::Result<(), ChannelError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Fixture {
        service: InboundCommandService,
        store: Arc<MemoryStore>,
        models: Arc<ModelStore>,
        adapter: Arc<RecordingAdapter>,
    }

    fn fixture() -> Fixture {
        let config = Arc::new(Config::from_parts(
            PathBuf::from("bridge.json"),
            ConfigFile::default(),
            |_| None,
        ));
        let adapter = Arc::new(RecordingAdapter {
            sent: Mutex::new(Vec::new()),
        });
        let mut map: AdapterMap = HashMap::new();
        map.insert(ChannelName::Telegram, adapter.clone() as Arc<dyn Adapter>);
        let store = Arc::new(MemoryStore::new());
        let models = Arc::new(ModelStore::new());
        let service = InboundCommandService::new(
            config,
            store.clone(),
            models.clone(),
            Arc::new(OutboundDispatcher::new(Arc::new(map))),
        );
        Fixture {
            service,
            store,
            models,
            adapter,
        }
    }

    #[tokio::test]
    async fn test_preset_command_sets_model_override() {
        let fx = fixture();
        let key = SessionKey("42".to_string());
        let handled = fx
            .service
            .handle_command(ChannelName::Telegram, &key, "42", "/opus")
            .await
            .unwrap();
        assert!(handled);

        let model = fx
            .models
            .get(ChannelName::Telegram, "42", None)
            .await
            .unwrap();
        assert_eq!(model.provider_id, "anthropic");
        let sent = fx.adapter.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![format!("Model switched to {model}")]);
    }

    #[tokio::test]
    async fn test_model_command_reports_default_without_override() {
        let fx = fixture();
        let key = SessionKey("42".to_string());
        fx.service
            .handle_command(ChannelName::Telegram, &key, "42", "/model")
            .await
            .unwrap();
        let sent = fx.adapter.sent.lock().unwrap().clone();
        assert_eq!(sent, vec!["Current model: default".to_string()]);
    }

    #[tokio::test]
    async fn test_reset_clears_model_and_binding() {
        let fx = fixture();
        let key = SessionKey("42".to_string());
        fx.models
            .set(
                ChannelName::Telegram,
                "42",
                Some(crate::agent::ModelRef::new("openai", "gpt-5.2-codex")),
            )
            .await;
        fx.store
            .bind_session(ChannelName::Telegram, "42", "session-0")
            .await
            .unwrap();

        let handled = fx
            .service
            .handle_command(ChannelName::Telegram, &key, "42", "/reset")
            .await
            .unwrap();
        assert!(handled);
        assert!(fx
            .models
            .get(ChannelName::Telegram, "42", None)
            .await
            .is_none());
        assert!(fx
            .store
            .get_session(ChannelName::Telegram, "42")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_unknown_command_falls_through() {
        let fx = fixture();
        let key = SessionKey("42".to_string());
        let handled = fx
            .service
            .handle_command(ChannelName::Telegram, &key, "42", "/dance")
            .await
            .unwrap();
        assert!(!handled);
        assert!(fx.adapter.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_help_lists_commands() {
        let fx = fixture();
        let key = SessionKey("42".to_string());
        fx.service
            .handle_command(ChannelName::Telegram, &key, "42", "/help")
            .await
            .unwrap();
        let sent = fx.adapter.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("/reset"));
    }
}
