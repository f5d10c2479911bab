//! Run execution: one agent turn per inbound message, with streamed-reply
//! aware delivery.

use std::sync::Arc;

use crate::agent::{AgentRuntime, ModelStore};
use crate::channels::{
    InboundMessage, OutboundDispatcher, OutboundKind, SessionKey, TypingManager,
};
use crate::config::Config;
use crate::error::{AgentError, Error, Result};
use crate::stream::StreamCoordinatorRegistry;

use super::registry::{RunState, SessionRunRegistry};

/// One unit of work for the run queue.
pub struct RunInput {
    pub message: InboundMessage,
    pub session_key: SessionKey,
    pub session_id: String,
}

pub struct RunExecutionService {
    config: Arc<Config>,
    models: Arc<ModelStore>,
    agent: Arc<dyn AgentRuntime>,
    registry: Arc<SessionRunRegistry>,
    coordinators: Arc<StreamCoordinatorRegistry>,
    typing: Arc<TypingManager>,
    outbound: Arc<OutboundDispatcher>,
}

impl RunExecutionService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<Config>,
        models: Arc<ModelStore>,
        agent: Arc<dyn AgentRuntime>,
        registry: Arc<SessionRunRegistry>,
        coordinators: Arc<StreamCoordinatorRegistry>,
        typing: Arc<TypingManager>,
        outbound: Arc<OutboundDispatcher>,
    ) -> Self {
        Self {
            config,
            models,
            agent,
            registry,
            coordinators,
            typing,
            outbound,
        }
    }

    /// Execute one turn. Never returns an error: failures become a system
    /// reply to the user and the run is always torn down.
    pub async fn execute(&self, input: RunInput) {
        let run = self.registry.begin(
            &input.session_id,
            input.message.channel,
            &input.message.peer_id,
        );
        self.typing
            .start(&input.session_id, input.message.channel, &input.message.peer_id)
            .await;

        if let Err(error) = self.run_turn(&input, &run).await {
            tracing::error!(
                session_id = %input.session_id,
                channel = %input.message.channel,
                %error,
                "prompt failed"
            );
            self.outbound
                .send_text(
                    input.message.channel,
                    &input.message.peer_id,
                    &error_reply(&error),
                    OutboundKind::System,
                )
                .await;
        }

        self.typing.stop(&input.session_id).await;
        self.coordinators
            .get(input.message.channel)
            .clear_session(&input.session_id)
            .await;
        self.registry.end(&input.session_id);
    }

    async fn run_turn(&self, input: &RunInput, run: &Arc<RunState>) -> Result<()> {
        let model = self
            .models
            .get(
                input.message.channel,
                input.session_key.as_str(),
                self.config.model.as_ref(),
            )
            .await;
        tracing::debug!(
            session_id = %input.session_id,
            length = input.message.text.len(),
            model = model.as_ref().map(|m| m.to_string()),
            "prompt start"
        );

        let response = self
            .agent
            .prompt(&input.session_id, &input.message.text, model.as_ref())
            .await?;

        let reply = response.reply_text();
        if reply.is_empty() {
            tracing::debug!(session_id = %input.session_id, "reply empty");
            self.outbound
                .send_text(
                    input.message.channel,
                    &input.message.peer_id,
                    "No response generated. Try again.",
                    OutboundKind::System,
                )
                .await;
            return Ok(());
        }

        self.deliver_reply(run, &input.message.peer_id, &reply).await;
        Ok(())
    }

    /// Deliver the final reply exactly once.
    ///
    /// If a streamed draft exists, it is edited into the final text. When
    /// that edit fails but a streamed message is on the wire, the fallback
    /// send is skipped so the user never sees the reply twice.
    async fn deliver_reply(&self, run: &Arc<RunState>, peer_id: &str, reply: &str) {
        let coordinator = self.coordinators.get(run.channel);
        let streamed_before = coordinator.has_streamed_message(&run.session_id).await;
        let finalized = coordinator
            .finalize_reply(&run.session_id, peer_id, reply)
            .await;

        if finalized {
            tracing::debug!(
                session_id = %run.session_id,
                reply_length = reply.len(),
                "reply finalized by stream coordinator"
            );
            return;
        }

        let streamed_after = coordinator.has_streamed_message(&run.session_id).await;
        if streamed_before || streamed_after {
            tracing::warn!(
                session_id = %run.session_id,
                reply_length = reply.len(),
                "stream finalization failed with a streamed message on the wire, skipping fallback send"
            );
            return;
        }

        run.suppress_streaming();
        tracing::debug!(
            session_id = %run.session_id,
            reply_length = reply.len(),
            "stream finalization unavailable, fallback to regular send"
        );
        self.outbound
            .send_text(run.channel, peer_id, reply, OutboundKind::Reply)
            .await;
    }
}

fn error_reply(error: &Error) -> String {
    match error {
        Error::Agent(AgentError::Unavailable(_)) => {
            "Error: failed to reach the agent backend.".to_string()
        }
        Error::Agent(AgentError::SessionCreate(_)) => {
            "Error: could not start a session. Send /reset and try again.".to_string()
        }
        _ => "Error: the agent failed to process your message. Try again.".to_string(),
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
    use crate::agent::{MessageRole, ModelRef, PartSnapshot, PromptResponse, ResponsePart};
    use crate::channels::{
        Adapter, AdapterCapabilities, AdapterMap, ChannelName, SendOptions,
    };
    use crate::config::ConfigFile;
    use crate::error::ChannelError;
    use crate::stream::StreamCoordinator;

    struct RecordingAdapter {
        sent: Mutex<Vec<(String, OutboundKind)>>,
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
            options: SendOptions,
        ) -> std::result::Result<(), ChannelError> {
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), options.kind));
            Ok(())
        }
    }

    struct ScriptedRuntime {
        response: std::result::Result<PromptResponse, String>,
    }

    #[async_trait]
    impl AgentRuntime for ScriptedRuntime {
        async fn create_session(&self) -> std::result::Result<String, AgentError> {
            Ok("session-0".to_string())
        }

        async fn prompt(
            &self,
            _session_id: &str,
            _text: &str,
            _model: Option<&ModelRef>,
        ) -> std::result::Result<PromptResponse, AgentError> {
            self.response
                .clone()
                .map_err(AgentError::Prompt)
        }
    }

    /// Coordinator whose finalize outcome and streamed-message flag are
    /// fixed up front.
    struct ScriptedCoordinator {
        finalize_result: bool,
        streamed: bool,
    }

    #[async_trait]
    impl StreamCoordinator for ScriptedCoordinator {
        async fn on_message_updated(&self, _: &str, _: &str, _: MessageRole) {}
        async fn on_message_part_updated(&self, _: &PartSnapshot, _: Option<&str>) {}
        async fn on_message_part_delta(&self, _: &str, _: &str, _: &str, _: &str) {}
        async fn on_session_idle(&self, _: &str) {}

        async fn finalize_reply(&self, _: &str, _: &str, _: &str) -> bool {
            self.finalize_result
        }

        async fn has_streamed_message(&self, _: &str) -> bool {
            self.streamed
        }

        async fn clear_session(&self, _: &str) {}
    }

    struct Fixture {
        service: RunExecutionService,
        registry: Arc<SessionRunRegistry>,
        adapter: Arc<RecordingAdapter>,
    }

    fn fixture(
        response: std::result::Result<PromptResponse, String>,
        coordinator: Option<ScriptedCoordinator>,
    ) -> Fixture {
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
        let adapters = Arc::new(map);

        let mut coordinators = StreamCoordinatorRegistry::new();
        if let Some(c) = coordinator {
            coordinators.register(ChannelName::Telegram, Arc::new(c));
        }

        let registry = Arc::new(SessionRunRegistry::new());
        let service = RunExecutionService::new(
            config,
            Arc::new(ModelStore::new()),
            Arc::new(ScriptedRuntime { response }),
            registry.clone(),
            Arc::new(coordinators),
            Arc::new(TypingManager::new(adapters.clone())),
            Arc::new(OutboundDispatcher::new(adapters)),
        );
        Fixture {
            service,
            registry,
            adapter,
        }
    }

    fn text_response(text: &str) -> PromptResponse {
        PromptResponse {
            parts: vec![ResponsePart::text(text)],
        }
    }

    fn input() -> RunInput {
        RunInput {
            message: InboundMessage::new(ChannelName::Telegram, "42", "hi"),
            session_key: SessionKey("42".to_string()),
            session_id: "session-0".to_string(),
        }
    }

    #[tokio::test]
    async fn test_plain_reply_sent_when_no_coordinator() {
        let fx = fixture(Ok(text_response("hello there")), None);
        fx.service.execute(input()).await;

        let sent = fx.adapter.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![("hello there".to_string(), OutboundKind::Reply)]
        );
        assert_eq!(fx.registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_reply_sends_notice() {
        let fx = fixture(Ok(PromptResponse::default()), None);
        fx.service.execute(input()).await;

        let sent = fx.adapter.sent.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![(
                "No response generated. Try again.".to_string(),
                OutboundKind::System
            )]
        );
    }

    #[tokio::test]
    async fn test_finalized_reply_skips_plain_send() {
        let fx = fixture(
            Ok(text_response("streamed final")),
            Some(ScriptedCoordinator {
                finalize_result: true,
                streamed: true,
            }),
        );
        fx.service.execute(input()).await;
        assert!(fx.adapter.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_finalize_with_streamed_message_skips_fallback() {
        let fx = fixture(
            Ok(text_response("partial draft on the wire")),
            Some(ScriptedCoordinator {
                finalize_result: false,
                streamed: true,
            }),
        );
        fx.service.execute(input()).await;
        // No duplicate: fallback is suppressed because a draft already exists.
        assert!(fx.adapter.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_finalize_without_stream_falls_back() {
        let fx = fixture(
            Ok(text_response("fresh reply")),
            Some(ScriptedCoordinator {
                finalize_result: false,
                streamed: false,
            }),
        );
        fx.service.execute(input()).await;
        let sent = fx.adapter.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![("fresh reply".to_string(), OutboundKind::Reply)]);
    }

    #[tokio::test]
    async fn test_prompt_error_becomes_system_reply() {
        let fx = fixture(Err("boom".to_string()), None);
        fx.service.execute(input()).await;

        let sent = fx.adapter.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, OutboundKind::System);
        assert!(sent[0].0.starts_with("Error:"));
        assert_eq!(fx.registry.active_count(), 0);
    }

    #[tokio::test]
    async fn test_ignored_text_parts_excluded_from_reply() {
        let response = PromptResponse {
            parts: vec![
                ResponsePart::text("keep"),
                ResponsePart {
                    ignored: true,
                    ..ResponsePart::text("drop")
                },
            ],
        };
        let fx = fixture(Ok(response), None);
        fx.service.execute(input()).await;

        let sent = fx.adapter.sent.lock().unwrap().clone();
        assert_eq!(sent, vec![("keep".to_string(), OutboundKind::Reply)]);
    }
}
