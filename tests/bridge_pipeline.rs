//! End-to-end pipeline tests over the public [`Bridge`] surface, using mock
//! adapters and a scripted agent runtime.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use chatbridge::agent::{
    AgentEvent, AgentRuntime, MessageRole, ModelRef, PartSnapshot, PartType, PromptResponse,
    ResponsePart,
};
use chatbridge::bridge::DENIED_MESSAGE;
use chatbridge::channels::{
    Adapter, AdapterCapabilities, ChannelName, InboundMessage, OutboundKind, ProgressReceipt,
    SendOptions,
};
use chatbridge::cli::{run_pairing_command, PairingCommand};
use chatbridge::config::{ChannelSection, Config, ConfigFile};
use chatbridge::error::{AgentError, ChannelError};
use chatbridge::store::{BridgeStore, MemoryStore};
use chatbridge::Bridge;

struct MockAdapter {
    channel: ChannelName,
    capabilities: AdapterCapabilities,
    sent: Mutex<Vec<(String, String, OutboundKind)>>,
    progress_calls: Mutex<Vec<(Option<i64>, String)>>,
    next_id: AtomicI64,
}

impl MockAdapter {
    fn new(channel: ChannelName) -> Self {
        Self {
            channel,
            capabilities: AdapterCapabilities::default(),
            sent: Mutex::new(Vec::new()),
            progress_calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
        }
    }

    fn with_progress(channel: ChannelName) -> Self {
        Self {
            capabilities: AdapterCapabilities {
                progress: true,
                ..Default::default()
            },
            ..Self::new(channel)
        }
    }

    fn sent(&self) -> Vec<(String, String, OutboundKind)> {
        self.sent.lock().unwrap().clone()
    }

    fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .map(|(_, text, _)| text)
            .collect()
    }

    fn progress_calls(&self) -> Vec<(Option<i64>, String)> {
        self.progress_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Adapter for MockAdapter {
    fn name(&self) -> ChannelName {
        self.channel
    }

    fn max_text_length(&self) -> usize {
        4096
    }

    fn capabilities(&self) -> AdapterCapabilities {
        self.capabilities
    }

    async fn start(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn send_text(
        &self,
        peer_id: &str,
        text: &str,
        options: SendOptions,
    ) -> Result<(), ChannelError> {
        self.sent
            .lock()
            .unwrap()
            .push((peer_id.to_string(), text.to_string(), options.kind));
        Ok(())
    }

    async fn send_text_progress(
        &self,
        _peer_id: &str,
        text: &str,
        message_id: Option<i64>,
    ) -> Result<ProgressReceipt, ChannelError> {
        self.progress_calls
            .lock()
            .unwrap()
            .push((message_id, text.to_string()));
        let id = message_id.unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::SeqCst));
        Ok(ProgressReceipt { message_id: id })
    }
}

struct ScriptedRuntime {
    reply: String,
    sessions: AtomicUsize,
    prompts: AtomicUsize,
    /// When set, `prompt` blocks until the sender half is released.
    gate: Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
}

impl ScriptedRuntime {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            sessions: AtomicUsize::new(0),
            prompts: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }

    fn gated(reply: &str) -> (Self, tokio::sync::oneshot::Sender<()>) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let runtime = Self::new(reply);
        *runtime.gate.lock().unwrap() = Some(rx);
        (runtime, tx)
    }

    fn session_count(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentRuntime for ScriptedRuntime {
    async fn create_session(&self) -> Result<String, AgentError> {
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("ses_{n}"))
    }

    async fn prompt(
        &self,
        _session_id: &str,
        _text: &str,
        _model: Option<&ModelRef>,
    ) -> Result<PromptResponse, AgentError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(PromptResponse {
            parts: vec![ResponsePart::text(&self.reply)],
        })
    }
}

fn config_with(policies: &[(ChannelName, &str)]) -> Config {
    config_from_file(policies, |_| ())
}

fn config_from_file(
    policies: &[(ChannelName, &str)],
    tweak: impl FnOnce(&mut ConfigFile),
) -> Config {
    let mut file = ConfigFile::default();
    for (channel, policy) in policies {
        file.channels.insert(
            *channel,
            ChannelSection {
                access_policy: Some(policy.to_string()),
                ..Default::default()
            },
        );
    }
    tweak(&mut file);
    Config::from_parts(PathBuf::from("bridge.json"), file, |_| None)
}

#[tokio::test]
async fn test_open_channel_message_gets_reply() {
    let adapter = Arc::new(MockAdapter::new(ChannelName::Slack));
    let runtime = Arc::new(ScriptedRuntime::new("Hello!"));
    let store = Arc::new(MemoryStore::new());
    let bridge = Bridge::builder(config_with(&[]), runtime.clone())
        .store(store.clone())
        .adapter(adapter.clone())
        .build();

    bridge
        .dispatch_inbound(InboundMessage::new(ChannelName::Slack, "C1", "hi"))
        .await
        .unwrap();

    assert_eq!(
        adapter.sent(),
        vec![("C1".to_string(), "Hello!".to_string(), OutboundKind::Reply)]
    );
    assert_eq!(runtime.session_count(), 1);

    let record = store.get_session(ChannelName::Slack, "C1").await.unwrap();
    assert_eq!(record.unwrap().session_id, "ses_1");
}

#[tokio::test]
async fn test_repeat_messages_reuse_the_session() {
    let adapter = Arc::new(MockAdapter::new(ChannelName::Slack));
    let runtime = Arc::new(ScriptedRuntime::new("ok"));
    let bridge = Bridge::builder(config_with(&[]), runtime.clone())
        .adapter(adapter.clone())
        .build();

    for _ in 0..3 {
        bridge
            .dispatch_inbound(InboundMessage::new(ChannelName::Slack, "C1", "hi"))
            .await
            .unwrap();
    }

    assert_eq!(runtime.session_count(), 1);
    assert_eq!(runtime.prompt_count(), 3);
}

#[tokio::test]
async fn test_duplicate_delivery_runs_once() {
    let adapter = Arc::new(MockAdapter::new(ChannelName::Telegram));
    let runtime = Arc::new(ScriptedRuntime::new("once"));
    let bridge = Bridge::builder(config_with(&[]), runtime.clone())
        .adapter(adapter.clone())
        .build();

    let message = InboundMessage::new(ChannelName::Telegram, "10", "hi")
        .with_raw(json!({"message_id": 5, "chat": {"id": 10, "type": "private"}, "from": {"id": 10}}));
    bridge.dispatch_inbound(message.clone()).await.unwrap();
    bridge.dispatch_inbound(message).await.unwrap();

    assert_eq!(runtime.prompt_count(), 1);
    assert_eq!(adapter.sent_texts(), vec!["once".to_string()]);
}

#[tokio::test]
async fn test_denied_sender_gets_fixed_reply_and_no_session() {
    let adapter = Arc::new(MockAdapter::new(ChannelName::Slack));
    let runtime = Arc::new(ScriptedRuntime::new("never"));
    let store = Arc::new(MemoryStore::new());
    let bridge = Bridge::builder(
        config_with(&[(ChannelName::Slack, "allowlist")]),
        runtime.clone(),
    )
    .store(store.clone())
    .adapter(adapter.clone())
    .build();

    bridge
        .dispatch_inbound(InboundMessage::new(ChannelName::Slack, "C1", "hi"))
        .await
        .unwrap();

    assert_eq!(
        adapter.sent(),
        vec![(
            "C1".to_string(),
            DENIED_MESSAGE.to_string(),
            OutboundKind::System
        )]
    );
    assert_eq!(runtime.session_count(), 0);
    assert_eq!(
        store.get_session(ChannelName::Slack, "C1").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_config_allowlist_is_seeded_on_start() {
    let adapter = Arc::new(MockAdapter::new(ChannelName::Slack));
    let runtime = Arc::new(ScriptedRuntime::new("welcome"));
    let config = config_from_file(&[(ChannelName::Slack, "allowlist")], |file| {
        file.channels
            .get_mut(&ChannelName::Slack)
            .unwrap()
            .allow_from = vec!["C1".to_string()];
    });
    let bridge = Bridge::builder(config, runtime.clone())
        .adapter(adapter.clone())
        .build();
    bridge.start().await.unwrap();

    bridge
        .dispatch_inbound(InboundMessage::new(ChannelName::Slack, "C1", "hi"))
        .await
        .unwrap();

    assert_eq!(adapter.sent_texts(), vec!["welcome".to_string()]);
    bridge.shutdown().await;
}

#[tokio::test]
async fn test_pairing_approval_grants_access() {
    let adapter = Arc::new(MockAdapter::new(ChannelName::Telegram));
    let runtime = Arc::new(ScriptedRuntime::new("paired"));
    let store = Arc::new(MemoryStore::new());
    let bridge = Bridge::builder(
        config_with(&[(ChannelName::Telegram, "pairing")]),
        runtime.clone(),
    )
    .store(store.clone())
    .adapter(adapter.clone())
    .build();

    let raw = json!({"chat": {"type": "private", "id": 10}, "from": {"id": 777}});
    bridge
        .dispatch_inbound(
            InboundMessage::new(ChannelName::Telegram, "10", "hi")
                .with_raw(json!({"message_id": 1, "chat": raw["chat"].clone(), "from": raw["from"].clone()})),
        )
        .await
        .unwrap();

    let texts = adapter.sent_texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].starts_with("Pairing required. Ask the owner to approve code:"));
    assert_eq!(runtime.session_count(), 0);

    let request = store
        .get_pairing_request(ChannelName::Telegram, "777")
        .await
        .unwrap()
        .expect("pairing request recorded");
    assert!(texts[0].ends_with(&request.code));

    run_pairing_command(
        store.as_ref(),
        PairingCommand::Approve {
            code: request.code,
            channel: None,
        },
    )
    .await
    .unwrap();

    bridge
        .dispatch_inbound(
            InboundMessage::new(ChannelName::Telegram, "10", "hi again")
                .with_raw(json!({"message_id": 2, "chat": raw["chat"].clone(), "from": raw["from"].clone()})),
        )
        .await
        .unwrap();

    assert_eq!(adapter.sent_texts().last().unwrap().as_str(), "paired");
    assert_eq!(runtime.prompt_count(), 1);
}

#[tokio::test]
async fn test_slash_command_short_circuits_the_run() {
    let adapter = Arc::new(MockAdapter::new(ChannelName::Slack));
    let runtime = Arc::new(ScriptedRuntime::new("never"));
    let store = Arc::new(MemoryStore::new());
    let bridge = Bridge::builder(config_with(&[]), runtime.clone())
        .store(store.clone())
        .adapter(adapter.clone())
        .build();

    bridge
        .dispatch_inbound(InboundMessage::new(ChannelName::Slack, "C1", "/help"))
        .await
        .unwrap();

    let texts = adapter.sent_texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("/opus"));
    assert_eq!(runtime.prompt_count(), 0);
    assert_eq!(
        store.get_session(ChannelName::Slack, "C1").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn test_unknown_channel_is_ignored() {
    let adapter = Arc::new(MockAdapter::new(ChannelName::Slack));
    let runtime = Arc::new(ScriptedRuntime::new("never"));
    let bridge = Bridge::builder(config_with(&[]), runtime.clone())
        .adapter(adapter.clone())
        .build();

    bridge
        .dispatch_inbound(InboundMessage::new(ChannelName::Discord, "D1", "hi"))
        .await
        .unwrap();

    assert!(adapter.sent().is_empty());
    assert_eq!(runtime.prompt_count(), 0);
}

#[tokio::test]
async fn test_streamed_reply_edits_instead_of_resending() {
    let adapter = Arc::new(MockAdapter::with_progress(ChannelName::Telegram));
    let (runtime, release) = ScriptedRuntime::gated("Hello there");
    let runtime = Arc::new(runtime);
    let store = Arc::new(MemoryStore::new());
    let bridge = Arc::new(
        Bridge::builder(config_with(&[]), runtime.clone())
            .store(store.clone())
            .adapter(adapter.clone())
            .build(),
    );

    let dispatch = {
        let bridge = Arc::clone(&bridge);
        tokio::spawn(async move {
            bridge
                .dispatch_inbound(InboundMessage::new(ChannelName::Telegram, "10", "hi"))
                .await
                .unwrap();
        })
    };

    // Wait for the run to be registered, then inject streaming events the
    // way the agent's event feed would while the turn is still in flight.
    let session_id = loop {
        if let Some(record) = store.get_session(ChannelName::Telegram, "10").await.unwrap() {
            if bridge.registry().get(&record.session_id).is_some() {
                break record.session_id;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    };

    let events = vec![
        AgentEvent::MessageUpdated {
            session_id: session_id.clone(),
            message_id: "m1".to_string(),
            role: MessageRole::Assistant,
        },
        AgentEvent::MessagePartUpdated {
            part: PartSnapshot {
                session_id: session_id.clone(),
                message_id: "m1".to_string(),
                part_id: "p1".to_string(),
                part_type: PartType::Text,
                text: "Hello there".to_string(),
                ignored: false,
            },
            delta: None,
        },
        AgentEvent::SessionIdle {
            session_id: session_id.clone(),
        },
    ];
    bridge.run_events(tokio_stream::iter(events)).await;

    release.send(()).unwrap();
    dispatch.await.unwrap();

    let calls = adapter.progress_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], (None, "Hello there".to_string()));
    assert_eq!(calls[1].0, Some(100));
    assert_eq!(calls[1].1, "Hello there");
    // The streamed message is the reply; nothing is sent twice.
    assert!(adapter.sent().is_empty());
}
