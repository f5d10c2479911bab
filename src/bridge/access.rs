//! Per-channel access control and the pairing workflow.
//!
//! Evaluates the channel's configured policy against the sender's access
//! key. A denial is a terminal pipeline outcome with a fixed user-visible
//! reply, not an error. The service's only side effects are one system
//! reply and, for pairing, one store write; it never touches session
//! binding or run execution.

use std::sync::Arc;

use rand::Rng;

use crate::channels::{
    AccessKey, ChannelName, InboundMessage, OutboundDispatcher, OutboundKind,
};
use crate::config::{AccessPolicy, Config};
use crate::error::Result;
use crate::store::BridgeStore;

pub const DENIED_MESSAGE: &str = "Access denied.";
pub const DENIED_WHATSAPP_MESSAGE: &str =
    "Access denied. Ask the owner to allowlist your number.";
pub const PAIRING_QUEUE_FULL_MESSAGE: &str =
    "Pairing queue full. Ask the owner to approve pending requests.";

/// How long a pairing code stays approvable.
pub const PAIRING_TTL_SECS: i64 = 60 * 60;
/// Maximum pending pairing requests per channel.
pub const PAIRING_QUEUE_LIMIT: usize = 3;

/// Channels whose wire protocol can deliver a pairing code out-of-band.
/// The webhook-only channels cannot, and degrade `pairing` to allowlist
/// semantics.
fn pairing_supported(channel: ChannelName) -> bool {
    matches!(
        channel,
        ChannelName::WhatsApp
            | ChannelName::Telegram
            | ChannelName::Slack
            | ChannelName::Discord
            | ChannelName::Email
            | ChannelName::Qq
    )
}

pub struct AccessControlService {
    config: Arc<Config>,
    store: Arc<dyn BridgeStore>,
    outbound: Arc<OutboundDispatcher>,
}

impl AccessControlService {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn BridgeStore>,
        outbound: Arc<OutboundDispatcher>,
    ) -> Self {
        Self {
            config,
            store,
            outbound,
        }
    }

    /// Decide whether this inbound message may reach the agent.
    ///
    /// Returns `false` for every denial; the reply (denial text or pairing
    /// code) has already been sent by the time this returns.
    pub async fn allow_inbound(
        &self,
        message: &InboundMessage,
        access_key: &AccessKey,
    ) -> Result<bool> {
        let policy = self.config.policy_for(message.channel);

        let is_self = message.channel == ChannelName::WhatsApp
            && message.from_me
            && self.config.whatsapp_self_chat_mode;
        let allow_all = message.channel == ChannelName::WhatsApp
            && self.config.whatsapp_allow_from.contains("*");
        let allowed = allow_all
            || is_self
            || self
                .store
                .is_allowed(message.channel, access_key.as_str())
                .await?;

        tracing::debug!(
            channel = %message.channel,
            ?policy,
            access_key = access_key.as_str(),
            allow_all,
            is_self,
            allowed,
            "channel access control check"
        );

        match policy {
            AccessPolicy::Open => Ok(true),
            AccessPolicy::Disabled => {
                self.send_denied(message, AccessPolicy::Disabled).await;
                Ok(false)
            }
            _ if allowed => Ok(true),
            AccessPolicy::Allowlist => {
                self.send_denied(message, AccessPolicy::Allowlist).await;
                Ok(false)
            }
            AccessPolicy::Pairing if !pairing_supported(message.channel) => {
                tracing::warn!(
                    channel = %message.channel,
                    "pairing is not supported for this channel, fallback to allowlist"
                );
                self.send_denied(message, AccessPolicy::Allowlist).await;
                Ok(false)
            }
            AccessPolicy::Pairing => {
                self.handle_pairing(message, access_key).await?;
                Ok(false)
            }
        }
    }

    async fn handle_pairing(
        &self,
        message: &InboundMessage,
        access_key: &AccessKey,
    ) -> Result<()> {
        self.store.prune_pairing_requests().await?;
        let active = self
            .store
            .get_pairing_request(message.channel, access_key.as_str())
            .await?;
        let pending = self.store.list_pairing_requests(message.channel).await?;

        if active.is_none() && pending.len() >= PAIRING_QUEUE_LIMIT {
            self.outbound
                .send_text(
                    message.channel,
                    &message.peer_id,
                    PAIRING_QUEUE_FULL_MESSAGE,
                    OutboundKind::System,
                )
                .await;
            return Ok(());
        }

        // An unexpired request keeps its original code; re-contact must not
        // mint duplicates.
        let code = match active {
            Some(request) => request.code,
            None => {
                let code = generate_pairing_code();
                self.store
                    .create_pairing_request(
                        message.channel,
                        access_key.as_str(),
                        &code,
                        chrono::Duration::seconds(PAIRING_TTL_SECS),
                    )
                    .await?;
                code
            }
        };

        self.outbound
            .send_text(
                message.channel,
                &message.peer_id,
                &format!("Pairing required. Ask the owner to approve code: {code}"),
                OutboundKind::System,
            )
            .await;
        Ok(())
    }

    async fn send_denied(&self, message: &InboundMessage, policy: AccessPolicy) {
        let text = if message.channel == ChannelName::WhatsApp && policy == AccessPolicy::Allowlist
        {
            DENIED_WHATSAPP_MESSAGE
        } else {
            DENIED_MESSAGE
        };
        self.outbound
            .send_text(
                message.channel,
                &message.peer_id,
                text,
                OutboundKind::System,
            )
            .await;
    }
}

fn generate_pairing_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
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
    use crate::config::{ChannelSection, ConfigFile};
    use crate::error::ChannelError;
    use crate::store::MemoryStore;

    pub(crate) struct RecordingAdapter {
        channel: ChannelName,
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingAdapter {
        pub(crate) fn new(channel: ChannelName) -> Self {
            Self {
                channel,
                sent: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, text)| text.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Adapter for RecordingAdapter {
        fn name(&self) -> ChannelName {
            self.channel
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
            peer_id: &str,
            text: &str,
            _options: SendOptions,
        ) -> std::result::Result<(), ChannelError> {
            self.sent
                .lock()
                .unwrap()
                .push((peer_id.to_string(), text.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        service: AccessControlService,
        store: Arc<MemoryStore>,
        adapter: Arc<RecordingAdapter>,
    }

    fn fixture(channel: ChannelName, policy: &str) -> Fixture {
        let mut file = ConfigFile::default();
        file.channels.insert(
            channel,
            ChannelSection {
                access_policy: Some(policy.to_string()),
                ..Default::default()
            },
        );
        let config = Arc::new(Config::from_parts(
            PathBuf::from("bridge.json"),
            file,
            |_| None,
        ));

        let adapter = Arc::new(RecordingAdapter::new(channel));
        let mut map: AdapterMap = HashMap::new();
        map.insert(channel, adapter.clone() as Arc<dyn Adapter>);
        let outbound = Arc::new(OutboundDispatcher::new(Arc::new(map)));
        let store = Arc::new(MemoryStore::new());

        Fixture {
            service: AccessControlService::new(config, store.clone(), outbound),
            store,
            adapter,
        }
    }

    fn discord_message(channel_id: &str, author_id: &str) -> InboundMessage {
        InboundMessage::new(ChannelName::Discord, channel_id, "hello")
            .with_raw(serde_json::json!({"authorId": author_id}))
    }

    #[tokio::test]
    async fn test_open_policy_allows_without_store() {
        let fx = fixture(ChannelName::Telegram, "open");
        let msg = InboundMessage::new(ChannelName::Telegram, "12345", "hi");
        let allowed = fx
            .service
            .allow_inbound(&msg, &AccessKey("12345".to_string()))
            .await
            .unwrap();
        assert!(allowed);
        assert!(fx.adapter.texts().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_policy_denies_even_allowlisted() {
        let fx = fixture(ChannelName::Slack, "disabled");
        fx.store.allow(ChannelName::Slack, "U1").await.unwrap();
        let msg = InboundMessage::new(ChannelName::Slack, "C1", "hi");
        let allowed = fx
            .service
            .allow_inbound(&msg, &AccessKey("U1".to_string()))
            .await
            .unwrap();
        assert!(!allowed);
        assert_eq!(fx.adapter.texts(), vec![DENIED_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_allowlist_denies_unapproved_key() {
        let fx = fixture(ChannelName::Slack, "allowlist");
        let msg = InboundMessage::new(ChannelName::Slack, "C1", "hi");
        let allowed = fx
            .service
            .allow_inbound(&msg, &AccessKey("U-unknown".to_string()))
            .await
            .unwrap();
        assert!(!allowed);
        assert_eq!(fx.adapter.texts(), vec![DENIED_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_allowlist_allows_approved_key() {
        let fx = fixture(ChannelName::Slack, "allowlist");
        fx.store.allow(ChannelName::Slack, "U1").await.unwrap();
        let msg = InboundMessage::new(ChannelName::Slack, "C1", "hi");
        let allowed = fx
            .service
            .allow_inbound(&msg, &AccessKey("U1".to_string()))
            .await
            .unwrap();
        assert!(allowed);
    }

    #[tokio::test]
    async fn test_pairing_creates_request_under_access_key() {
        let fx = fixture(ChannelName::Discord, "pairing");
        let msg = discord_message("channel-1", "author-7");
        let allowed = fx
            .service
            .allow_inbound(&msg, &AccessKey("author-7".to_string()))
            .await
            .unwrap();
        assert!(!allowed);

        // The request is keyed by the sender's id, not the channel id.
        let request = fx
            .store
            .get_pairing_request(ChannelName::Discord, "author-7")
            .await
            .unwrap()
            .expect("pairing request created");
        assert!(fx
            .store
            .get_pairing_request(ChannelName::Discord, "channel-1")
            .await
            .unwrap()
            .is_none());

        let texts = fx.adapter.texts();
        assert_eq!(texts.len(), 1);
        assert_eq!(
            texts[0],
            format!(
                "Pairing required. Ask the owner to approve code: {}",
                request.code
            )
        );
        assert_eq!(request.code.len(), 6);
    }

    #[tokio::test]
    async fn test_pairing_recontact_reuses_code() {
        let fx = fixture(ChannelName::Telegram, "pairing");
        let msg = InboundMessage::new(ChannelName::Telegram, "42", "hi");
        let key = AccessKey("42".to_string());

        fx.service.allow_inbound(&msg, &key).await.unwrap();
        let first = fx
            .store
            .get_pairing_request(ChannelName::Telegram, "42")
            .await
            .unwrap()
            .unwrap();

        fx.service.allow_inbound(&msg, &key).await.unwrap();
        let second = fx
            .store
            .get_pairing_request(ChannelName::Telegram, "42")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.code, second.code);

        let texts = fx.adapter.texts();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[0], texts[1]);
    }

    #[tokio::test]
    async fn test_pairing_queue_full() {
        let fx = fixture(ChannelName::Telegram, "pairing");
        for key in ["a", "b", "c"] {
            fx.store
                .create_pairing_request(
                    ChannelName::Telegram,
                    key,
                    "111111",
                    chrono::Duration::hours(1),
                )
                .await
                .unwrap();
        }

        let msg = InboundMessage::new(ChannelName::Telegram, "99", "hi");
        let allowed = fx
            .service
            .allow_inbound(&msg, &AccessKey("99".to_string()))
            .await
            .unwrap();
        assert!(!allowed);
        assert_eq!(
            fx.adapter.texts(),
            vec![PAIRING_QUEUE_FULL_MESSAGE.to_string()]
        );
        assert!(fx
            .store
            .get_pairing_request(ChannelName::Telegram, "99")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_pairing_unsupported_channel_degrades_to_allowlist() {
        let fx = fixture(ChannelName::Feishu, "pairing");
        let msg = InboundMessage::new(ChannelName::Feishu, "oc_1", "hi");
        let allowed = fx
            .service
            .allow_inbound(&msg, &AccessKey("u_1".to_string()))
            .await
            .unwrap();
        assert!(!allowed);
        assert_eq!(fx.adapter.texts(), vec![DENIED_MESSAGE.to_string()]);
        assert!(fx
            .store
            .get_pairing_request(ChannelName::Feishu, "u_1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_whatsapp_allowlist_denial_text() {
        let fx = fixture(ChannelName::WhatsApp, "allowlist");
        let msg = InboundMessage::new(ChannelName::WhatsApp, "+4917", "hi");
        fx.service
            .allow_inbound(&msg, &AccessKey("+4917".to_string()))
            .await
            .unwrap();
        assert_eq!(
            fx.adapter.texts(),
            vec![DENIED_WHATSAPP_MESSAGE.to_string()]
        );
    }

    #[tokio::test]
    async fn test_whatsapp_wildcard_allows_everyone() {
        let mut file = ConfigFile::default();
        file.channels.insert(
            ChannelName::WhatsApp,
            ChannelSection {
                access_policy: Some("allowlist".to_string()),
                allow_from: vec!["*".to_string()],
                ..Default::default()
            },
        );
        let config = Arc::new(Config::from_parts(
            PathBuf::from("bridge.json"),
            file,
            |_| None,
        ));
        let adapter = Arc::new(RecordingAdapter::new(ChannelName::WhatsApp));
        let mut map: AdapterMap = HashMap::new();
        map.insert(ChannelName::WhatsApp, adapter.clone() as Arc<dyn Adapter>);
        let outbound = Arc::new(OutboundDispatcher::new(Arc::new(map)));
        let service =
            AccessControlService::new(config, Arc::new(MemoryStore::new()), outbound);

        let msg = InboundMessage::new(ChannelName::WhatsApp, "+555", "hi");
        let allowed = service
            .allow_inbound(&msg, &AccessKey("+555".to_string()))
            .await
            .unwrap();
        assert!(allowed);
        assert!(adapter.texts().is_empty());
    }

    #[tokio::test]
    async fn test_whatsapp_self_chat_mode_allows_own_messages() {
        let mut file = ConfigFile::default();
        file.channels.insert(
            ChannelName::WhatsApp,
            ChannelSection {
                access_policy: Some("pairing".to_string()),
                self_chat_mode: Some(true),
                ..Default::default()
            },
        );
        let config = Arc::new(Config::from_parts(
            PathBuf::from("bridge.json"),
            file,
            |_| None,
        ));
        let adapter = Arc::new(RecordingAdapter::new(ChannelName::WhatsApp));
        let mut map: AdapterMap = HashMap::new();
        map.insert(ChannelName::WhatsApp, adapter.clone() as Arc<dyn Adapter>);
        let outbound = Arc::new(OutboundDispatcher::new(Arc::new(map)));
        let service =
            AccessControlService::new(config, Arc::new(MemoryStore::new()), outbound);

        let mut msg = InboundMessage::new(ChannelName::WhatsApp, "+555", "note to self");
        msg.from_me = true;
        let allowed = service
            .allow_inbound(&msg, &AccessKey("+555".to_string()))
            .await
            .unwrap();
        assert!(allowed);
    }
}
