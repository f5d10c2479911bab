//! Sender identity extraction for inbound messages.
//!
//! Two distinct identities flow through the pipeline and must never be
//! conflated:
//!
//! - the **session key** identifies the conversation and selects the agent
//!   session binding,
//! - the **access key** identifies the human sender and is what access
//!   control evaluates.
//!
//! In a shared thread the two differ: using the session key for access
//! decisions would let any participant impersonate an already-approved
//! sender. The newtypes below keep the boundary explicit at the type level;
//! extraction walks each channel's raw payload for the sender field and
//! falls back to the session key when the payload does not carry one.

use serde_json::Value;

use crate::channels::adapter::{ChannelName, InboundMessage};

/// Conversation identity, used for session binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey(pub String);

impl SessionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Sender identity, used for allow/deny decisions and pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccessKey(pub String);

impl AccessKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The pair of identities resolved for one inbound message.
#[derive(Debug, Clone)]
pub struct AccessIdentity {
    pub session_key: SessionKey,
    pub access_key: AccessKey,
}

/// Resolve both identities for an inbound message.
pub fn resolve_access_identity(message: &InboundMessage) -> AccessIdentity {
    let session_key = resolve_session_key(message);

    let access_key = match message.channel {
        ChannelName::Telegram => telegram_access_key(message, &session_key),
        ChannelName::Slack => slack_access_key(message, &session_key),
        ChannelName::Discord => discord_access_key(message, &session_key),
        ChannelName::Feishu => feishu_access_key(message, &session_key),
        ChannelName::DingTalk => dingtalk_access_key(message, &session_key),
        ChannelName::Qq => qq_access_key(message, &session_key),
        _ => session_key.clone(),
    };

    AccessIdentity {
        session_key: SessionKey(session_key),
        access_key: AccessKey(access_key),
    }
}

fn resolve_session_key(message: &InboundMessage) -> String {
    if message.channel == ChannelName::WhatsApp {
        normalize_whatsapp_id(&message.peer_id)
    } else {
        message.peer_id.clone()
    }
}

/// Canonicalize a WhatsApp JID so allowlist entries written as phone numbers
/// match inbound ids. Group ids (`@g.us`) pass through untouched.
pub fn normalize_whatsapp_id(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.ends_with("@g.us") {
        return trimmed.to_string();
    }
    let base = trimmed
        .strip_suffix("@s.whatsapp.net")
        .unwrap_or(trimmed)
        .to_string();
    if base.starts_with('+') {
        return base;
    }
    if !base.is_empty() && base.chars().all(|c| c.is_ascii_digit()) {
        return format!("+{base}");
    }
    base
}

/// Pull a string out of a JSON field that providers encode as either a
/// string or a number.
fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn telegram_access_key(message: &InboundMessage, session_key: &str) -> String {
    // Only private chats carry a sender id worth distinguishing; group
    // access stays keyed by the chat itself.
    let Some(raw) = message.raw.as_ref() else {
        return session_key.to_string();
    };
    let chat_type = id_string(raw.pointer("/chat/type"));
    if chat_type.as_deref() != Some("private") {
        return session_key.to_string();
    }
    id_string(raw.pointer("/from/id")).unwrap_or_else(|| session_key.to_string())
}

fn slack_access_key(message: &InboundMessage, session_key: &str) -> String {
    message
        .raw
        .as_ref()
        .and_then(|raw| id_string(raw.get("user")))
        .unwrap_or_else(|| session_key.to_string())
}

fn discord_access_key(message: &InboundMessage, session_key: &str) -> String {
    message
        .raw
        .as_ref()
        .and_then(|raw| id_string(raw.get("authorId")))
        .unwrap_or_else(|| session_key.to_string())
}

fn feishu_access_key(message: &InboundMessage, session_key: &str) -> String {
    let Some(raw) = message.raw.as_ref() else {
        return session_key.to_string();
    };
    id_string(raw.pointer("/event/sender/sender_id/open_id"))
        .or_else(|| id_string(raw.pointer("/event/sender/sender_id/user_id")))
        .or_else(|| id_string(raw.pointer("/event/message/chat_id")))
        .unwrap_or_else(|| session_key.to_string())
}

fn dingtalk_access_key(message: &InboundMessage, session_key: &str) -> String {
    let Some(raw) = message.raw.as_ref() else {
        return session_key.to_string();
    };
    id_string(raw.get("senderStaffId"))
        .or_else(|| id_string(raw.get("senderId")))
        .or_else(|| id_string(raw.get("conversationId")))
        .unwrap_or_else(|| session_key.to_string())
}

fn qq_access_key(message: &InboundMessage, session_key: &str) -> String {
    message
        .raw
        .as_ref()
        .and_then(|raw| id_string(raw.get("user_id")))
        .unwrap_or_else(|| session_key.to_string())
}
