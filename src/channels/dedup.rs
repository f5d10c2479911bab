//! Duplicate-delivery suppression.
//!
//! Several channels deliver at-least-once: long-poll reconnects replay
//! updates, webhook providers retry on slow acks, and watch loops can hand
//! the same event to two iterations. The fix is the same everywhere: a
//! bounded, time-windowed set of recently seen identifiers. [`DedupWindow`]
//! is that mechanism; [`InboundDeduper`] applies it at the pipeline entrance
//! using a stable delivery key derived from the provider payload.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::channels::adapter::{ChannelName, InboundMessage};

const DEFAULT_TTL: Duration = Duration::from_secs(120);
const DEFAULT_MAX_ENTRIES: usize = 2048;

/// A bounded, time-limited set of recently seen identifiers.
///
/// Not a correctness-critical log: entries expire after the TTL and the map
/// is capped, so a duplicate arriving outside the window will pass through.
pub struct DedupWindow {
    seen: Mutex<SeenMap>,
    ttl: Duration,
    max_entries: usize,
}

struct SeenMap {
    entries: HashMap<String, Instant>,
    /// Insertion order, for oldest-first eviction once the cap is hit.
    order: Vec<String>,
}

impl DedupWindow {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            seen: Mutex::new(SeenMap {
                entries: HashMap::new(),
                order: Vec::new(),
            }),
            ttl,
            max_entries,
        }
    }

    /// Record `key` and report whether it was already seen within the window.
    pub fn check_and_insert(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(seen_at) = seen.entries.get(key) {
            if now.duration_since(*seen_at) <= self.ttl {
                return true;
            }
        }

        if seen.entries.insert(key.to_string(), now).is_none() {
            seen.order.push(key.to_string());
        }
        Self::prune(&mut seen, now, self.ttl, self.max_entries);
        false
    }

    pub fn clear(&self) {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.entries.clear();
        seen.order.clear();
    }

    fn prune(seen: &mut SeenMap, now: Instant, ttl: Duration, max_entries: usize) {
        if seen.entries.len() <= max_entries {
            return;
        }

        let SeenMap { entries, order } = seen;
        order.retain(|key| match entries.get(key) {
            Some(at) if now.duration_since(*at) > ttl => {
                entries.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        });

        while entries.len() > max_entries && !order.is_empty() {
            let oldest = order.remove(0);
            entries.remove(&oldest);
        }
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

/// Pipeline-level deduplication of inbound deliveries.
///
/// Only channels whose payload carries a provider message id participate;
/// everything else passes through untouched.
pub struct InboundDeduper {
    window: DedupWindow,
}

impl InboundDeduper {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            window: DedupWindow::new(ttl, max_entries),
        }
    }

    /// Returns `true` if this delivery was already seen and must be dropped.
    pub fn is_duplicate(&self, message: &InboundMessage) -> bool {
        let Some(key) = delivery_key(message) else {
            return false;
        };
        self.window.check_and_insert(&key)
    }

    pub fn clear(&self) {
        self.window.clear();
    }
}

impl Default for InboundDeduper {
    fn default() -> Self {
        Self {
            window: DedupWindow::default(),
        }
    }
}

/// Stable delivery key for channels with at-least-once semantics.
///
/// Telegram-style payloads carry a numeric `message_id` plus a `chat.id`;
/// the pair is unique per delivery and stable across redeliveries.
fn delivery_key(message: &InboundMessage) -> Option<String> {
    if message.channel != ChannelName::Telegram {
        return None;
    }
    let raw = message.raw.as_ref()?;
    let message_id = raw.get("message_id")?.as_i64()?;
    let chat_id = match raw.pointer("/chat/id") {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        _ => message.peer_id.clone(),
    };
    Some(format!("{chat_id}:{message_id}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn telegram_message(chat_id: i64, message_id: i64) -> InboundMessage {
        InboundMessage::new(ChannelName::Telegram, chat_id.to_string(), "hi").with_raw(json!({
            "message_id": message_id,
            "chat": {"id": chat_id},
        }))
    }

    #[test]
    fn test_duplicate_within_window() {
        let deduper = InboundDeduper::default();
        let msg = telegram_message(10, 1);
        assert!(!deduper.is_duplicate(&msg));
        assert!(deduper.is_duplicate(&msg));
    }

    #[test]
    fn test_distinct_message_ids_pass() {
        let deduper = InboundDeduper::default();
        assert!(!deduper.is_duplicate(&telegram_message(10, 1)));
        assert!(!deduper.is_duplicate(&telegram_message(10, 2)));
        assert!(!deduper.is_duplicate(&telegram_message(11, 1)));
    }

    #[test]
    fn test_channel_without_delivery_key_passes() {
        let deduper = InboundDeduper::default();
        let msg = InboundMessage::new(ChannelName::Slack, "C1", "hi");
        assert!(!deduper.is_duplicate(&msg));
        assert!(!deduper.is_duplicate(&msg));
    }

    #[test]
    fn test_payload_without_message_id_passes() {
        let deduper = InboundDeduper::default();
        let msg = InboundMessage::new(ChannelName::Telegram, "10", "hi")
            .with_raw(json!({"chat": {"id": 10}}));
        assert!(!deduper.is_duplicate(&msg));
        assert!(!deduper.is_duplicate(&msg));
    }

    #[test]
    fn test_expired_entry_treated_as_new() {
        let deduper = InboundDeduper::new(Duration::from_millis(0), 16);
        let msg = telegram_message(10, 1);
        assert!(!deduper.is_duplicate(&msg));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!deduper.is_duplicate(&msg));
    }

    #[test]
    fn test_window_eviction_caps_entries() {
        let window = DedupWindow::new(Duration::from_secs(60), 4);
        for i in 0..10 {
            assert!(!window.check_and_insert(&format!("k{i}")));
        }
        // The oldest keys were evicted, so they read as unseen again.
        assert!(!window.check_and_insert("k0"));
        // Recent keys are still tracked.
        assert!(window.check_and_insert("k9"));
    }
}
