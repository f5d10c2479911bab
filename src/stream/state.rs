//! Render state for one streamed session.
//!
//! Tracks the draft text assembled from part snapshots and deltas, which
//! parts belong to which message, and the deltas buffered while a
//! message's role is still unknown. Role and part-type gating happens
//! here; the flush engine only ever sees the joined draft text.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::agent::{MessageRole, PartType};

use super::flush::TimerHandle;

/// Last known metadata for a part id.
#[derive(Debug, Clone)]
pub struct PartMeta {
    pub message_id: String,
    pub part_type: PartType,
    pub ignored: bool,
}

impl PartMeta {
    fn is_streamable_text(&self) -> bool {
        self.part_type == PartType::Text && !self.ignored
    }
}

/// A delta buffered until its message's role resolves.
#[derive(Debug, Clone)]
pub struct PendingDelta {
    pub message_id: String,
    pub delta: String,
}

/// Role resolver injected by the coordinator.
pub type ResolveRole<'a> = &'a dyn Fn(&str, &str) -> Option<MessageRole>;

/// Keep the previous text only when the incoming snapshot is a strict
/// shorter prefix of it. Providers occasionally re-send a truncated
/// snapshot after the full one; regressing the draft would make the
/// visible message shrink mid-stream.
pub fn merge_text_prefer_non_regressing(previous: &str, next: &str) -> String {
    if previous.len() > next.len() && previous.starts_with(next) {
        previous.to_string()
    } else {
        next.to_string()
    }
}

#[derive(Default)]
pub struct StreamState {
    /// Provider id of the streamed draft message, once one exists.
    pub message_id: Option<i64>,
    /// Joined draft text, recomputed from `parts` in `part_order`.
    pub text: String,
    pub parts: HashMap<String, String>,
    pub part_order: Vec<String>,
    pub pending: bool,
    pub timer: Option<TimerHandle>,
    /// Set when the draft outgrew the adapter's text limit; streaming
    /// stays off for the rest of the run.
    pub disabled: bool,
    pub part_meta: HashMap<String, PartMeta>,
    pub pending_part_deltas: HashMap<String, Vec<PendingDelta>>,
    /// message id -> part ids observed under it.
    pub message_parts: HashMap<String, HashSet<String>>,
}

impl StreamState {
    /// Record that `part_id` belongs to `message_id`, moving it if it was
    /// previously seen under a different message.
    pub fn remember_part_message(&mut self, part_id: &str, message_id: &str) {
        let previous = self
            .message_parts
            .iter()
            .find(|(mid, parts)| parts.contains(part_id) && mid.as_str() != message_id)
            .map(|(mid, _)| mid.clone());
        if self
            .message_parts
            .get(message_id)
            .is_some_and(|parts| parts.contains(part_id))
        {
            return;
        }
        if let Some(previous) = previous {
            if let Some(parts) = self.message_parts.get_mut(&previous) {
                parts.remove(part_id);
                if parts.is_empty() {
                    self.message_parts.remove(&previous);
                }
            }
        }
        self.message_parts
            .entry(message_id.to_string())
            .or_default()
            .insert(part_id.to_string());
    }

    /// Forget everything about a part: metadata, buffered deltas, message
    /// membership, and rendered text.
    pub fn clear_part_state(&mut self, part_id: &str) {
        self.pending_part_deltas.remove(part_id);
        self.part_meta.remove(part_id);
        self.remove_part_from_message_state(part_id);
        self.remove_part_from_render_state(part_id);
    }

    pub fn remove_part_from_render_state(&mut self, part_id: &str) {
        self.parts.remove(part_id);
        self.part_order.retain(|id| id != part_id);
        self.recompute_stream_text();
    }

    pub fn recompute_stream_text(&mut self) {
        self.text = self
            .part_order
            .iter()
            .map(|id| self.parts.get(id).map(String::as_str).unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n");
    }

    /// Replay buffered deltas for a part whose message role has resolved
    /// to assistant. Returns `true` if the draft text changed.
    pub fn apply_pending_deltas_if_eligible(
        &mut self,
        session_id: &str,
        part_id: &str,
        resolve_role: ResolveRole<'_>,
    ) -> bool {
        let Some(meta) = self.part_meta.get(part_id).cloned() else {
            self.pending_part_deltas.remove(part_id);
            return false;
        };
        if !meta.is_streamable_text() {
            self.pending_part_deltas.remove(part_id);
            return false;
        }

        let role = resolve_role(session_id, &meta.message_id);
        match role {
            Some(MessageRole::Assistant) => {}
            Some(_) => {
                self.pending_part_deltas.remove(part_id);
                return false;
            }
            None => return false,
        }

        let Some(queue) = self.pending_part_deltas.remove(part_id) else {
            return false;
        };
        if queue.is_empty() {
            return false;
        }

        if !self.parts.contains_key(part_id) {
            self.part_order.push(part_id.to_string());
        }
        let mut next = self.parts.get(part_id).cloned().unwrap_or_default();
        for item in &queue {
            if item.message_id == meta.message_id {
                next.push_str(&item.delta);
            }
        }
        self.parts.insert(part_id.to_string(), next);
        self.recompute_stream_text();
        true
    }

    fn remove_part_from_message_state(&mut self, part_id: &str) {
        let owner = self
            .message_parts
            .iter()
            .find(|(_, parts)| parts.contains(part_id))
            .map(|(mid, _)| mid.clone());
        if let Some(owner) = owner {
            if let Some(parts) = self.message_parts.get_mut(&owner) {
                parts.remove(part_id);
                if parts.is_empty() {
                    self.message_parts.remove(&owner);
                }
            }
        }
    }
}

/// All per-session render states, behind one lock.
///
/// Lock scope is a single synchronous mutation; nothing awaits while
/// holding it.
#[derive(Default)]
pub struct StreamStateStore {
    states: Mutex<HashMap<String, StreamState>>,
}

impl StreamStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate an existing session's state. No-op (returns `None`) when the
    /// session has no streaming state yet.
    pub fn with<R>(&self, session_id: &str, f: impl FnOnce(&mut StreamState) -> R) -> Option<R> {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        states.get_mut(session_id).map(f)
    }

    /// Mutate the session's state, creating it on first touch.
    pub fn with_ensure<R>(&self, session_id: &str, f: impl FnOnce(&mut StreamState) -> R) -> R {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        f(states.entry(session_id.to_string()).or_default())
    }

    pub fn message_id(&self, session_id: &str) -> Option<i64> {
        self.with(session_id, |state| state.message_id).flatten()
    }

    pub fn clear_session(&self, session_id: &str) {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut state) = states.remove(session_id) {
            if let Some(timer) = state.timer.take() {
                timer.cancel();
            }
        }
    }

    /// React to a message's role becoming known. Returns `true` when the
    /// draft now has flushable text.
    pub fn on_role_resolved(
        &self,
        session_id: &str,
        message_id: &str,
        role: MessageRole,
        resolve_role: ResolveRole<'_>,
    ) -> bool {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let Some(state) = states.get_mut(session_id) else {
            return false;
        };
        let Some(part_ids) = state.message_parts.get(message_id).cloned() else {
            return false;
        };
        if part_ids.is_empty() {
            return false;
        }

        if role != MessageRole::Assistant {
            for part_id in &part_ids {
                state.pending_part_deltas.remove(part_id);
                state.remove_part_from_render_state(part_id);
            }
            return false;
        }

        let mut should_flush = false;
        for part_id in &part_ids {
            let streamable = state
                .part_meta
                .get(part_id)
                .is_some_and(PartMeta::is_streamable_text);
            if !streamable {
                state.pending_part_deltas.remove(part_id);
                continue;
            }
            if state
                .parts
                .get(part_id)
                .is_some_and(|text| !text.trim().is_empty())
            {
                should_flush = true;
            }
            if state.apply_pending_deltas_if_eligible(session_id, part_id, resolve_role) {
                should_flush = true;
            }
        }

        if should_flush {
            state.pending = true;
        }
        should_flush
    }
}
