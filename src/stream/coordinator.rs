//! Event-driven coordinator for channels with live message editing.
//!
//! Gating rules, applied in order:
//! - only parts of assistant messages render; user-message echoes never
//!   reach the wire
//! - only plain text parts render; reasoning and tool parts are excluded,
//!   retroactively if their type was learned late
//! - deltas that arrive before their message's role is known are buffered
//!   and replayed once the role resolves to assistant
//! - a part snapshot never regresses the draft to a strict shorter prefix

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{MessageRole, PartSnapshot, PartType};
use crate::bridge::{RunState, SessionRunRegistry};
use crate::channels::{AdapterMap, ChannelName};

use super::flush::{FlushEngine, Scheduler};
use super::roles::RoleIndex;
use super::state::{merge_text_prefer_non_regressing, PartMeta, PendingDelta, StreamStateStore};
use super::StreamCoordinator;

/// Part id used when the provider streams a single unnamed text part.
const FALLBACK_PART_ID: &str = "__single_text_part__";

pub struct EditStreamCoordinator {
    channel: ChannelName,
    registry: Arc<SessionRunRegistry>,
    roles: Arc<RoleIndex>,
    state: Arc<StreamStateStore>,
    flush: Arc<FlushEngine>,
}

impl EditStreamCoordinator {
    pub fn new(
        channel: ChannelName,
        adapters: Arc<AdapterMap>,
        registry: Arc<SessionRunRegistry>,
        flush_ms: u64,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let state = Arc::new(StreamStateStore::new());
        let flush = Arc::new(FlushEngine::new(
            channel,
            adapters,
            Arc::clone(&registry),
            Arc::clone(&state),
            flush_ms,
            scheduler,
        ));
        Self {
            channel,
            registry,
            roles: Arc::new(RoleIndex::new()),
            state,
            flush,
        }
    }

    fn resolve_run(&self, session_id: &str, include_suppressed: bool) -> Option<Arc<RunState>> {
        let run = self.registry.get(session_id)?;
        if run.channel != self.channel {
            return None;
        }
        if !include_suppressed && run.streaming_suppressed() {
            return None;
        }
        Some(run)
    }
}

#[async_trait]
impl StreamCoordinator for EditStreamCoordinator {
    async fn on_message_updated(&self, session_id: &str, message_id: &str, role: MessageRole) {
        if self.resolve_run(session_id, false).is_none() {
            return;
        }

        self.roles.remember(session_id, message_id, role);
        let roles = Arc::clone(&self.roles);
        let resolve = move |sid: &str, mid: &str| roles.resolve(sid, mid);
        let should_flush = self
            .state
            .on_role_resolved(session_id, message_id, role, &resolve);
        if should_flush {
            self.flush.mark_pending(session_id);
        }
    }

    async fn on_message_part_updated(&self, part: &PartSnapshot, delta: Option<&str>) {
        let session_id = part.session_id.as_str();
        let Some(run) = self.resolve_run(session_id, true) else {
            return;
        };

        let part_id = if part.part_id.trim().is_empty() {
            FALLBACK_PART_ID
        } else {
            part.part_id.as_str()
        };

        if run.streaming_suppressed() {
            self.state.with(session_id, |state| {
                state.clear_part_state(part_id);
            });
            return;
        }

        if part.message_id.is_empty() {
            return;
        }

        let delta = delta.unwrap_or("");
        let role = self.roles.resolve(session_id, &part.message_id);
        let roles = Arc::clone(&self.roles);
        let resolve = move |sid: &str, mid: &str| roles.resolve(sid, mid);

        let should_flush = self.state.with_ensure(session_id, |state| {
            state.remember_part_message(part_id, &part.message_id);
            state.part_meta.insert(
                part_id.to_string(),
                PartMeta {
                    message_id: part.message_id.clone(),
                    part_type: part.part_type,
                    ignored: part.part_type == PartType::Text && part.ignored,
                },
            );

            if part.part_type != PartType::Text || part.ignored {
                state.pending_part_deltas.remove(part_id);
                state.remove_part_from_render_state(part_id);
                return false;
            }

            match role {
                None => {
                    state.remove_part_from_render_state(part_id);
                    return false;
                }
                Some(MessageRole::Assistant) => {}
                Some(_) => {
                    state.pending_part_deltas.remove(part_id);
                    state.remove_part_from_render_state(part_id);
                    return false;
                }
            }

            if !state.parts.contains_key(part_id) {
                state.part_order.push(part_id.to_string());
            }
            let previous = state.parts.get(part_id).cloned().unwrap_or_default();
            let mut next = merge_text_prefer_non_regressing(&previous, &part.text);
            if !delta.is_empty() {
                next.push_str(delta);
            }
            state.parts.insert(part_id.to_string(), next);
            state.recompute_stream_text();

            let mut should_flush = state
                .parts
                .get(part_id)
                .is_some_and(|text| !text.trim().is_empty());
            if !delta.is_empty() {
                should_flush = true;
            }
            if state.apply_pending_deltas_if_eligible(session_id, part_id, &resolve) {
                should_flush = true;
            }
            should_flush
        });

        if should_flush {
            self.flush.mark_pending(session_id);
        }
    }

    async fn on_message_part_delta(
        &self,
        session_id: &str,
        message_id: &str,
        part_id: &str,
        delta: &str,
    ) {
        let Some(run) = self.resolve_run(session_id, true) else {
            return;
        };

        if run.streaming_suppressed() {
            self.state.with(session_id, |state| {
                state.clear_part_state(part_id);
            });
            return;
        }

        if message_id.is_empty() || part_id.is_empty() || delta.is_empty() {
            return;
        }

        let role = self.roles.resolve(session_id, message_id);
        let mark = self.state.with_ensure(session_id, |state| {
            if role.is_some_and(|r| r != MessageRole::Assistant) {
                state.pending_part_deltas.remove(part_id);
                return false;
            }

            // A part that moved to a new message starts from scratch.
            let stale = state
                .part_meta
                .get(part_id)
                .is_some_and(|meta| meta.message_id != message_id);
            if stale {
                state.part_meta.remove(part_id);
                state.pending_part_deltas.remove(part_id);
                state.remove_part_from_render_state(part_id);
            }

            let meta = state.part_meta.get(part_id).cloned();
            if let Some(meta) = &meta {
                if meta.part_type != PartType::Text || meta.ignored {
                    state.pending_part_deltas.remove(part_id);
                    return false;
                }
            }

            if meta.is_some() && role == Some(MessageRole::Assistant) {
                if !state.parts.contains_key(part_id) {
                    state.part_order.push(part_id.to_string());
                }
                let mut next = state.parts.get(part_id).cloned().unwrap_or_default();
                next.push_str(delta);
                state.parts.insert(part_id.to_string(), next);
                state.recompute_stream_text();
                return true;
            }

            state
                .pending_part_deltas
                .entry(part_id.to_string())
                .or_default()
                .push(PendingDelta {
                    message_id: message_id.to_string(),
                    delta: delta.to_string(),
                });
            false
        });

        if mark {
            self.flush.mark_pending(session_id);
        }
    }

    async fn on_session_idle(&self, session_id: &str) {
        self.flush.on_session_idle(session_id).await;
    }

    async fn finalize_reply(&self, session_id: &str, peer_id: &str, text: &str) -> bool {
        self.flush.finalize_reply(session_id, peer_id, text).await
    }

    async fn has_streamed_message(&self, session_id: &str) -> bool {
        self.flush.has_streamed_message(session_id)
    }

    async fn clear_session(&self, session_id: &str) {
        self.roles.clear_session(session_id);
        self.flush.clear_session(session_id);
    }
}
