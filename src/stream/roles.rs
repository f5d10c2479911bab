//! Message-role bookkeeping for streamed sessions.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::agent::MessageRole;

const DEFAULT_MAX_ROLE_ENTRIES: usize = 64;

struct SessionRoles {
    roles: HashMap<String, MessageRole>,
    order: Vec<String>,
}

/// Remembers which role each message id belongs to, per session.
///
/// Capped per session with FIFO eviction; role events for long sessions
/// can outlive the cap without unbounded growth.
pub struct RoleIndex {
    sessions: Mutex<HashMap<String, SessionRoles>>,
    max_entries: usize,
}

impl RoleIndex {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ROLE_ENTRIES)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_entries,
        }
    }

    pub fn remember(&self, session_id: &str, message_id: &str, role: MessageRole) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let state = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionRoles {
                roles: HashMap::new(),
                order: Vec::new(),
            });
        if !state.roles.contains_key(message_id) {
            state.order.push(message_id.to_string());
        }
        state.roles.insert(message_id.to_string(), role);

        while state.order.len() > self.max_entries {
            let evicted = state.order.remove(0);
            state.roles.remove(&evicted);
        }
    }

    pub fn resolve(&self, session_id: &str, message_id: &str) -> Option<MessageRole> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(session_id)
            .and_then(|state| state.roles.get(message_id))
            .copied()
    }

    pub fn clear_session(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id);
    }
}

impl Default for RoleIndex {
    fn default() -> Self {
        Self::new()
    }
}
