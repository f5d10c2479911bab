//! Session management tools for inter-session messaging.
//!
//! These tools allow the LLM to perform cross-session operations:
//! - List active sessions with filtering
//! - Retrieve conversation history from a session
//! - Send a message to another session (requires approval)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::agent::SessionManager;
use crate::agent::session::Session;
use crate::context::JobContext;
use crate::db::Database;
use crate::tools::tool::{Tool, ToolError, ToolOutput};

/// Summary of a session returned by the list tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionInfo {
    id: String,
    user_id: String,
    thread_count: usize,
    created_at: String,
    last_active_at: String,
}

/// A message entry returned by the history tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MessageEntry {
    role: String,
    content: String,
    timestamp: String,
}

// ---------------------------------------------------------------------------
// SessionListTool
// ---------------------------------------------------------------------------

/// Lists active sessions with optional filtering.
///
/// Returns a JSON array of session summaries including id, user_id,
/// thread_count, created_at, and last_active_at.
pub struct SessionListTool {
    session_manager: Arc<SessionManager>,
}

impl SessionListTool {
    /// Create a new `SessionListTool`.
    pub fn new(session_manager: Arc<SessionManager>) -> Self {
        Self { session_manager }
    }
}

#[async_trait]
impl Tool for SessionListTool {
    fn name(&self) -> &str {
        "session_list"
    }

    fn description(&self) -> &str {
        "List active sessions. Optionally filter by kind and limit the number of results. \
         Returns session IDs, user IDs, thread counts, and timestamps."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "kind": {
                    "type": "string",
                    "description": "Optional filter by session kind: 'main', 'group', 'cron', 'hook'",
                    "enum": ["main", "group", "cron", "hook"]
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of sessions to return (default: 20)",
                    "minimum": 1,
                    "maximum": 100
                }
            }
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        _ctx: &JobContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let _kind = params.get("kind").and_then(|v| v.as_str());
        let limit = params.get("limit").and_then(|v| v.as_u64()).unwrap_or(20) as usize;

        // Access the sessions from the session manager.
        // The SessionManager exposes sessions via an RwLock; we read-lock to
        // enumerate them without blocking writers for long.
        let sessions_lock: tokio::sync::RwLockReadGuard<'_, HashMap<String, Arc<Mutex<Session>>>> =
            self.session_manager.sessions.read().await;

        let mut infos: Vec<SessionInfo> = Vec::new();
        for (_user_id, session_arc) in sessions_lock.iter() {
            if let Ok(sess) = session_arc.try_lock() {
                // If a kind filter is provided, check session metadata for a
                // "kind" field. Sessions without a matching kind are skipped.
                if let Some(kind_filter) = _kind {
                    let session_kind = sess
                        .metadata
                        .get("kind")
                        .and_then(|v: &serde_json::Value| v.as_str())
                        .unwrap_or("main");
                    if session_kind != kind_filter {
                        continue;
                    }
                }

                infos.push(SessionInfo {
                    id: sess.id.to_string(),
                    user_id: sess.user_id.clone(),
                    thread_count: sess.threads.len(),
                    created_at: sess.created_at.to_rfc3339(),
                    last_active_at: sess.last_active_at.to_rfc3339(),
                });

                if infos.len() >= limit {
                    break;
                }
            }
        }

        // Sort by last_active_at descending (most recent first).
        infos.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));

        let result = serde_json::json!({
            "sessions": infos,
            "count": infos.len(),
        });

        Ok(ToolOutput::success(result, start.elapsed()))
    }

    fn requires_sanitization(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// SessionHistoryTool
// ---------------------------------------------------------------------------

/// Retrieves conversation history from a specific session.
///
/// Looks up the session by its ID, finds the active thread, and returns
/// the most recent messages as a JSON array of `{role, content, timestamp}`.
pub struct SessionHistoryTool {
    session_manager: Arc<SessionManager>,
    db: Arc<dyn Database>,
}

impl SessionHistoryTool {
    /// Create a new `SessionHistoryTool`.
    pub fn new(session_manager: Arc<SessionManager>, db: Arc<dyn Database>) -> Self {
        Self {
            session_manager,
            db,
        }
    }
}

#[async_trait]
impl Tool for SessionHistoryTool {
    fn name(&self) -> &str {
        "session_history"
    }

    fn description(&self) -> &str {
        "Retrieve conversation history from a session. Returns messages with role, content, \
         and timestamp. Use session_list to find valid session IDs first."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "The UUID of the session to retrieve history from"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of messages to return (default: 50)",
                    "minimum": 1,
                    "maximum": 200
                }
            },
            "required": ["session_id"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &JobContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let session_id_str = params
            .get("session_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("missing 'session_id' parameter".into()))?;

        let session_id = uuid::Uuid::parse_str(session_id_str).map_err(|_| {
            ToolError::InvalidParameters(format!("invalid session ID format: {}", session_id_str))
        })?;

        let limit = params.get("limit").and_then(|v| v.as_u64()).unwrap_or(50) as usize;

        // Find the session by iterating the session manager's sessions.
        let sessions_lock: tokio::sync::RwLockReadGuard<'_, HashMap<String, Arc<Mutex<Session>>>> =
            self.session_manager.sessions.read().await;

        let mut target_session = None;
        for (_user_id, session_arc) in sessions_lock.iter() {
            if let Ok(sess) = session_arc.try_lock()
                && sess.id == session_id
            {
                // Verify the requesting user owns this session.
                if sess.user_id != ctx.user_id {
                    let result = serde_json::json!({
                        "error": "Access denied: session belongs to another user"
                    });
                    return Ok(ToolOutput::success(result, start.elapsed()));
                }

                // If the session has a conversation_id in metadata, use DB
                // history; otherwise fall back to in-memory thread turns.
                let conversation_id = sess
                    .metadata
                    .get("conversation_id")
                    .and_then(|v: &serde_json::Value| v.as_str())
                    .and_then(|s| uuid::Uuid::parse_str(s).ok());

                // Collect in-memory messages from the active thread.
                let mut entries: Vec<MessageEntry> = Vec::new();
                if let Some(thread) = sess.active_thread() {
                    for turn in &thread.turns {
                        entries.push(MessageEntry {
                            role: "user".to_string(),
                            content: turn.user_input.clone(),
                            timestamp: turn.started_at.to_rfc3339(),
                        });
                        if let Some(ref response) = turn.response {
                            let ts = turn.completed_at.unwrap_or(turn.started_at).to_rfc3339();
                            entries.push(MessageEntry {
                                role: "assistant".to_string(),
                                content: response.clone(),
                                timestamp: ts,
                            });
                        }
                    }
                }

                target_session = Some((entries, conversation_id));
                break;
            }
        }
        drop(sessions_lock);

        let (mut entries, conversation_id) = match target_session {
            Some(data) => data,
            None => {
                let result = serde_json::json!({
                    "error": format!("Session {} not found", session_id)
                });
                return Ok(ToolOutput::success(result, start.elapsed()));
            }
        };

        // If a conversation ID is available and the in-memory turns are empty,
        // try to load persisted messages from the database.
        if entries.is_empty()
            && let Some(conv_id) = conversation_id
        {
            match self.db.list_conversation_messages(conv_id).await {
                Ok(messages) => {
                    for msg in messages {
                        entries.push(MessageEntry {
                            role: msg.role.clone(),
                            content: msg.content.clone(),
                            timestamp: msg.created_at.to_rfc3339(),
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        conversation_id = %conv_id,
                        "Failed to load conversation messages: {}",
                        e
                    );
                }
            }
        }

        // Apply limit (take the most recent messages).
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }

        let result = serde_json::json!({
            "session_id": session_id_str,
            "messages": entries,
            "count": entries.len(),
        });

        Ok(ToolOutput::success(result, start.elapsed()))
    }

    fn requires_sanitization(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// SessionSendTool
// ---------------------------------------------------------------------------

/// Sends a message to another session's active thread.
///
/// This tool requires user approval before execution because it performs
/// a cross-session write operation.
pub struct SessionSendTool {
    session_manager: Arc<SessionManager>,
    db: Arc<dyn Database>,
}

impl SessionSendTool {
    /// Create a new `SessionSendTool`.
    pub fn new(session_manager: Arc<SessionManager>, db: Arc<dyn Database>) -> Self {
        Self {
            session_manager,
            db,
        }
    }
}

#[async_trait]
impl Tool for SessionSendTool {
    fn name(&self) -> &str {
        "session_send"
    }

    fn description(&self) -> &str {
        "Send a message to another session. The message is injected into the target session's \
         active thread as a new user turn. Requires approval because it writes to another session."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "The UUID of the target session to send the message to"
                },
                "content": {
                    "type": "string",
                    "description": "The message content to send"
                }
            },
            "required": ["session_id", "content"]
        })
    }

    async fn execute(
        &self,
        params: serde_json::Value,
        ctx: &JobContext,
    ) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let session_id_str = params
            .get("session_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("missing 'session_id' parameter".into()))?;

        let content = params
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("missing 'content' parameter".into()))?;

        if content.is_empty() {
            return Err(ToolError::InvalidParameters(
                "content must not be empty".into(),
            ));
        }

        let session_id = uuid::Uuid::parse_str(session_id_str).map_err(|_| {
            ToolError::InvalidParameters(format!("invalid session ID format: {}", session_id_str))
        })?;

        // Look up the target session.
        let sessions_lock: tokio::sync::RwLockReadGuard<'_, HashMap<String, Arc<Mutex<Session>>>> =
            self.session_manager.sessions.read().await;

        let mut target_session_arc: Option<Arc<Mutex<Session>>> = None;
        for (_user_id, session_arc) in sessions_lock.iter() {
            if let Ok(sess) = session_arc.try_lock()
                && sess.id == session_id
            {
                // Verify the requesting user owns the target session.
                if sess.user_id != ctx.user_id {
                    let result = serde_json::json!({
                        "error": "Access denied: session belongs to another user"
                    });
                    return Ok(ToolOutput::success(result, start.elapsed()));
                }
                target_session_arc = Some(session_arc.clone());
                break;
            }
        }
        drop(sessions_lock);

        let target_session_arc = match target_session_arc {
            Some(arc) => arc,
            None => {
                let result = serde_json::json!({
                    "error": format!("Session {} not found", session_id)
                });
                return Ok(ToolOutput::success(result, start.elapsed()));
            }
        };

        // Inject the message into the target session's active thread.
        let message_id = uuid::Uuid::new_v4();
        let mut sess = target_session_arc.lock().await;
        let thread = sess.get_or_create_thread();
        thread.start_turn(content);

        // If the session has a conversation_id, also persist to the database.
        let conversation_id = sess
            .metadata
            .get("conversation_id")
            .and_then(|v: &serde_json::Value| v.as_str())
            .and_then(|s| uuid::Uuid::parse_str(s).ok());
        drop(sess);

        if let Some(conv_id) = conversation_id {
            let db = self.db.clone();
            let content_owned = content.to_string();
            tokio::spawn(async move {
                if let Err(e) = db
                    .add_conversation_message(conv_id, "user", &content_owned)
                    .await
                {
                    tracing::warn!(
                        conversation_id = %conv_id,
                        "Failed to persist cross-session message: {}",
                        e
                    );
                }
            });
        }

        let result = serde_json::json!({
            "message_id": message_id.to_string(),
            "session_id": session_id_str,
            "status": "sent",
            "message": format!("Message sent to session {}", session_id)
        });

        Ok(ToolOutput::success(result, start.elapsed()))
    }

    fn requires_approval(&self) -> bool {
        true
    }

    fn requires_sanitization(&self) -> bool {
        false
    }
}
