//! Canvas hosting for agent-driven UI (A2UI).
//!
//! Allows the agent to create, update, and serve dynamic HTML/JS/CSS
//! canvases that run in the browser alongside the chat interface.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default maximum number of canvases.
const DEFAULT_MAX_CANVASES: usize = 50;

/// Default maximum content size in bytes (1 MB).
const DEFAULT_MAX_CONTENT_SIZE: usize = 1_048_576;

/// A canvas is an agent-generated web component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    pub id: Uuid,
    pub title: String,
    pub content_type: CanvasContentType,
    pub html: String,
    pub css: Option<String>,
    pub js: Option<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u32,
    pub pinned: bool,
}

/// The type of content a canvas holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasContentType {
    Html,
    Markdown,
    Chart,
    Form,
    Table,
    Code,
    Custom,
}

impl CanvasContentType {
    /// Parse a content type from a string.
    pub fn from_str_loose(s: &str) -> Result<Self, CanvasError> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "markdown" | "md" => Ok(Self::Markdown),
            "chart" => Ok(Self::Chart),
            "form" => Ok(Self::Form),
            "table" => Ok(Self::Table),
            "code" => Ok(Self::Code),
            "custom" => Ok(Self::Custom),
            other => Err(CanvasError::InvalidContent {
                reason: format!("Unknown content type: {other}"),
            }),
        }
    }
}

/// Manages active canvases.
pub struct CanvasManager {
    canvases: Arc<RwLock<HashMap<Uuid, Canvas>>>,
    max_canvases: usize,
    max_content_size: usize,
}

impl CanvasManager {
    /// Create a new canvas manager with default limits.
    pub fn new() -> Self {
        Self {
            canvases: Arc::new(RwLock::new(HashMap::new())),
            max_canvases: DEFAULT_MAX_CANVASES,
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
        }
    }

    /// Create a new canvas manager with custom limits.
    pub fn with_limits(max_canvases: usize, max_content_size: usize) -> Self {
        Self {
            canvases: Arc::new(RwLock::new(HashMap::new())),
            max_canvases,
            max_content_size,
        }
    }

    /// Create a new canvas.
    pub async fn create(
        &self,
        title: String,
        content_type: CanvasContentType,
        html: String,
        css: Option<String>,
        js: Option<String>,
    ) -> Result<Canvas, CanvasError> {
        self.validate_content_size(&html, &css, &js)?;

        let mut canvases = self.canvases.write().await;

        if canvases.len() >= self.max_canvases {
            return Err(CanvasError::LimitReached {
                max: self.max_canvases,
            });
        }

        let now = Utc::now();
        let canvas = Canvas {
            id: Uuid::new_v4(),
            title,
            content_type,
            html,
            css,
            js,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            version: 1,
            pinned: false,
        };

        canvases.insert(canvas.id, canvas.clone());

        Ok(canvas)
    }

    /// Update an existing canvas. Only provided fields are changed.
    pub async fn update(
        &self,
        id: Uuid,
        html: Option<String>,
        css: Option<String>,
        js: Option<String>,
    ) -> Result<Canvas, CanvasError> {
        let mut canvases = self.canvases.write().await;

        let canvas = canvases.get_mut(&id).ok_or(CanvasError::NotFound { id })?;

        // Validate sizes using the values that will actually be stored.
        let effective_html = html.as_deref().unwrap_or(&canvas.html);
        let effective_css = css.as_ref().or(canvas.css.as_ref());
        let effective_js = js.as_ref().or(canvas.js.as_ref());

        self.validate_content_size(
            effective_html,
            &effective_css.cloned(),
            &effective_js.cloned(),
        )?;

        if let Some(h) = html {
            canvas.html = h;
        }
        if let Some(c) = css {
            canvas.css = Some(c);
        }
        if let Some(j) = js {
            canvas.js = Some(j);
        }

        canvas.version += 1;
        canvas.updated_at = Utc::now();

        Ok(canvas.clone())
    }

    /// Get a canvas by ID.
    pub async fn get(&self, id: Uuid) -> Option<Canvas> {
        self.canvases.read().await.get(&id).cloned()
    }

    /// List all canvases, sorted by creation time (newest first).
    pub async fn list(&self) -> Vec<Canvas> {
        let canvases = self.canvases.read().await;
        let mut list: Vec<Canvas> = canvases.values().cloned().collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// Delete a canvas by ID. Returns `true` if it existed.
    pub async fn delete(&self, id: Uuid) -> bool {
        self.canvases.write().await.remove(&id).is_some()
    }

    /// Pin or unpin a canvas.
    pub async fn pin(&self, id: Uuid, pinned: bool) -> Result<(), CanvasError> {
        let mut canvases = self.canvases.write().await;
        let canvas = canvases.get_mut(&id).ok_or(CanvasError::NotFound { id })?;
        canvas.pinned = pinned;
        canvas.updated_at = Utc::now();
        Ok(())
    }

    /// Render a canvas as a complete HTML page.
    pub async fn render(&self, id: Uuid) -> Result<String, CanvasError> {
        let canvases = self.canvases.read().await;
        let canvas = canvases.get(&id).ok_or(CanvasError::NotFound { id })?;

        let css_block = canvas
            .css
            .as_deref()
            .map(|css| format!("<style>\n{css}\n</style>"))
            .unwrap_or_default();

        let js_block = canvas
            .js
            .as_deref()
            .map(|js| format!("<script>\n{js}\n</script>"))
            .unwrap_or_default();

        let html = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
{css_block}
</head>
<body>
{body}
{js_block}
</body>
</html>"#,
            title = html_escape(&canvas.title),
            css_block = css_block,
            body = canvas.html,
            js_block = js_block,
        );

        Ok(html)
    }

    /// Validate that total content size is within limits.
    fn validate_content_size(
        &self,
        html: &str,
        css: &Option<String>,
        js: &Option<String>,
    ) -> Result<(), CanvasError> {
        let total =
            html.len() + css.as_ref().map_or(0, |c| c.len()) + js.as_ref().map_or(0, |j| j.len());

        if total > self.max_content_size {
            return Err(CanvasError::ContentTooLarge {
                size: total,
                max: self.max_content_size,
            });
        }

        Ok(())
    }
}

impl Default for CanvasManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape HTML special characters in a string (for use in title tags, etc.).
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Canvas operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
    #[error("Canvas not found: {id}")]
    NotFound { id: Uuid },

    #[error("Maximum canvas count reached: {max}")]
    LimitReached { max: usize },

    #[error("Content too large: {size} bytes exceeds {max} byte limit")]
    ContentTooLarge { size: usize, max: usize },

    #[error("Invalid canvas content: {reason}")]
    InvalidContent { reason: String },
}
