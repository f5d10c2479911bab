//! Plugin lifecycle manager.
//!
//! Manages registration, activation, and lifecycle of plugins across
//! all plugin types (auth, memory, provider, hook, channel, tool, http_route).

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::extensions::plugins::{Plugin, PluginRoute, PluginStatus, PluginType};

/// Error type for plugin operations.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin not found: {0}")]
    NotFound(String),
    #[error("Plugin already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Plugin activation failed: {reason}")]
    ActivationFailed { name: String, reason: String },
    #[error("Plugin type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
    #[error("Plugin validation failed: {0}")]
    ValidationFailed(String),
    #[error("Plugin dependency not met: {plugin} requires {dependency}")]
    DependencyNotMet { plugin: String, dependency: String },
}

/// Manages all registered plugins.
pub struct PluginManager {
    plugins: Arc<RwLock<HashMap<String, PluginEntry>>>,
    max_plugins: usize,
}

/// Internal plugin entry with status tracking.
#[derive(Debug, Clone)]
struct PluginEntry {
    plugin: Plugin,
    status: PluginStatus,
    activated_at: Option<chrono::DateTime<chrono::Utc>>,
    error: Option<String>,
    load_order: usize,
}

/// Summary of registered plugins.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSummary {
    pub total: usize,
    pub active: usize,
    pub disabled: usize,
    pub error: usize,
    pub by_type: HashMap<String, usize>,
}

/// Snapshot of a plugin's state.
#[derive(Debug, Clone, Serialize)]
pub struct PluginSnapshot {
    pub name: String,
    pub plugin_type: PluginType,
    pub description: String,
    pub version: String,
    pub status: PluginStatus,
    pub enabled: bool,
    pub activated_at: Option<String>,
    pub error: Option<String>,
    pub routes: Vec<PluginRoute>,
}

impl PluginManager {
    /// Create a new plugin manager with default limits.
    pub fn new() -> Self {
        Self {
            plugins: Arc::new(RwLock::new(HashMap::new())),
            max_plugins: 100,
        }
    }

    /// Set the maximum number of plugins allowed.
    pub fn with_max_plugins(mut self, max: usize) -> Self {
        self.max_plugins = max;
        self
    }

    /// Register a new plugin.
    pub async fn register(&self, plugin: Plugin) -> Result<(), PluginError> {
        let mut plugins = self.plugins.write().await;
        if plugins.contains_key(&plugin.name) {
            return Err(PluginError::AlreadyRegistered(plugin.name.clone()));
        }
        if plugins.len() >= self.max_plugins {
            return Err(PluginError::ValidationFailed(format!(
                "Maximum plugin limit ({}) reached",
                self.max_plugins
            )));
        }
        let load_order = plugins.len();
        plugins.insert(
            plugin.name.clone(),
            PluginEntry {
                status: if plugin.enabled {
                    PluginStatus::Active
                } else {
                    PluginStatus::Disabled
                },
                plugin,
                activated_at: None,
                error: None,
                load_order,
            },
        );
        Ok(())
    }

    /// Unregister a plugin by name, returning it if found.
    pub async fn unregister(&self, name: &str) -> Result<Plugin, PluginError> {
        self.plugins
            .write()
            .await
            .remove(name)
            .map(|e| e.plugin)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))
    }

    /// Activate a plugin by name.
    pub async fn activate(&self, name: &str) -> Result<(), PluginError> {
        let mut plugins = self.plugins.write().await;
        let entry = plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        entry.status = PluginStatus::Active;
        entry.plugin.enabled = true;
        entry.activated_at = Some(chrono::Utc::now());
        entry.error = None;
        Ok(())
    }

    /// Deactivate a plugin by name.
    pub async fn deactivate(&self, name: &str) -> Result<(), PluginError> {
        let mut plugins = self.plugins.write().await;
        let entry = plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        entry.status = PluginStatus::Disabled;
        entry.plugin.enabled = false;
        Ok(())
    }

    /// Set error state on a plugin.
    pub async fn set_error(&self, name: &str, error: String) -> Result<(), PluginError> {
        let mut plugins = self.plugins.write().await;
        let entry = plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        entry.status = PluginStatus::Error;
        entry.error = Some(error);
        Ok(())
    }

    /// Get a snapshot of a plugin by name.
    pub async fn get(&self, name: &str) -> Option<PluginSnapshot> {
        self.plugins.read().await.get(name).map(|e| e.snapshot())
    }

    /// List all plugins, ordered by registration order.
    pub async fn list(&self) -> Vec<PluginSnapshot> {
        let plugins = self.plugins.read().await;
        let mut entries: Vec<_> = plugins.values().collect();
        entries.sort_by_key(|e| e.load_order);
        entries.iter().map(|e| e.snapshot()).collect()
    }

    /// List plugins filtered by type.
    pub async fn list_by_type(&self, plugin_type: PluginType) -> Vec<PluginSnapshot> {
        self.plugins
            .read()
            .await
            .values()
            .filter(|e| e.plugin.plugin_type == plugin_type)
            .map(|e| e.snapshot())
            .collect()
    }

    /// Get summary statistics of all registered plugins.
    pub async fn summary(&self) -> PluginSummary {
        let plugins = self.plugins.read().await;
        let mut by_type: HashMap<String, usize> = HashMap::new();
        let mut active = 0;
        let mut disabled = 0;
        let mut error = 0;

        for entry in plugins.values() {
            *by_type
                .entry(entry.plugin.plugin_type.to_string())
                .or_default() += 1;
            match entry.status {
                PluginStatus::Active => active += 1,
                PluginStatus::Disabled => disabled += 1,
                PluginStatus::Error => error += 1,
                PluginStatus::Loading => {}
            }
        }

        PluginSummary {
            total: plugins.len(),
            active,
            disabled,
            error,
            by_type,
        }
    }

    /// Update the configuration of a plugin.
    pub async fn update_config(
        &self,
        name: &str,
        config: HashMap<String, serde_json::Value>,
    ) -> Result<(), PluginError> {
        let mut plugins = self.plugins.write().await;
        let entry = plugins
            .get_mut(name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        entry.plugin.config = config;
        Ok(())
    }
}

impl PluginEntry {
    fn snapshot(&self) -> PluginSnapshot {
        PluginSnapshot {
            name: self.plugin.name.clone(),
            plugin_type: self.plugin.plugin_type,
            description: self.plugin.description.clone(),
            version: self.plugin.version.clone(),
            status: self.status,
            enabled: self.plugin.enabled,
            activated_at: self.activated_at.map(|t| t.to_rfc3339()),
            error: self.error.clone(),
            routes: self.plugin.routes.clone(),
        }
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}
