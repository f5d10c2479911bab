//! Bridge configuration.
//!
//! Configuration merges two layers: an on-disk JSON file ([`ConfigFile`])
//! and environment variables, env winning. The resolved [`Config`] carries
//! only what the bridge core consumes; adapter credentials stay with the
//! adapter implementations.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::agent::ModelRef;
use crate::channels::identity::normalize_whatsapp_id;
use crate::channels::ChannelName;
use crate::error::ConfigError;

/// Access policy applied to a channel's senders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessPolicy {
    /// Every sender may talk to the agent.
    Open,
    /// Only allowlisted access keys may talk to the agent.
    Allowlist,
    /// Unknown senders are offered a pairing code an owner can approve.
    Pairing,
    /// Nobody may talk to the agent on this channel.
    Disabled,
}

impl AccessPolicy {
    fn parse(value: &str) -> Option<AccessPolicy> {
        match value.trim().to_lowercase().as_str() {
            "open" => Some(AccessPolicy::Open),
            "allowlist" => Some(AccessPolicy::Allowlist),
            "pairing" => Some(AccessPolicy::Pairing),
            "disabled" => Some(AccessPolicy::Disabled),
            _ => None,
        }
    }

    /// WhatsApp reaches the public phone network, so it defaults to pairing;
    /// every other channel requires explicit credentials to even connect and
    /// defaults to open.
    pub fn default_for(channel: ChannelName) -> AccessPolicy {
        if channel == ChannelName::WhatsApp {
            AccessPolicy::Pairing
        } else {
            AccessPolicy::Open
        }
    }
}

/// Per-channel section of the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSection {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub access_policy: Option<String>,
    #[serde(default)]
    pub allow_from: Vec<String>,
    /// WhatsApp only: treat the owner's own messages as allowed.
    #[serde(default)]
    pub self_chat_mode: Option<bool>,
}

/// On-disk configuration file (JSON).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub groups_enabled: Option<bool>,
    #[serde(default)]
    pub model: Option<ModelRef>,
    #[serde(default)]
    pub channels: HashMap<ChannelName, ChannelSection>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<ConfigFile, ConfigError> {
        if !path.exists() {
            return Ok(ConfigFile::default());
        }
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub data_dir: PathBuf,
    pub channel_access_policy: HashMap<ChannelName, AccessPolicy>,
    /// Allowlist seeds applied to the store at startup.
    pub allowlist: HashMap<ChannelName, Vec<String>>,
    pub whatsapp_allow_from: HashSet<String>,
    pub whatsapp_self_chat_mode: bool,
    pub groups_enabled: bool,
    pub model: Option<ModelRef>,
    /// Debounce window for streamed reply edits.
    pub flush_ms: u64,
    pub log_level: String,
}

impl Config {
    /// Resolve configuration from a config file path and the process
    /// environment.
    pub fn resolve(config_path: PathBuf) -> Result<Config, ConfigError> {
        let file = ConfigFile::load(&config_path)?;
        Ok(Self::from_parts(config_path, file, |key| {
            std::env::var(key).ok()
        }))
    }

    /// Resolution core, with the environment injected for tests.
    pub fn from_parts<E>(config_path: PathBuf, file: ConfigFile, env: E) -> Config
    where
        E: Fn(&str) -> Option<String>,
    {
        let mut channel_access_policy = HashMap::new();
        let mut allowlist: HashMap<ChannelName, Vec<String>> = HashMap::new();

        for channel in ChannelName::ALL {
            let section = file.channels.get(&channel);
            let env_key = format!("{}_ACCESS_POLICY", channel.as_str().to_uppercase());
            let policy = env(&env_key)
                .as_deref()
                .and_then(AccessPolicy::parse)
                .or_else(|| {
                    section
                        .and_then(|s| s.access_policy.as_deref())
                        .and_then(AccessPolicy::parse)
                })
                .unwrap_or_else(|| AccessPolicy::default_for(channel));
            channel_access_policy.insert(channel, policy);

            let mut entries: Vec<String> = section
                .map(|s| s.allow_from.clone())
                .unwrap_or_default()
                .iter()
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty())
                .collect();
            let env_allow_key = format!("{}_ALLOW_FROM", channel.as_str().to_uppercase());
            if let Some(value) = env(&env_allow_key) {
                entries.extend(
                    value
                        .split(',')
                        .map(|e| e.trim().to_string())
                        .filter(|e| !e.is_empty()),
                );
            }
            if channel == ChannelName::WhatsApp {
                entries = entries
                    .into_iter()
                    .map(|e| {
                        if e == "*" {
                            e
                        } else {
                            normalize_whatsapp_id(&e)
                        }
                    })
                    .collect();
            }
            allowlist.insert(channel, entries);
        }

        let whatsapp_allow_from: HashSet<String> = allowlist
            .get(&ChannelName::WhatsApp)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .collect();

        let whatsapp_self_chat_mode = env("WHATSAPP_SELF_CHAT_MODE")
            .map(|v| parse_bool(&v))
            .or_else(|| {
                file.channels
                    .get(&ChannelName::WhatsApp)
                    .and_then(|s| s.self_chat_mode)
            })
            .unwrap_or(false);

        let groups_enabled = env("GROUPS_ENABLED")
            .map(|v| parse_bool(&v))
            .or(file.groups_enabled)
            .unwrap_or(false);

        let flush_ms = env("STREAM_FLUSH_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(300);

        let data_dir = env("BRIDGE_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("chatbridge")
        });

        let log_level = env("LOG_LEVEL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "info".to_string());

        Config {
            config_path,
            data_dir,
            channel_access_policy,
            allowlist,
            whatsapp_allow_from,
            whatsapp_self_chat_mode,
            groups_enabled,
            model: file.model,
            flush_ms,
            log_level,
        }
    }

    pub fn policy_for(&self, channel: ChannelName) -> AccessPolicy {
        self.channel_access_policy
            .get(&channel)
            .copied()
            .unwrap_or_else(|| AccessPolicy::default_for(channel))
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
