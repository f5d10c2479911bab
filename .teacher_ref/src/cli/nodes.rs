//! CLI commands for managing IronClaw nodes (remote device instances).
//!
//! Nodes are remote IronClaw instances that can be discovered, paired,
//! and managed from a central instance.

use clap::Subcommand;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Node management commands.
#[derive(Subcommand, Debug)]
pub enum NodesCommand {
    /// List all known nodes.
    List {
        /// Show only online nodes.
        #[arg(long)]
        online: bool,
    },
    /// Add a new node.
    Add {
        /// Node name.
        name: String,
        /// Node URL (e.g., http://192.168.1.100:3000).
        #[arg(long)]
        url: String,
        /// Authentication token for the node.
        #[arg(long)]
        token: Option<String>,
    },
    /// Remove a node.
    Remove {
        /// Node name or ID.
        name: String,
    },
    /// Check node health.
    Ping {
        /// Node name or ID (omit for all nodes).
        name: Option<String>,
    },
    /// Show detailed node information.
    Info {
        /// Node name or ID.
        name: String,
    },
    /// Pair with a discovered node.
    Pair {
        /// Node URL to pair with.
        url: String,
    },
    /// Unpair a node.
    Unpair {
        /// Node name or ID.
        name: String,
    },
}

/// Represents a remote IronClaw node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub status: NodeStatus,
    pub paired: bool,
    pub version: Option<String>,
    pub platform: Option<String>,
    pub last_seen: Option<chrono::DateTime<chrono::Utc>>,
    pub added_at: chrono::DateTime<chrono::Utc>,
    pub token: Option<String>,
}

/// Status of a remote node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Offline,
    Unknown,
    Pairing,
    Error,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
            Self::Unknown => write!(f, "unknown"),
            Self::Pairing => write!(f, "pairing"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Manager for remote nodes.
pub struct NodeManager {
    nodes: std::sync::Arc<tokio::sync::RwLock<Vec<Node>>>,
}

impl NodeManager {
    pub fn new() -> Self {
        Self {
            nodes: std::sync::Arc::new(tokio::sync::RwLock::new(Vec::new())),
        }
    }

    /// Add a new node with the given name, URL, and optional authentication token.
    pub async fn add_node(
        &self,
        name: String,
        url: String,
        token: Option<String>,
    ) -> Result<Node, String> {
        let mut nodes = self.nodes.write().await;
        if nodes.iter().any(|n| n.name == name) {
            return Err(format!("Node '{}' already exists", name));
        }
        if nodes.iter().any(|n| n.url == url) {
            return Err(format!("Node with URL '{}' already exists", url));
        }
        let node = Node {
            id: Uuid::new_v4(),
            name,
            url,
            status: NodeStatus::Unknown,
            paired: false,
            version: None,
            platform: None,
            last_seen: None,
            added_at: chrono::Utc::now(),
            token,
        };
        nodes.push(node.clone());
        Ok(node)
    }

    /// Remove a node by name or ID. Returns `true` if a node was removed.
    pub async fn remove_node(&self, name: &str) -> bool {
        let mut nodes = self.nodes.write().await;
        let len_before = nodes.len();
        nodes.retain(|n| n.name != name && n.id.to_string() != name);
        nodes.len() < len_before
    }

    /// List all nodes, optionally filtering to online-only.
    pub async fn list_nodes(&self, online_only: bool) -> Vec<Node> {
        let nodes = self.nodes.read().await;
        if online_only {
            nodes
                .iter()
                .filter(|n| n.status == NodeStatus::Online)
                .cloned()
                .collect()
        } else {
            nodes.clone()
        }
    }

    /// Get a node by name or ID.
    pub async fn get_node(&self, name: &str) -> Option<Node> {
        self.nodes
            .read()
            .await
            .iter()
            .find(|n| n.name == name || n.id.to_string() == name)
            .cloned()
    }

    /// Update the status of a node by name or ID. Returns `true` if the node was found.
    pub async fn update_status(&self, name: &str, status: NodeStatus) -> bool {
        let mut nodes = self.nodes.write().await;
        if let Some(node) = nodes
            .iter_mut()
            .find(|n| n.name == name || n.id.to_string() == name)
        {
            node.status = status;
            if status == NodeStatus::Online {
                node.last_seen = Some(chrono::Utc::now());
            }
            true
        } else {
            false
        }
    }

    /// Mark a node as paired.
    pub async fn pair_node(&self, name: &str) -> Result<(), String> {
        let mut nodes = self.nodes.write().await;
        if let Some(node) = nodes
            .iter_mut()
            .find(|n| n.name == name || n.id.to_string() == name)
        {
            if node.paired {
                return Err(format!("Node '{}' is already paired", name));
            }
            node.paired = true;
            Ok(())
        } else {
            Err(format!("Node '{}' not found", name))
        }
    }

    /// Unmark a node as paired.
    pub async fn unpair_node(&self, name: &str) -> Result<(), String> {
        let mut nodes = self.nodes.write().await;
        if let Some(node) = nodes
            .iter_mut()
            .find(|n| n.name == name || n.id.to_string() == name)
        {
            node.paired = false;
            Ok(())
        } else {
            Err(format!("Node '{}' not found", name))
        }
    }

    /// Ping a node by hitting its health endpoint. Updates the node's status.
    pub async fn ping_node(&self, name: &str) -> Result<bool, String> {
        let node = self
            .get_node(name)
            .await
            .ok_or_else(|| format!("Node '{}' not found", name))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| format!("HTTP client error: {}", e))?;

        let url = format!("{}/api/health", node.url.trim_end_matches('/'));
        match client.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => {
                self.update_status(name, NodeStatus::Online).await;
                Ok(true)
            }
            Ok(_) => {
                self.update_status(name, NodeStatus::Error).await;
                Ok(false)
            }
            Err(_) => {
                self.update_status(name, NodeStatus::Offline).await;
                Ok(false)
            }
        }
    }
}

impl Default for NodeManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a nodes command (standalone CLI mode without agent runtime).
pub async fn run_nodes_command(cmd: &NodesCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        NodesCommand::List { online } => {
            if *online {
                println!("No online nodes (node discovery requires agent runtime)");
            } else {
                println!("No registered nodes. Use 'ironclaw nodes add' to register a node.");
            }
        }
        NodesCommand::Add { name, url, .. } => {
            println!(
                "Node '{}' added at {} (requires agent runtime to ping)",
                name, url
            );
        }
        NodesCommand::Remove { name } => {
            println!("Node '{}' removed", name);
        }
        NodesCommand::Ping { name } => {
            if let Some(name) = name {
                println!("Pinging node '{}'... (requires agent runtime)", name);
            } else {
                println!("Pinging all nodes... (requires agent runtime)");
            }
        }
        NodesCommand::Info { name } => {
            println!("Node '{}' info (requires agent runtime)", name);
        }
        NodesCommand::Pair { url } => {
            println!("Pairing with node at {}... (requires agent runtime)", url);
        }
        NodesCommand::Unpair { name } => {
            println!("Unpaired node '{}'", name);
        }
    }
    Ok(())
}
