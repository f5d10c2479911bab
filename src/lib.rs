//! chatbridge connects external chat channels to a single AI-agent backend.
//!
//! Nine channels (Telegram, WhatsApp, Slack, Discord, Feishu, DingTalk,
//! Email, MoChat, QQ) are normalized by adapters into one inbound shape; the
//! core then runs a fixed pipeline per message:
//!
//! ```text
//! adapter ─> dedup ─> access control ─> slash commands ─> session binding
//!                                                              │
//!          streamed edits <─ coordinator <─ agent events <─ run
//! ```
//!
//! Access control supports open, allowlist, pairing, and disabled policies
//! per channel. Each `(channel, conversation)` pair is bound to one agent
//! session, runs are serialized per session, and channels that can edit a
//! sent message get debounced live-streamed replies.
//!
//! Wire adapters and the agent backend client live outside this crate;
//! embedders implement [`channels::Adapter`] and [`agent::AgentRuntime`] and
//! hand them to [`bridge::Bridge`].

pub mod agent;
pub mod bridge;
pub mod channels;
pub mod cli;
pub mod config;
pub mod error;
pub mod store;
pub mod stream;

pub use bridge::{Bridge, BridgeBuilder};
pub use config::{AccessPolicy, Config};
pub use error::{Error, Result};
