//! Channel layer: the normalized contract between wire adapters and the
//! bridge core.
//!
//! ```text
//! wire protocol ──> Adapter ──> InboundMessage ──> InboundPipeline
//!                      ▲                                │
//!                      └──── OutboundDispatcher <───────┘
//! ```
//!
//! Concrete wire adapters (sockets, webhooks, poll loops) live outside the
//! core; they implement [`Adapter`] and feed [`InboundMessage`] values into
//! the pipeline.

mod adapter;
pub mod dedup;
pub mod identity;
mod outbound;
mod typing;

pub use adapter::{
    Adapter, AdapterCapabilities, AdapterMap, ChannelName, InboundMessage, OutboundKind,
    ProgressReceipt, SendOptions,
};
pub use dedup::{DedupWindow, InboundDeduper};
pub use identity::{resolve_access_identity, AccessIdentity, AccessKey, SessionKey};
pub use outbound::OutboundDispatcher;
pub use typing::{TypingManager, TYPING_INTERVAL};
