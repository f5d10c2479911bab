//! Owner-side pairing administration.
//!
//! Pairing requests are created by the inbound access layer when an unknown
//! sender contacts a channel in pairing mode. The owner reviews them here and
//! approves or denies by code, out of band from the chat itself.

use anyhow::bail;
use chrono::Utc;
use clap::Subcommand;

use crate::channels::ChannelName;
use crate::store::{BridgeStore, PairingRequest};

#[derive(Debug, Clone, Subcommand)]
pub enum PairingCommand {
    /// List pending pairing requests
    List {
        /// Only show requests for one channel
        #[arg(long)]
        channel: Option<ChannelName>,
    },
    /// Approve a pending request by code, moving the sender onto the allowlist
    Approve {
        /// The 6-digit code shown to the requester
        code: String,
        /// Disambiguate when the same code is pending on several channels
        #[arg(long)]
        channel: Option<ChannelName>,
    },
    /// Deny a pending request by code
    Deny {
        /// The 6-digit code shown to the requester
        code: String,
        /// Disambiguate when the same code is pending on several channels
        #[arg(long)]
        channel: Option<ChannelName>,
    },
}

pub async fn run_pairing_command(
    store: &dyn BridgeStore,
    command: PairingCommand,
) -> anyhow::Result<()> {
    store.prune_pairing_requests().await?;

    match command {
        PairingCommand::List { channel } => {
            let requests = collect_requests(store, channel).await?;
            if requests.is_empty() {
                println!("No pending pairing requests.");
                return Ok(());
            }
            println!("Pending pairing requests:");
            let now = Utc::now();
            for request in requests {
                let minutes_left = (request.expires_at - now).num_minutes().max(0);
                println!(
                    "  {}  {}  {}  expires in {}m",
                    request.channel, request.code, request.access_key, minutes_left
                );
            }
            Ok(())
        }
        PairingCommand::Approve { code, channel } => {
            let request = find_by_code(store, &code, channel).await?;
            store.allow(request.channel, &request.access_key).await?;
            store
                .delete_pairing_request(request.channel, &request.access_key)
                .await?;
            println!("Approved {} on {}", request.access_key, request.channel.label());
            Ok(())
        }
        PairingCommand::Deny { code, channel } => {
            let request = find_by_code(store, &code, channel).await?;
            store
                .delete_pairing_request(request.channel, &request.access_key)
                .await?;
            println!("Denied {} on {}", request.access_key, request.channel.label());
            Ok(())
        }
    }
}

async fn collect_requests(
    store: &dyn BridgeStore,
    channel: Option<ChannelName>,
) -> anyhow::Result<Vec<PairingRequest>> {
    let channels: Vec<ChannelName> = match channel {
        Some(channel) => vec![channel],
        None => ChannelName::ALL.to_vec(),
    };
    let mut requests = Vec::new();
    for channel in channels {
        requests.extend(store.list_pairing_requests(channel).await?);
    }
    Ok(requests)
}

/// Resolve a code to exactly one pending request.
///
/// Codes are random per request, but nothing stops the same code from being
/// pending on two channels at once, so an ambiguous match requires `--channel`.
async fn find_by_code(
    store: &dyn BridgeStore,
    code: &str,
    channel: Option<ChannelName>,
) -> anyhow::Result<PairingRequest> {
    let mut matches: Vec<PairingRequest> = collect_requests(store, channel)
        .await?
        .into_iter()
        .filter(|request| request.code == code)
        .collect();

    match matches.len() {
        0 => bail!("Pairing code not found or expired."),
        1 => Ok(matches.remove(0)),
        _ => bail!("Code {code} is pending on more than one channel. Pass --channel to pick one."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    async fn store_with_request(channel: ChannelName, key: &str, code: &str) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .create_pairing_request(channel, key, code, Duration::seconds(3600))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_approve_moves_key_onto_allowlist() {
        let store = store_with_request(ChannelName::Telegram, "tg:42", "123456").await;

        run_pairing_command(
            &store,
            PairingCommand::Approve {
                code: "123456".to_string(),
                channel: None,
            },
        )
        .await
        .unwrap();

        assert!(store
            .is_allowed(ChannelName::Telegram, "tg:42")
            .await
            .unwrap());
        assert_eq!(
            store
                .get_pairing_request(ChannelName::Telegram, "tg:42")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_approve_unknown_code_fails() {
        let store = store_with_request(ChannelName::Telegram, "tg:42", "123456").await;

        let err = run_pairing_command(
            &store,
            PairingCommand::Approve {
                code: "999999".to_string(),
                channel: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "Pairing code not found or expired.");
    }

    #[tokio::test]
    async fn test_approve_ambiguous_code_requires_channel() {
        let store = store_with_request(ChannelName::Telegram, "tg:42", "123456").await;
        store
            .create_pairing_request(
                ChannelName::Slack,
                "U042",
                "123456",
                Duration::seconds(3600),
            )
            .await
            .unwrap();

        let err = run_pairing_command(
            &store,
            PairingCommand::Approve {
                code: "123456".to_string(),
                channel: None,
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Pass --channel"));

        // Scoping to one channel resolves it.
        run_pairing_command(
            &store,
            PairingCommand::Approve {
                code: "123456".to_string(),
                channel: Some(ChannelName::Slack),
            },
        )
        .await
        .unwrap();
        assert!(store.is_allowed(ChannelName::Slack, "U042").await.unwrap());
        assert!(!store
            .is_allowed(ChannelName::Telegram, "tg:42")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_deny_removes_request_without_allowing() {
        let store = store_with_request(ChannelName::WhatsApp, "+15550001111", "654321").await;

        run_pairing_command(
            &store,
            PairingCommand::Deny {
                code: "654321".to_string(),
                channel: None,
            },
        )
        .await
        .unwrap();

        assert!(!store
            .is_allowed(ChannelName::WhatsApp, "+15550001111")
            .await
            .unwrap());
        assert_eq!(
            store
                .get_pairing_request(ChannelName::WhatsApp, "+15550001111")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_expired_requests_are_invisible() {
        let store = MemoryStore::new();
        store
            .create_pairing_request(
                ChannelName::Email,
                "owner@example.com",
                "111222",
                Duration::seconds(-1),
            )
            .await
            .unwrap();

        let err = run_pairing_command(
            &store,
            PairingCommand::Approve {
                code: "111222".to_string(),
                channel: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Pairing code not found or expired.");
    }
}
