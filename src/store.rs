//! Persisted bridge state contract.
//!
//! The bridge shares three kinds of cross-request state: session bindings,
//! the per-channel allowlist, and pending pairing requests. [`BridgeStore`]
//! is the narrow read/write contract over that state; the storage engine
//! behind it is external to the core. [`MemoryStore`] is the in-process
//! implementation used by default and by tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::channels::ChannelName;
use crate::error::StoreError;

/// A `(channel, peer) → agent session` binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBindingRecord {
    pub channel: ChannelName,
    pub peer_key: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// A pending, owner-approvable access grant request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingRequest {
    pub channel: ChannelName,
    pub access_key: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PairingRequest {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Narrow persistence contract shared by the pipeline services.
///
/// All operations are single reads or writes; no method holds a lock across
/// another store call.
#[async_trait]
pub trait BridgeStore: Send + Sync {
    async fn get_session(
        &self,
        channel: ChannelName,
        peer_key: &str,
    ) -> Result<Option<SessionBindingRecord>, StoreError>;

    /// Persist a new binding. Rebinding a conversation means writing a new
    /// record; bindings are never mutated in place.
    async fn bind_session(
        &self,
        channel: ChannelName,
        peer_key: &str,
        session_id: &str,
    ) -> Result<(), StoreError>;

    async fn delete_session(&self, channel: ChannelName, peer_key: &str)
        -> Result<(), StoreError>;

    async fn is_allowed(&self, channel: ChannelName, access_key: &str)
        -> Result<bool, StoreError>;

    async fn allow(&self, channel: ChannelName, access_key: &str) -> Result<(), StoreError>;

    async fn create_pairing_request(
        &self,
        channel: ChannelName,
        access_key: &str,
        code: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Unexpired pending request for this sender, if any.
    async fn get_pairing_request(
        &self,
        channel: ChannelName,
        access_key: &str,
    ) -> Result<Option<PairingRequest>, StoreError>;

    /// All unexpired pending requests for a channel.
    async fn list_pairing_requests(
        &self,
        channel: ChannelName,
    ) -> Result<Vec<PairingRequest>, StoreError>;

    async fn delete_pairing_request(
        &self,
        channel: ChannelName,
        access_key: &str,
    ) -> Result<(), StoreError>;

    /// Drop expired pairing requests.
    async fn prune_pairing_requests(&self) -> Result<(), StoreError>;
}

/// In-memory store backed by `RwLock` maps.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<(ChannelName, String), SessionBindingRecord>>,
    allowlist: RwLock<HashMap<ChannelName, Vec<String>>>,
    pairing: RwLock<HashMap<(ChannelName, String), PairingRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the allowlist from configuration at startup.
    pub async fn seed_allowlist<I: IntoIterator<Item = String>>(
        &self,
        channel: ChannelName,
        entries: I,
    ) {
        let mut allowlist = self.allowlist.write().await;
        let list = allowlist.entry(channel).or_default();
        for entry in entries {
            if !list.contains(&entry) {
                list.push(entry);
            }
        }
    }
}

#[async_trait]
impl BridgeStore for MemoryStore {
    async fn get_session(
        &self,
        channel: ChannelName,
        peer_key: &str,
    ) -> Result<Option<SessionBindingRecord>, StoreError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&(channel, peer_key.to_string())).cloned())
    }

    async fn bind_session(
        &self,
        channel: ChannelName,
        peer_key: &str,
        session_id: &str,
    ) -> Result<(), StoreError> {
        let record = SessionBindingRecord {
            channel,
            peer_key: peer_key.to_string(),
            session_id: session_id.to_string(),
            created_at: Utc::now(),
        };
        self.sessions
            .write()
            .await
            .insert((channel, peer_key.to_string()), record);
        Ok(())
    }

    async fn delete_session(
        &self,
        channel: ChannelName,
        peer_key: &str,
    ) -> Result<(), StoreError> {
        self.sessions
            .write()
            .await
            .remove(&(channel, peer_key.to_string()));
        Ok(())
    }

    async fn is_allowed(
        &self,
        channel: ChannelName,
        access_key: &str,
    ) -> Result<bool, StoreError> {
        let allowlist = self.allowlist.read().await;
        Ok(allowlist
            .get(&channel)
            .is_some_and(|list| list.iter().any(|entry| entry == access_key)))
    }

    async fn allow(&self, channel: ChannelName, access_key: &str) -> Result<(), StoreError> {
        let mut allowlist = self.allowlist.write().await;
        let list = allowlist.entry(channel).or_default();
        if !list.iter().any(|entry| entry == access_key) {
            list.push(access_key.to_string());
        }
        Ok(())
    }

    async fn create_pairing_request(
        &self,
        channel: ChannelName,
        access_key: &str,
        code: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let request = PairingRequest {
            channel,
            access_key: access_key.to_string(),
            code: code.to_string(),
            created_at: now,
            expires_at: now + ttl,
        };
        self.pairing
            .write()
            .await
            .insert((channel, access_key.to_string()), request);
        Ok(())
    }

    async fn get_pairing_request(
        &self,
        channel: ChannelName,
        access_key: &str,
    ) -> Result<Option<PairingRequest>, StoreError> {
        let pairing = self.pairing.read().await;
        let now = Utc::now();
        Ok(pairing
            .get(&(channel, access_key.to_string()))
            .filter(|request| !request.is_expired(now))
            .cloned())
    }

    async fn list_pairing_requests(
        &self,
        channel: ChannelName,
    ) -> Result<Vec<PairingRequest>, StoreError> {
        let pairing = self.pairing.read().await;
        let now = Utc::now();
        let mut requests: Vec<PairingRequest> = pairing
            .values()
            .filter(|request| request.channel == channel && !request.is_expired(now))
            .cloned()
            .collect();
        requests.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.access_key.cmp(&b.access_key))
        });
        Ok(requests)
    }

    async fn delete_pairing_request(
        &self,
        channel: ChannelName,
        access_key: &str,
    ) -> Result<(), StoreError> {
        self.pairing
            .write()
            .await
            .remove(&(channel, access_key.to_string()));
        Ok(())
    }

    async fn prune_pairing_requests(&self) -> Result<(), StoreError> {
        let now = Utc::now();
        self.pairing
            .write()
            .await
            .retain(|_, request| !request.is_expired(now));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_binding_roundtrip() {
        let store = MemoryStore::new();
        assert!(store
            .get_session(ChannelName::Telegram, "peer-1")
            .await
            .unwrap()
            .is_none());

        store
            .bind_session(ChannelName::Telegram, "peer-1", "ses_a")
            .await
            .unwrap();
        let record = store
            .get_session(ChannelName::Telegram, "peer-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.session_id, "ses_a");

        store
            .delete_session(ChannelName::Telegram, "peer-1")
            .await
            .unwrap();
        assert!(store
            .get_session(ChannelName::Telegram, "peer-1")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_allowlist_is_per_channel() {
        let store = MemoryStore::new();
        store.allow(ChannelName::Slack, "U1").await.unwrap();
        assert!(store.is_allowed(ChannelName::Slack, "U1").await.unwrap());
        assert!(!store.is_allowed(ChannelName::Discord, "U1").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_pairing_request_is_invisible() {
        let store = MemoryStore::new();
        store
            .create_pairing_request(ChannelName::Discord, "u1", "123456", Duration::seconds(-1))
            .await
            .unwrap();
        assert!(store
            .get_pairing_request(ChannelName::Discord, "u1")
            .await
            .unwrap()
            .is_none());
        assert!(store
            .list_pairing_requests(ChannelName::Discord)
            .await
            .unwrap()
            .is_empty());

        store.prune_pairing_requests().await.unwrap();
        assert!(store.pairing.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_orders_by_creation() {
        let store = MemoryStore::new();
        for key in ["a", "b", "c"] {
            store
                .create_pairing_request(ChannelName::Qq, key, "000000", Duration::hours(1))
                .await
                .unwrap();
        }
        let listed = store.list_pairing_requests(ChannelName::Qq).await.unwrap();
        let keys: Vec<&str> = listed.iter().map(|r| r.access_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }
}
