//! Scriptable in-memory directory for tests
//!
//! Mirrors the real client's contract without a network: each key id is
//! scripted with the outcome its fetch should produce, and calls are
//! counted so tests can assert that deduplication actually prevented
//! refetches.

use crate::packets::{SignaturePacket, Subpacket};
use crate::provider::{Directory, DirectoryError, DirectoryResult, FetchOutcome};
use std::collections::HashMap;
use std::sync::Mutex;
use wotcrawl_core::KeyId;

/// Scripted result of fetching one key.
#[derive(Clone, Debug)]
pub enum MockBehavior {
    /// The key exists with these signature packets.
    Found(Vec<SignaturePacket>),
    /// The directory reports zero hits.
    NotFound,
    /// The transport fails.
    Transport(String),
    /// The fetch never completes (wedged connection).
    Hang,
}

pub struct MockDirectory {
    behaviors: HashMap<KeyId, MockBehavior>,
    default_behavior: MockBehavior,
    calls: Mutex<HashMap<KeyId, u32>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
            default_behavior: MockBehavior::NotFound,
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Behavior for every key not scripted individually.
    pub fn with_default(mut self, behavior: MockBehavior) -> Self {
        self.default_behavior = behavior;
        self
    }

    /// Script the outcome for one key.
    pub fn key(mut self, key: impl Into<String>, behavior: MockBehavior) -> Self {
        self.behaviors.insert(KeyId::new(key), behavior);
        self
    }

    /// How many times `key` has been fetched.
    pub fn calls_for(&self, key: &KeyId) -> u32 {
        self.calls
            .lock()
            .map(|calls| calls.get(key).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Directory for MockDirectory {
    async fn fetch(&self, key: &KeyId) -> DirectoryResult<FetchOutcome> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(key.clone()).or_insert(0) += 1;
        }

        let behavior = self
            .behaviors
            .get(key)
            .unwrap_or(&self.default_behavior)
            .clone();
        match behavior {
            MockBehavior::Found(packets) => Ok(FetchOutcome::Found(packets)),
            MockBehavior::NotFound => Ok(FetchOutcome::NotFound),
            MockBehavior::Transport(message) => Err(DirectoryError::RequestFailed(message)),
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}

/// One signature packet naming `issuer`, optionally dated.
pub fn signature_packet(issuer: &str, creation_time: Option<i64>) -> SignaturePacket {
    let mut subpackets = vec![Subpacket::issuer(issuer)];
    if let Some(epoch_secs) = creation_time {
        subpackets.push(Subpacket::creation_time(epoch_secs));
    }
    SignaturePacket::new(subpackets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_key_overrides_default() {
        let mock = MockDirectory::new()
            .with_default(MockBehavior::Transport("down".into()))
            .key("aaaa", MockBehavior::Found(vec![signature_packet("bbbb", Some(7))]));

        let found = mock.fetch(&KeyId::new("aaaa")).await.unwrap();
        let FetchOutcome::Found(packets) = found else {
            panic!("expected Found");
        };
        assert_eq!(packets[0].issuer(), Some("bbbb"));

        let other = mock.fetch(&KeyId::new("zzzz")).await;
        assert!(matches!(other, Err(DirectoryError::RequestFailed(_))));
    }

    #[tokio::test]
    async fn calls_are_counted_per_key() {
        let mock = MockDirectory::new();
        let key = KeyId::new("aaaa");
        assert_eq!(mock.calls_for(&key), 0);
        let _ = mock.fetch(&key).await;
        let _ = mock.fetch(&key).await;
        assert_eq!(mock.calls_for(&key), 2);
    }
}
