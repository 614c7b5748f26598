//! Directory trait

use crate::packets::SignaturePacket;
use wotcrawl_core::KeyId;

/// Result type for directory operations
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Directory error types
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("gave up after {attempts} non-success responses (last status {status})")]
    RetriesExhausted { attempts: u32, status: u16 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// What a directory lookup produced for one key.
#[derive(Debug)]
pub enum FetchOutcome {
    /// The key exists; these are its signature packets.
    Found(Vec<SignaturePacket>),
    /// The directory has no record of the key.
    NotFound,
}

/// Directory trait
#[async_trait::async_trait]
pub trait Directory: Send + Sync {
    /// Fetch and decode the signature packets recorded for `key`.
    async fn fetch(&self, key: &KeyId) -> DirectoryResult<FetchOutcome>;
}
