//! Crawl configuration

use crate::error::{Error, Result};
use crate::types::KeyId;
use std::path::PathBuf;
use std::time::Duration;

/// Default search endpoint; the key id is appended verbatim.
pub const DEFAULT_SEARCH_URL: &str =
    "https://keyserver-elasticsearch.daylightpirates.org/keyserver/_search?q=key_id:";

/// Everything a crawl run needs to know up front. The shared state
/// built from this (graph store, governor, in-flight tracker) is
/// constructed once, before the root task is submitted.
#[derive(Clone, Debug)]
pub struct CrawlConfig {
    /// Key the crawl starts from.
    pub start_key: KeyId,

    /// Maximum signer-chain distance from the start key.
    pub max_depth: u32,

    /// Assign display names from `names_file` instead of raw key ids.
    pub use_names: bool,

    /// One display name per line.
    pub names_file: PathBuf,

    /// Search endpoint; the key id is appended verbatim.
    pub search_url: String,

    /// Cap on simultaneous outbound fetches, independent of task fan-out.
    pub fetch_concurrency: usize,

    pub connect_timeout: Duration,
    pub read_timeout: Duration,

    /// Non-success responses tolerated per fetch before giving up.
    pub retry_limit: u32,

    /// Supervisor poll interval.
    pub poll_interval: Duration,

    /// How long the in-flight count may stay unchanged before the crawl
    /// is declared hung and cancelled.
    pub stall_timeout: Duration,

    /// Keys that never become nodes (administrative / non-identity keys).
    pub ignored_keys: Vec<KeyId>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_key: KeyId::new("373002372679ae34"),
            max_depth: 4,
            use_names: true,
            names_file: PathBuf::from("names.txt"),
            search_url: DEFAULT_SEARCH_URL.to_string(),
            fetch_concurrency: 50,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(20),
            retry_limit: 5,
            poll_interval: Duration::from_secs(1),
            stall_timeout: Duration::from_secs(60),
            ignored_keys: vec![KeyId::new("d2bb0d0165d0fd58")], // CACert
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.start_key.as_str().is_empty() {
            return Err(Error::Config("start key must not be empty".into()));
        }
        if self.fetch_concurrency == 0 {
            return Err(Error::Config("fetch concurrency must be at least 1".into()));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(CrawlConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_start_key_rejected() {
        let config = CrawlConfig {
            start_key: KeyId::new(""),
            ..CrawlConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = CrawlConfig {
            fetch_concurrency: 0,
            ..CrawlConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
