//! Keyserver-backed directory client

use crate::packets::SearchResponse;
use crate::provider::{Directory, DirectoryError, DirectoryResult, FetchOutcome};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use wotcrawl_core::{CrawlConfig, KeyId};

pub struct KeyserverDirectory {
    client: Client,
    search_url: String,
    retry_limit: u32,
}

impl KeyserverDirectory {
    pub fn new(
        search_url: impl Into<String>,
        connect_timeout: Duration,
        read_timeout: Duration,
        retry_limit: u32,
    ) -> DirectoryResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()?;
        Ok(Self {
            client,
            search_url: search_url.into(),
            retry_limit,
        })
    }

    pub fn from_config(config: &CrawlConfig) -> DirectoryResult<Self> {
        Self::new(
            config.search_url.clone(),
            config.connect_timeout,
            config.read_timeout,
            config.retry_limit,
        )
    }
}

#[async_trait::async_trait]
impl Directory for KeyserverDirectory {
    async fn fetch(&self, key: &KeyId) -> DirectoryResult<FetchOutcome> {
        let url = format!("{}{}", self.search_url, key);

        let mut attempts = 0;
        let response = loop {
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if status.is_success() {
                break response;
            }
            attempts += 1;
            if attempts > self.retry_limit {
                return Err(DirectoryError::RetriesExhausted {
                    attempts,
                    status: status.as_u16(),
                });
            }
            debug!(
                "search for {} returned {}, retrying ({}/{})",
                key, status, attempts, self.retry_limit
            );
        };

        let body = response.text().await?;
        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| DirectoryError::InvalidResponse(e.to_string()))?;
        interpret(parsed, key)
    }
}

/// Turn a decoded search response into a fetch outcome. Zero hits mean
/// the key does not exist; more than one hit is ambiguous and the first
/// one is used deterministically.
fn interpret(response: SearchResponse, key: &KeyId) -> DirectoryResult<FetchOutcome> {
    if response.hits.total < 1 {
        return Ok(FetchOutcome::NotFound);
    }
    if response.hits.total > 1 {
        warn!("multiple hits for key {}, using the first one", key);
    }

    let Some(hit) = response.hits.hits.into_iter().next() else {
        return Err(DirectoryError::InvalidResponse(
            "positive hit count but empty hit list".into(),
        ));
    };

    Ok(FetchOutcome::Found(hit.source.signature_packets()))
}
