//! wotcrawl core - shared types, configuration, and error handling

pub mod config;
pub mod error;
pub mod types;

pub use config::CrawlConfig;
pub use error::{Error, Result};
pub use types::KeyId;
