//! wotcrawl - breadth-first web-of-trust crawler
//!
//! Crawls a public-key directory from a start key, recording who signed
//! whom, then writes the finished graph as .dot and .wot files.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use wotcrawl_core::config::DEFAULT_SEARCH_URL;
use wotcrawl_core::{CrawlConfig, KeyId};
use wotcrawl_crawler::export::{write_graph_files, ExportMeta};
use wotcrawl_crawler::names::resolve_labels;
use wotcrawl_crawler::{run_crawl, Outcome};
use wotcrawl_directory::KeyserverDirectory;

#[derive(Parser)]
#[command(
    name = "wotcrawl",
    about = "Breadth-first web-of-trust crawler for public-key directories",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Key id the crawl starts from
    #[arg(long, default_value = "373002372679ae34")]
    start_key: String,

    /// Maximum signer-chain distance from the start key
    #[arg(long, default_value_t = 4)]
    depth: u32,

    /// Assign display names from --names-file instead of raw key ids
    #[arg(long, default_value_t = false)]
    use_names: bool,

    /// Display-name list, one name per line
    #[arg(long, default_value = "names.txt")]
    names_file: PathBuf,

    /// Search endpoint; the key id is appended verbatim
    #[arg(long, default_value = DEFAULT_SEARCH_URL)]
    search_url: String,

    /// Maximum simultaneous outbound fetches
    #[arg(long, default_value_t = 50)]
    fetch_concurrency: usize,

    /// HTTP connect timeout in seconds
    #[arg(long, default_value_t = 10)]
    connect_timeout_secs: u64,

    /// HTTP read timeout in seconds
    #[arg(long, default_value_t = 20)]
    read_timeout_secs: u64,

    /// Non-success responses tolerated per fetch before giving up
    #[arg(long, default_value_t = 5)]
    retries: u32,

    /// Supervisor poll interval in seconds
    #[arg(long, default_value_t = 1)]
    poll_secs: u64,

    /// Seconds of unchanged in-flight count before the crawl is declared hung
    #[arg(long, default_value_t = 60)]
    stall_secs: u64,

    /// Additional key ids that never become nodes (repeatable)
    #[arg(long = "ignore", value_name = "KEY_ID")]
    ignored: Vec<String>,
}

impl Cli {
    fn into_config(self) -> CrawlConfig {
        let mut ignored_keys = CrawlConfig::default().ignored_keys;
        ignored_keys.extend(self.ignored.into_iter().map(KeyId::new));

        CrawlConfig {
            start_key: KeyId::new(self.start_key),
            max_depth: self.depth,
            use_names: self.use_names,
            names_file: self.names_file,
            search_url: self.search_url,
            fetch_concurrency: self.fetch_concurrency,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
            retry_limit: self.retries,
            poll_interval: Duration::from_secs(self.poll_secs),
            stall_timeout: Duration::from_secs(self.stall_secs),
            ignored_keys,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wotcrawl=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.into_config();
    config.validate()?;

    let directory = Arc::new(KeyserverDirectory::from_config(&config)?);

    info!(
        "crawling from {} to depth {}",
        config.start_key, config.max_depth
    );
    let run = run_crawl(&config, directory).await;

    if run.outcome == Outcome::Stalled {
        warn!("crawl was cancelled after stalling; exporting the partial graph");
    }

    info!("done crawling, creating graph files");
    let labels = resolve_labels(&run.graph, config.use_names, &config.names_file);
    let start_label = labels
        .get(&config.start_key)
        .cloned()
        .unwrap_or_else(|| config.start_key.to_string());

    let meta = ExportMeta {
        generated_at: chrono::Utc::now(),
        elapsed_secs: run.elapsed.as_secs(),
        start_label,
        depth: config.max_depth,
    };
    write_graph_files(&run.graph, &labels, &meta);

    info!(
        "created {} identities and {} signatures in {} seconds",
        run.graph.identity_count(),
        run.graph.signature_count(),
        run.elapsed.as_secs()
    );
    Ok(())
}
