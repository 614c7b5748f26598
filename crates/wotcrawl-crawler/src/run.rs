//! Run-to-completion crawl orchestration

use crate::governor::{ActiveTasks, Governor};
use crate::graph::IdentityGraph;
use crate::supervisor::{supervise, Outcome};
use crate::task::{spawn_crawl, CrawlContext};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use wotcrawl_core::CrawlConfig;
use wotcrawl_directory::Directory;

/// Result of one crawl run: the finished (now-stable) graph plus how
/// the run ended and how long it took.
pub struct CrawlRun {
    pub graph: Arc<IdentityGraph>,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

/// Build the shared crawl state, submit the root task, and supervise
/// until quiescence or a forced stall shutdown.
pub async fn run_crawl(config: &CrawlConfig, directory: Arc<dyn Directory>) -> CrawlRun {
    let started = Instant::now();

    let graph = Arc::new(IdentityGraph::new());
    let active = Arc::new(ActiveTasks::new());
    let cancel = CancellationToken::new();
    let ctx = Arc::new(CrawlContext {
        graph: graph.clone(),
        directory,
        governor: Arc::new(Governor::new(config.fetch_concurrency)),
        active: active.clone(),
        ignored: config.ignored_keys.iter().cloned().collect(),
        cancel: cancel.clone(),
    });

    // The root starts one level down, exactly like every child it spawns.
    let root = spawn_crawl(ctx, config.start_key.clone(), config.max_depth as i32 - 1);

    let outcome = supervise(
        &active,
        &graph,
        &cancel,
        config.poll_interval,
        config.stall_timeout,
    )
    .await;

    // Reap the root task; after a cancellation it unwinds quickly.
    let _ = root.await;

    CrawlRun {
        graph,
        outcome,
        elapsed: started.elapsed(),
    }
}
