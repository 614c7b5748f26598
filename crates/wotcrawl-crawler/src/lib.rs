//! wotcrawl crawler engine - graph store, crawl tasks, supervision, export

pub mod export;
pub mod governor;
pub mod graph;
pub mod names;
pub mod run;
pub mod supervisor;
pub mod task;

pub use graph::{Identity, IdentityGraph, Signature};
pub use run::{run_crawl, CrawlRun};
pub use supervisor::Outcome;
pub use task::{spawn_crawl, CrawlContext};
