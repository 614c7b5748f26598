//! Termination and hang supervision
//!
//! A network-bound recursive fan-out has no natural "done" signal other
//! than the in-flight set draining, and a connection that neither
//! completes nor times out must not hang the process forever. The
//! supervisor polls the in-flight count: quiescence means completion, a
//! count frozen past the stall timeout means a hung crawl that gets
//! force-cancelled.

use crate::governor::ActiveTasks;
use crate::graph::IdentityGraph;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How a crawl ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The in-flight set drained on its own.
    Complete,
    /// The in-flight count froze past the stall timeout and the crawl
    /// was force-cancelled.
    Stalled,
}

/// Stall bookkeeping, separated from the poll loop so the thresholds
/// are testable without clocks.
#[derive(Debug)]
pub struct StallTracker {
    last_active: usize,
    unchanged_polls: u32,
}

impl StallTracker {
    pub fn new() -> Self {
        Self {
            last_active: 0,
            unchanged_polls: 0,
        }
    }

    /// Feed one poll observation; returns the number of consecutive
    /// unchanged polls including this one.
    pub fn observe(&mut self, active: usize) -> u32 {
        if active != self.last_active {
            self.last_active = active;
            self.unchanged_polls = 0;
        } else {
            self.unchanged_polls += 1;
        }
        self.unchanged_polls
    }
}

impl Default for StallTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `unchanged_polls` at `poll_interval` add up to a stall.
pub fn is_stalled(unchanged_polls: u32, poll_interval: Duration, stall_timeout: Duration) -> bool {
    poll_interval * unchanged_polls > stall_timeout
}

/// Poll until the crawl drains or stalls. On a stall the shared token
/// is cancelled, which makes in-flight fetches give up promptly; the
/// store stays valid either way, partially crawled nodes included.
pub async fn supervise(
    active: &ActiveTasks,
    graph: &IdentityGraph,
    cancel: &CancellationToken,
    poll_interval: Duration,
    stall_timeout: Duration,
) -> Outcome {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut tracker = StallTracker::new();

    loop {
        interval.tick().await;

        let in_flight = active.count();
        if in_flight == 0 {
            info!(
                "crawl quiescent, {} identities resolved",
                graph.identity_count()
            );
            return Outcome::Complete;
        }

        let unchanged = tracker.observe(in_flight);
        let unchanged_for = poll_interval * unchanged;
        if is_stalled(unchanged, poll_interval, stall_timeout) {
            warn!(
                "no progress for {:?} with {} tasks in flight, cancelling the crawl",
                unchanged_for, in_flight
            );
            cancel.cancel();
            return Outcome::Stalled;
        }

        if unchanged_for * 2 > stall_timeout {
            warn!(
                "in-flight count stuck at {} for {:?}, cancelling in {:?}",
                in_flight,
                unchanged_for,
                stall_timeout.saturating_sub(unchanged_for)
            );
        } else {
            info!(
                "in flight: {} / discovered: {}",
                in_flight,
                graph.identity_count() + in_flight
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_resets_on_change() {
        let mut tracker = StallTracker::new();
        assert_eq!(tracker.observe(5), 0);
        assert_eq!(tracker.observe(5), 1);
        assert_eq!(tracker.observe(5), 2);
        assert_eq!(tracker.observe(3), 0);
        assert_eq!(tracker.observe(3), 1);
    }

    #[test]
    fn stall_trips_just_past_the_timeout() {
        let poll = Duration::from_secs(1);
        let timeout = Duration::from_secs(60);
        assert!(!is_stalled(59, poll, timeout));
        assert!(!is_stalled(60, poll, timeout));
        assert!(is_stalled(61, poll, timeout));
    }

    #[test]
    fn stall_scales_with_poll_interval() {
        let poll = Duration::from_millis(500);
        let timeout = Duration::from_secs(60);
        assert!(!is_stalled(120, poll, timeout));
        assert!(is_stalled(121, poll, timeout));
    }
}
