//! The recursive crawl task
//!
//! One task per key. The task that wins the store insertion fetches the
//! key's signature packets, binds already-known signers, spawns tasks
//! for unknown ones while depth remains, joins them, then records its
//! edges. Every failure mode degrades to "fewer edges" - a task never
//! fails its parent.

use crate::governor::{ActiveTasks, Governor, TaskGuard};
use crate::graph::{link, Identity, IdentityGraph};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use wotcrawl_core::KeyId;
use wotcrawl_directory::{Directory, FetchOutcome, SignaturePacket};

/// Process-scoped state shared by every crawl task. Constructed once,
/// before the root submission; no ambient globals.
pub struct CrawlContext {
    pub graph: Arc<IdentityGraph>,
    pub directory: Arc<dyn Directory>,
    pub governor: Arc<Governor>,
    pub active: Arc<ActiveTasks>,
    pub ignored: HashSet<KeyId>,
    pub cancel: CancellationToken,
}

/// Register the task in the in-flight set and submit it. Registration
/// happens before the spawn, so the supervisor can never observe a
/// running-but-uncounted task.
pub fn spawn_crawl(
    ctx: Arc<CrawlContext>,
    key: KeyId,
    remaining_depth: i32,
) -> JoinHandle<Option<Arc<Identity>>> {
    let guard = ctx.active.register();
    tokio::spawn(crawl_task(ctx, key, remaining_depth, guard))
}

async fn crawl_task(
    ctx: Arc<CrawlContext>,
    key: KeyId,
    remaining_depth: i32,
    guard: TaskGuard,
) -> Option<Arc<Identity>> {
    // Deregisters on every exit path.
    let _guard = guard;

    if ctx.ignored.contains(&key) {
        debug!("skipping ignored key {}", key);
        return None;
    }

    let (identity, was_new) = ctx.graph.resolve(&key);
    if !was_new {
        // Another task owns this key; nothing left to do here.
        return Some(identity);
    }

    let packets = match fetch_packets(&ctx, &key).await {
        Some(packets) => packets,
        // Edges abandoned; the bare node stays valid.
        None => return Some(identity),
    };

    let issuers = issuer_packets(&key, &packets);
    if issuers.is_empty() {
        // Dead end - nothing signed this key.
        return Some(identity);
    }

    // Bind signers that already exist; spawn tasks for unknown ones
    // while depth remains. Issuers past the depth boundary are omitted
    // entirely, placeholder-free.
    let mut bound: Vec<(Arc<Identity>, &SignaturePacket)> = Vec::new();
    let mut pending: Vec<(JoinHandle<Option<Arc<Identity>>>, &SignaturePacket)> = Vec::new();
    for (issuer, packet) in issuers {
        if let Some(existing) = ctx.graph.get(&issuer) {
            bound.push((existing, packet));
        } else if remaining_depth >= 0 {
            pending.push((spawn_crawl(ctx.clone(), issuer, remaining_depth - 1), packet));
        }
    }

    let (handles, packets_for_handles): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
    for (joined, packet) in futures::future::join_all(handles)
        .await
        .into_iter()
        .zip(packets_for_handles)
    {
        match joined {
            Ok(Some(signer)) => bound.push((signer, packet)),
            // An ignored or failed child just contributes no edge.
            Ok(None) => {}
            Err(e) => debug!("a signer task for {} did not finish: {}", key, e),
        }
    }

    for (signer, packet) in bound {
        match packet.creation_time() {
            Some(created_at) => {
                link(&signer, &identity, created_at);
            }
            // Undated signature: the edge is skipped.
            None => debug!(
                "signature from {} on {} has no creation time",
                signer.key_id, key
            ),
        }
    }

    Some(identity)
}

/// Fetch the key's packets under a governor slot. Any failure - slot
/// wait cancelled, transport error, retries exhausted, no such key -
/// resolves to `None` and the caller keeps a bare node.
async fn fetch_packets(ctx: &CrawlContext, key: &KeyId) -> Option<Vec<SignaturePacket>> {
    let _slot = tokio::select! {
        slot = ctx.governor.acquire_fetch_slot() => slot,
        _ = ctx.cancel.cancelled() => {
            debug!("cancelled while waiting for a fetch slot for {}", key);
            return None;
        }
    };

    let outcome = tokio::select! {
        outcome = ctx.directory.fetch(key) => outcome,
        _ = ctx.cancel.cancelled() => {
            debug!("fetch for {} cancelled", key);
            return None;
        }
    };

    match outcome {
        Ok(FetchOutcome::Found(packets)) => Some(packets),
        Ok(FetchOutcome::NotFound) => {
            debug!("no directory entry for key {}", key);
            None
        }
        Err(e) => {
            warn!("giving up on signatures for {}: {}", key, e);
            None
        }
    }
}

/// Deduplicated issuer -> representative packet map. The first packet
/// naming an issuer wins; self-signatures are dropped.
fn issuer_packets<'a>(
    subject: &KeyId,
    packets: &'a [SignaturePacket],
) -> HashMap<KeyId, &'a SignaturePacket> {
    let mut issuers: HashMap<KeyId, &SignaturePacket> = HashMap::new();
    for packet in packets {
        let Some(issuer) = packet.issuer() else {
            continue;
        };
        if issuer == subject.as_str() {
            continue;
        }
        issuers.entry(KeyId::new(issuer)).or_insert(packet);
    }
    issuers
}

#[cfg(test)]
mod tests {
    use super::*;
    use wotcrawl_directory::{signature_packet, Subpacket};

    #[test]
    fn self_signatures_are_dropped() {
        let subject = KeyId::new("aaaa");
        let packets = vec![
            signature_packet("aaaa", Some(1)),
            signature_packet("bbbb", Some(2)),
        ];
        let issuers = issuer_packets(&subject, &packets);
        assert_eq!(issuers.len(), 1);
        assert!(issuers.contains_key(&KeyId::new("bbbb")));
    }

    #[test]
    fn first_packet_per_issuer_wins() {
        let subject = KeyId::new("aaaa");
        let packets = vec![
            signature_packet("bbbb", Some(100)),
            signature_packet("bbbb", Some(200)),
        ];
        let issuers = issuer_packets(&subject, &packets);
        assert_eq!(issuers.len(), 1);
        let packet = issuers[&KeyId::new("bbbb")];
        assert_eq!(packet.creation_time(), Some(100));
    }

    #[test]
    fn packets_without_issuer_are_skipped() {
        let subject = KeyId::new("aaaa");
        let packets = vec![SignaturePacket::new(vec![Subpacket::creation_time(5)])];
        assert!(issuer_packets(&subject, &packets).is_empty());
    }
}
