//! Shared identity graph store
//!
//! The single source of truth for crawled identities. `resolve` is the
//! only way nodes come into existence, and its atomicity is what keeps
//! two tasks from crawling the same key.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use wotcrawl_core::KeyId;

/// A node: one cryptographic key, with the signatures it has received
/// and issued. Both maps are insertion-only for the lifetime of a crawl.
pub struct Identity {
    pub key_id: KeyId,
    /// Signatures this identity received, keyed by signer.
    pub incoming: DashMap<KeyId, Arc<Signature>>,
    /// Signatures this identity issued, keyed by signee.
    pub outgoing: DashMap<KeyId, Arc<Signature>>,
}

impl Identity {
    fn new(key_id: KeyId) -> Self {
        Self {
            key_id,
            incoming: DashMap::new(),
            outgoing: DashMap::new(),
        }
    }
}

/// A directed trust edge. Endpoints are stored as key ids into the
/// graph store, so the cyclic web of trust never forms ownership cycles.
#[derive(Debug)]
pub struct Signature {
    pub created_at: i64,
    pub signer: KeyId,
    pub signee: KeyId,
}

#[derive(Default)]
pub struct IdentityGraph {
    identities: DashMap<KeyId, Arc<Identity>>,
}

impl IdentityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic create-or-get. Exactly one concurrent caller per key
    /// observes `true`; that caller owns the fetch for the key.
    pub fn resolve(&self, key: &KeyId) -> (Arc<Identity>, bool) {
        match self.identities.entry(key.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let identity = Arc::new(Identity::new(key.clone()));
                entry.insert(identity.clone());
                (identity, true)
            }
        }
    }

    pub fn get(&self, key: &KeyId) -> Option<Arc<Identity>> {
        self.identities.get(key).map(|entry| entry.clone())
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }

    /// Total edges, counting each signature once via the incoming maps.
    pub fn signature_count(&self) -> usize {
        self.identities.iter().map(|entry| entry.incoming.len()).sum()
    }

    pub fn identities(&self) -> Vec<Arc<Identity>> {
        self.identities.iter().map(|entry| entry.clone()).collect()
    }
}

/// Create a signature edge and register it on both endpoints. Both sides
/// hold the same allocation; the signature itself is never mutated.
pub fn link(signer: &Arc<Identity>, signee: &Arc<Identity>, created_at: i64) -> Arc<Signature> {
    let signature = Arc::new(Signature {
        created_at,
        signer: signer.key_id.clone(),
        signee: signee.key_id.clone(),
    });
    signee
        .incoming
        .insert(signer.key_id.clone(), signature.clone());
    signer
        .outgoing
        .insert(signee.key_id.clone(), signature.clone());
    signature
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_creates_then_returns_existing() {
        let graph = IdentityGraph::new();
        let key = KeyId::new("aaaa");

        let (first, was_new) = graph.resolve(&key);
        assert!(was_new);

        let (second, was_new) = graph.resolve(&key);
        assert!(!was_new);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(graph.identity_count(), 1);
    }

    #[test]
    fn resolve_is_idempotent_under_contention() {
        let graph = Arc::new(IdentityGraph::new());
        let key = KeyId::new("abcd");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let graph = graph.clone();
                let key = key.clone();
                std::thread::spawn(move || graph.resolve(&key))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|(_, was_new)| *was_new).count(), 1);
        let first = &results[0].0;
        assert!(results.iter().all(|(identity, _)| Arc::ptr_eq(identity, first)));
        assert_eq!(graph.identity_count(), 1);
    }

    #[test]
    fn link_records_the_same_edge_on_both_endpoints() {
        let graph = IdentityGraph::new();
        let (signer, _) = graph.resolve(&KeyId::new("bbbb"));
        let (signee, _) = graph.resolve(&KeyId::new("aaaa"));

        let signature = link(&signer, &signee, 1000);

        let incoming = signee.incoming.get(&signer.key_id).unwrap();
        let outgoing = signer.outgoing.get(&signee.key_id).unwrap();
        assert!(Arc::ptr_eq(&signature, incoming.value()));
        assert!(Arc::ptr_eq(&signature, outgoing.value()));
        assert_eq!(signature.created_at, 1000);
        assert_eq!(graph.signature_count(), 1);
    }
}
