//! Display-name assignment for exported graphs

use crate::graph::IdentityGraph;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::error;
use wotcrawl_core::{KeyId, Result};

/// Load the display-name list, one name per line. Blank lines are
/// dropped.
pub fn load_names(path: &Path) -> Result<Vec<String>> {
    let raw = fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Assign exactly one label per identity: shuffled names handed out in
/// iteration order, key ids once the list runs out.
pub fn assign_labels(graph: &IdentityGraph, mut names: Vec<String>) -> HashMap<KeyId, String> {
    names.shuffle(&mut rand::thread_rng());

    let mut labels = HashMap::new();
    let mut pool = names.into_iter();
    for identity in graph.identities() {
        let label = pool
            .next()
            .unwrap_or_else(|| identity.key_id.as_str().to_string());
        labels.insert(identity.key_id.clone(), label);
    }
    labels
}

/// Labels for a finished crawl: names from `path` when enabled and
/// readable, raw key ids otherwise. An unreadable list degrades, it
/// never aborts the export.
pub fn resolve_labels(graph: &IdentityGraph, use_names: bool, path: &Path) -> HashMap<KeyId, String> {
    let names = if use_names {
        match load_names(path) {
            Ok(names) => names,
            Err(e) => {
                error!("could not read name list {}: {}", path.display(), e);
                Vec::new()
            }
        }
    } else {
        Vec::new()
    };
    assign_labels(graph, names)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_with(keys: &[&str]) -> IdentityGraph {
        let graph = IdentityGraph::new();
        for key in keys {
            graph.resolve(&KeyId::new(*key));
        }
        graph
    }

    #[test]
    fn every_identity_gets_exactly_one_label() {
        let graph = graph_with(&["aaaa", "bbbb", "cccc"]);
        let labels = assign_labels(&graph, vec!["alice".into(), "bob".into(), "carol".into()]);
        assert_eq!(labels.len(), 3);

        let mut assigned: Vec<_> = labels.values().cloned().collect();
        assigned.sort();
        assert_eq!(assigned, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn key_ids_fill_in_when_names_run_out() {
        let graph = graph_with(&["aaaa", "bbbb"]);
        let labels = assign_labels(&graph, vec!["alice".into()]);
        assert_eq!(labels.len(), 2);
        assert!(labels.values().any(|label| label == "alice"));
        assert!(labels
            .iter()
            .any(|(key, label)| label == key.as_str()));
    }

    #[test]
    fn empty_name_list_falls_back_to_key_ids() {
        let graph = graph_with(&["aaaa"]);
        let labels = assign_labels(&graph, Vec::new());
        assert_eq!(labels[&KeyId::new("aaaa")], "aaaa");
    }

    #[test]
    fn load_names_drops_blank_lines() {
        let dir = std::env::temp_dir().join(format!(
            "wotcrawl-names-test-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("names.txt");
        fs::write(&path, "alice\n\n  bob  \n").unwrap();

        let names = load_names(&path).unwrap();
        assert_eq!(names, vec!["alice", "bob"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_list_degrades_to_key_ids() {
        let graph = graph_with(&["aaaa"]);
        let labels = resolve_labels(&graph, true, Path::new("/nonexistent/names.txt"));
        assert_eq!(labels[&KeyId::new("aaaa")], "aaaa");
    }
}
