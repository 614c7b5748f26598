//! Graph serialization - dot and wot renderings
//!
//! Runs once, after the supervisor has declared the store stable. Edges
//! are walked through each identity's incoming map only, so every
//! signature is emitted exactly once.

use crate::graph::IdentityGraph;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use wotcrawl_core::KeyId;

/// Signatures made before 06/01/2014 00:00 UTC are drawn as older/weaker.
pub const LEGACY_CUTOFF: i64 = 1_401_580_800;

/// Header fields shared by both output formats.
pub struct ExportMeta {
    pub generated_at: DateTime<Utc>,
    pub elapsed_secs: u64,
    pub start_label: String,
    pub depth: u32,
}

fn header(graph: &IdentityGraph, meta: &ExportMeta) -> String {
    format!(
        "// Graph created on {} by wotcrawl in {} seconds, start node: {}, depth: {}, keys: {}, signatures: {}\n",
        meta.generated_at.to_rfc2822(),
        meta.elapsed_secs,
        meta.start_label,
        meta.depth,
        graph.identity_count(),
        graph.signature_count(),
    )
}

fn label<'a>(labels: &'a HashMap<KeyId, String>, key: &'a KeyId) -> &'a str {
    labels.get(key).map(String::as_str).unwrap_or(key.as_str())
}

/// Directed-graph description (graphviz dot), pre-cutoff edges marked
/// red and heavier.
pub fn render_dot(
    graph: &IdentityGraph,
    labels: &HashMap<KeyId, String>,
    meta: &ExportMeta,
) -> String {
    let mut out = header(graph, meta);
    out.push_str("digraph wot {\n");
    for identity in graph.identities() {
        for entry in identity.incoming.iter() {
            let signature = entry.value();
            out.push_str(&format!(
                "\t\"{}\" -> \"{}\"",
                label(labels, &signature.signer),
                label(labels, &signature.signee)
            ));
            if signature.created_at < LEGACY_CUTOFF {
                out.push_str("[color=red,penwidth=1.5]");
            }
            out.push_str(";\n");
        }
    }
    out.push('}');
    out
}

/// Adjacency-list text: one line per identity listing its incoming
/// edges, `=>` marking signatures older than the cutoff.
pub fn render_wot(
    graph: &IdentityGraph,
    labels: &HashMap<KeyId, String>,
    meta: &ExportMeta,
) -> String {
    let mut out = header(graph, meta);
    for identity in graph.identities() {
        for entry in identity.incoming.iter() {
            let signature = entry.value();
            let arrow = if signature.created_at < LEGACY_CUTOFF {
                "=>"
            } else {
                "->"
            };
            out.push_str(&format!(
                "{} {} {}, ",
                label(labels, &signature.signer),
                arrow,
                label(labels, &signature.signee)
            ));
        }
        out.push('\n');
    }
    out
}

/// Base file name embedding depth, start label, and a generation stamp.
pub fn base_file_name(depth: u32, start_label: &str) -> String {
    format!(
        "graph_depth-{}_start-{}_{}",
        depth,
        start_label,
        Utc::now().timestamp_millis()
    )
}

/// Write both renderings. A failed write is reported and that file
/// skipped; it never affects the other one.
pub fn write_graph_files(
    graph: &IdentityGraph,
    labels: &HashMap<KeyId, String>,
    meta: &ExportMeta,
) -> Vec<PathBuf> {
    let base = base_file_name(meta.depth, &meta.start_label);
    let renderings = [
        ("dot", render_dot(graph, labels, meta)),
        ("wot", render_wot(graph, labels, meta)),
    ];

    let mut written = Vec::new();
    for (suffix, contents) in renderings {
        let path = PathBuf::from(format!("{}.{}", base, suffix));
        match fs::write(&path, &contents) {
            Ok(()) => {
                info!("wrote {}", path.display());
                written.push(path);
            }
            Err(e) => error!("could not write {}: {}", path.display(), e),
        }
    }
    written
}
