//! Text rendering of flattened lineage rows.

use std::fmt::Write;

use lineage_domain::{FlatRow, GraphNode, LineageTree, WalkOutcome};

/// Hex digits of a person hash shown in a row label.
const SHORT_HASH_DIGITS: usize = 10;

/// Shortens a person hash to `0x` plus its first hex digits.
pub fn short_hash(person_hash: &str) -> String {
    let digits = person_hash
        .strip_prefix("0x")
        .or_else(|| person_hash.strip_prefix("0X"))
        .unwrap_or(person_hash);
    let end = digits
        .char_indices()
        .nth(SHORT_HASH_DIGITS)
        .map_or(digits.len(), |(i, _)| i);
    format!("0x{}", &digits[..end])
}

fn label(node: &GraphNode) -> String {
    let mut label = format!("{} v{}", short_hash(&node.person_hash), node.version_index);
    if let Some(tag) = &node.tag {
        let _ = write!(label, " {}", tag);
    }
    label
}

/// Renders rows with box-drawing connectors, one line per row.
///
/// Rows must come from `flatten` on the same tree: pre-order, with depth
/// and `is_last` set.
pub fn render_tree(tree: &LineageTree, rows: &[FlatRow]) -> String {
    let mut out = String::new();
    // `is_last` of the open ancestors, indexed by depth.
    let mut open: Vec<bool> = Vec::new();

    for row in rows {
        open.truncate(row.depth);
        for ancestor_is_last in open.iter().skip(1) {
            out.push_str(if *ancestor_is_last { "   " } else { "│  " });
        }
        if row.depth > 0 {
            out.push_str(if row.is_last { "└─ " } else { "├─ " });
        }

        out.push_str(&label(&tree[row.id].node));
        if row.has_children && !row.expanded {
            let _ = write!(out, " [+{}]", tree.children(row.id).len());
        }
        out.push('\n');
        open.push(row.is_last);
    }
    out
}

/// One-line summary of a finished walk.
pub fn summary(outcome: &WalkOutcome) -> String {
    let metrics = &outcome.metrics;
    let mut line = format!(
        "{} nodes, {} visited, depth {}, children cache hit ratio {:.0}%",
        metrics.created,
        outcome.visited,
        metrics.depth,
        metrics.children_hit_ratio() * 100.0
    );
    if outcome.limit_reached {
        line.push_str(" (node limit reached)");
    }
    if outcome.partial {
        line.push_str(" (partial: some relation reads failed)");
    }
    line
}
