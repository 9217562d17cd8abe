//! Contiguous line merging.
//!
//! ```text
//! top line --to--> node <--from-- bottom line
//! ```
//! When nothing else hangs off `node`, the bottom line leaves it through
//! `from` and both lines share a configuration, the pair collapses into the
//! top line.

use glm_core::{GlmTree, Leaf, LeafId};
use tracing::{debug, info};

struct Merge {
    top: LeafId,
    node: LeafId,
    bottom: LeafId,
    length: f64,
    to: String,
}

fn attaches_to(leaf: &Leaf, node: &str) -> bool {
    ["from", "parent", "to"]
        .into_iter()
        .any(|key| leaf.attr(key) == Some(node))
}

fn length_of(leaf: &Leaf) -> Option<f64> {
    leaf.attr("length")?.trim().parse().ok()
}

fn plan(tree: &GlmTree, top: &Leaf) -> Option<Merge> {
    let node = tree.find_by_name(top.attr("to")?)?;
    let node_name = node.name()?;

    let mut attached = tree
        .leaves()
        .iter()
        .filter(|leaf| leaf.id() != top.id() && attaches_to(leaf, node_name));
    let bottom = attached.next()?;
    if attached.next().is_some() || bottom.attr("from") != Some(node_name) {
        return None;
    }

    let configuration = top.attr("configuration")?;
    if bottom.attr("configuration") != Some(configuration) {
        return None;
    }
    let length = length_of(top)? + length_of(bottom)?;
    Some(Merge {
        top: top.id(),
        node: node.id(),
        bottom: bottom.id(),
        length,
        to: bottom.attr("to")?.to_string(),
    })
}

fn merge_once(tree: &mut GlmTree) -> usize {
    let order: Vec<LeafId> = tree.leaves().iter().rev().map(Leaf::id).collect();
    let mut merged = 0;

    for id in order {
        let Some(merge) = tree
            .leaves()
            .iter()
            .find(|leaf| leaf.id() == id)
            .and_then(|top| plan(tree, top))
        else {
            continue;
        };
        if let Some(top) = tree.leaves_mut().iter_mut().find(|leaf| leaf.id() == merge.top) {
            top.set_attr("length", format!("{:?}", merge.length));
            top.set_attr("to", merge.to.as_str());
        }
        tree.remove(merge.node);
        tree.remove(merge.bottom);
        debug!(top = %merge.top, node = %merge.node, bottom = %merge.bottom, "merged lines");
        merged += 1;
    }
    merged
}

/// Merge line pairs across pass-through nodes until no pair qualifies.
/// Returns the number of merges; each removes one node and one line.
pub fn merge_contig_lines(tree: &mut GlmTree) -> usize {
    let mut total = 0;
    loop {
        let merged = merge_once(tree);
        if merged == 0 {
            break;
        }
        total += merged;
    }
    info!(merged = total, remaining = tree.len(), "merged contiguous lines");
    total
}
