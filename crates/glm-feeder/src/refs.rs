//! Numeric object references.
//!
//! Older models write objects as `object node:13 { ... }` and refer to them as
//! `node:13`. GridLAB-D handles that, but nothing downstream does.

use std::collections::HashMap;

use glm_core::{Entry, GlmTree, LeafKind};
use tracing::info;

/// Rewrite `object CLASS:N` headers to `object CLASS`, naming unnamed ones
/// `CLASS_N`, and repoint every top-level attribute that held the old
/// `CLASS:N` reference. Returns the number of objects rewritten.
pub fn remove_number_refs(tree: &mut GlmTree) -> usize {
    // old reference -> new name
    let mut renames: HashMap<String, String> = HashMap::new();

    for leaf in tree.leaves_mut() {
        let Some(numbered) = leaf.class().filter(|class| class.contains(':')).map(str::to_string)
        else {
            continue;
        };
        let base = numbered.split(':').next().unwrap_or_default().to_string();
        if leaf.name().is_none() {
            leaf.set_attr("name", numbered.replace(':', "_"));
        }
        let name = leaf.name().unwrap_or_default().to_string();
        leaf.set_kind(LeafKind::Object { class: base });
        renames.insert(numbered, name);
    }

    if renames.is_empty() {
        return 0;
    }
    for leaf in tree.leaves_mut() {
        for entry in leaf.entries_mut() {
            if let Entry::Attribute { value, .. } = entry {
                if let Some(name) = renames.get(value.as_str()) {
                    *value = name.clone();
                }
            }
        }
    }
    info!(rewritten = renames.len(), "removed numeric references");
    renames.len()
}
