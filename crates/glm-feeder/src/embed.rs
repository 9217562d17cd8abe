//! De-embedding: hoist nested objects to the top level.
//!
//! ```text
//! object house { name myhouse; object ZIPload { power 1; }; size 234sqft; };
//! ```
//! becomes
//! ```text
//! object house { name myhouse; size 234sqft; };
//! object ZIPload { power 1; parent myhouse; name myhouseZIPload1; };
//! ```
//!
//! Embedded configurations (`configuration object line_configuration { ... }`)
//! become named objects too, and the block inside the outer object is replaced,
//! at the same position, by an attribute referencing the new name.

use glm_core::{Entry, GlmError, GlmResult, GlmTree, Leaf, LeafKind};
use tracing::{debug, info};

/// Hoist nested objects and embedded configurations until nothing is left to
/// hoist, then order the top level by id. Returns how many leaves moved.
pub fn fully_de_embed(tree: &mut GlmTree) -> GlmResult<usize> {
    let mut total = 0;
    loop {
        let moved = de_embed_once(tree)?;
        if moved == 0 {
            break;
        }
        total += moved;
    }
    if total > 0 {
        tree.sort_by_id();
    }
    info!(hoisted = total, "de-embedded tree");
    Ok(total)
}

/// One level of hoisting. Children of hoisted leaves stay where they are
/// until the next pass.
pub fn de_embed_once(tree: &mut GlmTree) -> GlmResult<usize> {
    // Check everything first so a failure leaves the tree untouched.
    for leaf in tree.leaves() {
        if leaf.children().any(is_hoistable) && leaf.name().is_none() {
            return Err(GlmError::MissingAttribute {
                id: leaf.id(),
                key: "name".into(),
            });
        }
    }

    let mut hoisted = Vec::new();
    for leaf in tree.leaves_mut() {
        hoisted.extend(hoist_children(leaf));
    }
    let moved = hoisted.len();
    for leaf in hoisted {
        debug!(id = %leaf.id(), name = leaf.name().unwrap_or_default(), "hoisted");
        tree.push_leaf(leaf);
    }
    Ok(moved)
}

fn is_hoistable(leaf: &Leaf) -> bool {
    match leaf.kind() {
        LeafKind::Object { .. } => true,
        LeafKind::EmbeddedConfig { header } => config_header(header).is_some(),
        _ => false,
    }
}

/// `configuration object line_configuration` -> (`configuration`, `line_configuration`)
fn config_header(header: &str) -> Option<(String, String)> {
    let words: Vec<&str> = header.split_whitespace().collect();
    match words.as_slice() {
        [attr, _, class, ..] => Some((attr.to_string(), class.to_string())),
        _ => None,
    }
}

fn hoist_children(outer: &mut Leaf) -> Vec<Leaf> {
    let Some(outer_name) = outer.name().map(str::to_string) else {
        return Vec::new();
    };
    let entries = std::mem::take(outer.entries_mut());
    let mut kept: Vec<Entry> = Vec::with_capacity(entries.len());
    let mut hoisted = Vec::new();

    for entry in entries {
        let mut child = match entry {
            Entry::Child(child) if is_hoistable(&child) => child,
            other => {
                kept.push(other);
                continue;
            }
        };

        if let Some(class) = child.class().map(str::to_string) {
            child.set_attr("parent", outer_name.as_str());
            if child.name().is_none() {
                let name = format!("{outer_name}{class}{}", child.id().value());
                child.set_attr("name", name);
            }
        } else if let LeafKind::EmbeddedConfig { header } = child.kind() {
            let Some((attr, class)) = config_header(header) else {
                kept.push(Entry::Child(child));
                continue;
            };
            if child.name().is_none() {
                let name = format!("{outer_name}{class}{}", child.id().value());
                child.set_attr("name", name);
            }
            child.set_kind(LeafKind::Object { class });
            let name = child.name().unwrap_or_default().to_string();
            set_in_place(&mut kept, attr, name);
        }
        hoisted.push(child);
    }

    *outer.entries_mut() = kept;
    hoisted
}

/// Attribute set that keeps dictionary semantics: replace if present,
/// otherwise append at the current position.
fn set_in_place(entries: &mut Vec<Entry>, key: String, value: String) {
    for entry in entries.iter_mut() {
        if let Entry::Attribute { key: k, value: v } = entry {
            if *k == key {
                *v = value;
                return;
            }
        }
    }
    entries.push(Entry::Attribute { key, value });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hoists_nested_object_with_parent_and_name() {
        let mut tree = GlmTree::parse(
            "object house { name myhouse; object ZIPload { inductance bigind; power newpower; }; size 234sqft; };",
        )
        .unwrap();
        assert_eq!(fully_de_embed(&mut tree).unwrap(), 1);
        assert_eq!(tree.len(), 2);

        let house = &tree.leaves()[0];
        assert!(!house.has_children());
        let keys: Vec<&str> = house.attributes().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["name", "size"]);

        let zip = &tree.leaves()[1];
        assert_eq!(zip.class(), Some("ZIPload"));
        assert_eq!(zip.attr("parent"), Some("myhouse"));
        assert_eq!(zip.name(), Some("myhouseZIPload1"));
        assert_eq!(zip.attr("power"), Some("newpower"));
    }

    #[test]
    fn embedded_config_becomes_reference() {
        let mut tree = GlmTree::parse(
            "object overhead_line { name ol1; configuration object line_configuration { conductor_A c1; }; length 10; };",
        )
        .unwrap();
        fully_de_embed(&mut tree).unwrap();

        let line = &tree.leaves()[0];
        let attrs: Vec<(&str, &str)> = line.attributes().collect();
        assert_eq!(
            attrs,
            vec![
                ("name", "ol1"),
                ("configuration", "ol1line_configuration1"),
                ("length", "10")
            ]
        );
        let config = &tree.leaves()[1];
        assert_eq!(config.class(), Some("line_configuration"));
        assert_eq!(config.attr("conductor_A"), Some("c1"));
        assert_eq!(config.attr("parent"), None);
    }

    #[test]
    fn keeps_existing_names_and_repeats_until_flat() {
        let mut tree = GlmTree::parse(
            "object meter { name m1; object house { name h1; object ZIPload { name z1; }; }; };\n\
             object node { name after; };",
        )
        .unwrap();
        assert_eq!(fully_de_embed(&mut tree).unwrap(), 2);
        let names: Vec<&str> = tree.leaves().iter().filter_map(Leaf::name).collect();
        assert_eq!(names, vec!["m1", "h1", "z1", "after"]);
        assert_eq!(tree.find_by_name("z1").unwrap().attr("parent"), Some("h1"));
        assert!(tree.leaves().iter().all(|leaf| !leaf.has_children()));
        assert!(tree.to_glm_string().is_ok());
    }

    #[test]
    fn unnamed_outer_is_an_error_and_tree_is_untouched() {
        let source = "object house { object ZIPload { power 1; }; };";
        let mut tree = GlmTree::parse(source).unwrap();
        let before = tree.clone();
        let err = fully_de_embed(&mut tree).unwrap_err();
        assert!(matches!(err, GlmError::MissingAttribute { ref key, .. } if key == "name"));
        assert_eq!(tree, before);
    }

    #[test]
    fn flat_tree_is_unchanged() {
        let mut tree = GlmTree::parse("object node { name n1; };\nclock { x 1; };").unwrap();
        let before = tree.clone();
        assert_eq!(fully_de_embed(&mut tree).unwrap(), 0);
        assert_eq!(tree, before);
    }
}
