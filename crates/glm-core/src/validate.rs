//! Post-parse reference checks.
//!
//! The tree builder accepts any string for `parent`, `from` and `to`. This
//! pass looks the values up against every `name` attribute in the tree,
//! nested blocks included, and reports what does not resolve. Nothing is
//! modified.

use std::collections::HashMap;

use crate::diagnostics::Diagnostics;
use crate::tree::GlmTree;

/// Attributes whose value names another object.
pub const REFERENCE_KEYS: [&str; 3] = ["parent", "from", "to"];

pub fn validate_references(tree: &GlmTree) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();

    let all = tree.iter_all();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for leaf in &all {
        if let Some(name) = leaf.attr("name") {
            *seen.entry(name).or_insert(0) += 1;
        }
    }
    let mut duplicates: Vec<(&str, usize)> = seen
        .iter()
        .filter(|(_, &count)| count > 1)
        .map(|(&name, &count)| (name, count))
        .collect();
    duplicates.sort_unstable();
    for (name, count) in duplicates {
        diagnostics.add_warning_with_entity(
            "duplicate",
            &format!("name '{name}' is defined {count} times"),
            name,
        );
    }

    for leaf in &all {
        for key in REFERENCE_KEYS {
            let Some(target) = leaf.attr(key) else {
                continue;
            };
            if seen.contains_key(target) {
                continue;
            }
            let entity = leaf
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| leaf.id().to_string());
            diagnostics.add_warning_with_entity(
                "reference",
                &format!("{key} '{target}' does not match any named object"),
                &entity,
            );
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_tree_has_no_issues() {
        let tree = GlmTree::parse(
            "object node { name n1; };\nobject load { name l1; parent n1; };\nobject overhead_line { from n1; to l1; };",
        )
        .unwrap();
        assert!(!validate_references(&tree).has_issues());
    }

    #[test]
    fn flags_dangling_references() {
        let tree = GlmTree::parse(
            "object load { name l1; parent ghost; };\nobject overhead_line { from l1; to nowhere; };",
        )
        .unwrap();
        let diagnostics = validate_references(&tree);
        assert_eq!(diagnostics.warning_count(), 2);
        let messages: Vec<&str> = diagnostics
            .issues_by_category("reference")
            .map(|i| i.message.as_str())
            .collect();
        assert!(messages[0].contains("parent 'ghost'"));
        assert!(messages[1].contains("to 'nowhere'"));
        assert_eq!(diagnostics.issues[1].entity.as_deref(), Some("#1"));
    }

    #[test]
    fn nested_names_resolve() {
        let tree = GlmTree::parse(
            "object house { name h1; object ZIPload { name z1; }; };\n\
             object recorder { parent z1; };\n\
             object overhead_line { from h1; to z1; object node { name inner; parent ghost; }; };",
        )
        .unwrap();
        let diagnostics = validate_references(&tree);
        assert_eq!(diagnostics.warning_count(), 1);
        assert!(diagnostics.issues[0].message.contains("parent 'ghost'"));
        assert_eq!(diagnostics.issues[0].entity.as_deref(), Some("inner"));
    }

    #[test]
    fn flags_duplicate_names() {
        let tree =
            GlmTree::parse("object node { name n1; };\nobject meter { name n1; };").unwrap();
        let diagnostics = validate_references(&tree);
        assert_eq!(diagnostics.issues_by_category("duplicate").count(), 1);
        assert!(!diagnostics.has_errors());
    }
}
