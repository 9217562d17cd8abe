//! Parse/serialize round trips over the shared GLM samples.

use std::fs;
use std::path::PathBuf;

use glm_core::*;

fn sample(name: &str) -> String {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let path = manifest_dir.join("../../test_data/glm").join(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}

fn object_attribute_lines(tree: &GlmTree) -> Vec<(String, String, String)> {
    let mut lines = Vec::new();
    for leaf in tree.iter_all() {
        if let Some(class) = leaf.class() {
            for (key, value) in leaf.attributes() {
                lines.push((class.to_string(), key.to_string(), value.to_string()));
            }
        }
    }
    lines
}

#[test]
fn concrete_house_scenario() {
    let tree = GlmTree::parse("object house { name h1; floor_area 1500; };").unwrap();
    assert_eq!(tree.len(), 1);
    let house = &tree.leaves()[0];
    assert_eq!(house.field("object"), Some("house"));
    assert_eq!(house.attr("name"), Some("h1"));
    assert_eq!(house.attr("floor_area"), Some("1500"));

    let text = write(&tree).unwrap();
    let reparsed = GlmTree::parse(&text).unwrap();
    assert_eq!(tree, reparsed);
}

#[test]
fn unbalanced_braces_are_rejected() {
    let err = GlmTree::parse("object house { name h1;").unwrap_err();
    assert!(err.is_parse_error());
    let err = GlmTree::parse(&sample("unbalanced.glm")).unwrap_err();
    assert!(matches!(err, GlmError::UnclosedBlock { line: 5, .. }));
}

#[test]
fn sample_feeder_round_trips() {
    let tree = GlmTree::parse(&sample("simple_system.glm")).unwrap();
    let text = write(&tree).unwrap();
    let reparsed = GlmTree::parse(&text).unwrap();
    assert!(tree.eq_ignoring_ids(&reparsed));

    // Writing again is a fixed point.
    assert_eq!(write(&reparsed).unwrap(), text);
}

#[test]
fn sample_feeder_block_counts_survive() {
    let tree = GlmTree::parse(&sample("simple_system.glm")).unwrap();
    let counts = tree.counts();
    assert_eq!(counts.directives, 4);
    assert_eq!(counts.clocks, 1);
    assert_eq!(counts.modules, 2);
    assert_eq!(counts.objects, 10);
    assert_eq!(counts.embedded_configs, 1);
    assert_eq!(counts.schedules, 1);
    assert_eq!(tree.len(), 17);

    let reparsed = GlmTree::parse(&write(&tree).unwrap()).unwrap();
    assert_eq!(reparsed.counts(), counts);
}

#[test]
fn object_attributes_are_preserved() {
    let tree = GlmTree::parse(&sample("simple_system.glm")).unwrap();
    let reparsed = GlmTree::parse(&write(&tree).unwrap()).unwrap();
    assert_eq!(object_attribute_lines(&tree), object_attribute_lines(&reparsed));

    let house = tree.find_by_name("house_1").unwrap();
    assert_eq!(house.attr("floor_area"), Some("1500"));
    let load = tree.find_by_name("load_4").unwrap();
    assert_eq!(load.attr("constant_power_B"), Some("1000+200j"));
}

#[test]
fn comments_are_stripped_and_urls_kept() {
    let text = sample("simple_system.glm");
    let tokens = tokenize(&text);
    assert!(!tokens.iter().any(|t| t.as_str().contains("feet")));
    assert!(!tokens.iter().any(|t| t.as_str() == "Small"));
    assert!(tokens.iter().any(|t| t.as_str()
        == "stylesheet=http://gridlab-d.svn.sourceforge.net/viewvc/gridlab-d/trunk/core/gridlabd-2_0"));

    let tree = GlmTree::parse(&text).unwrap();
    let out = write(&tree).unwrap();
    assert!(out.contains("#set stylesheet=http://gridlab-d.svn.sourceforge.net/viewvc/gridlab-d/trunk/core/gridlabd-2_0;"));
}

#[test]
fn inserted_leaves_get_fresh_ids_and_serialize() {
    let mut tree = GlmTree::parse(&sample("simple_system.glm")).unwrap();
    let before = tree.max_id().unwrap();
    let id = tree.push(
        LeafKind::Object {
            class: "recorder".into(),
        },
        [("parent", "meter_3"), ("property", "measured_power"), ("file", "meter.csv")],
    );
    assert!(id > before);
    assert_eq!(tree.max_id(), Some(id));

    let text = write(&tree).unwrap();
    assert!(text.ends_with("object recorder {\n\tparent meter_3;\n\tproperty measured_power;\n\tfile meter.csv;\n};\n\n"));
}

#[test]
fn unrecognized_blocks_fail_strict_write_only() {
    let tree = GlmTree::parse(&sample("unrecognized.glm")).unwrap();
    assert!(matches!(
        write(&tree),
        Err(GlmError::UnrecognizedBlock { .. })
    ));

    let mut diagnostics = Diagnostics::new();
    let text = write_lenient(&tree, &WriteOptions::default(), &mut diagnostics);
    assert_eq!(diagnostics.error_count(), 1);
    assert_eq!(text, "module tape;\n\nobject node {\n\tname n1;\n};\n\n");
}

#[test]
fn sample_references_resolve() {
    let tree = GlmTree::parse(&sample("simple_system.glm")).unwrap();
    let diagnostics = validate_references(&tree);
    assert!(!diagnostics.has_issues(), "{diagnostics}");
}

#[test]
fn sample_graph_is_connected() {
    let tree = GlmTree::parse(&sample("simple_system.glm")).unwrap();
    let graph = FeederGraph::from_tree(&tree);
    let stats = graph_stats(&graph).unwrap();
    // line_configuration lc_300 is a named non-link object, so it stands alone.
    assert_eq!(stats.connected_components, 2);
    assert!(graph.contains("house_1", "meter_3"));
    assert!(graph.contains("node_2", "load_4"));
}
