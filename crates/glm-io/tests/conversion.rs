//! File-level load/dump and GLM/OMD conversion.

use std::fs;
use std::path::PathBuf;

use glm_core::{GlmTree, WriteOptions};
use glm_io::*;
use tempfile::tempdir;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .canonicalize()
        .expect("repo root should exist")
}

fn sample_path(name: &str) -> PathBuf {
    repo_root().join("test_data/glm").join(name)
}

#[test]
fn load_and_dump_glm() {
    let tree = load_glm(&sample_path("simple_system.glm")).expect("load sample");
    assert_eq!(tree.len(), 17);

    let dir = tempdir().expect("tmp dir");
    let out = dir.path().join("nested/out.glm");
    dump_glm(&tree, &out, &WriteOptions::default()).expect("dump");
    let reloaded = load_glm(&out).expect("reload");
    assert!(tree.eq_ignoring_ids(&reloaded));
}

#[test]
fn load_errors_name_the_file() {
    let missing = sample_path("does_not_exist.glm");
    let err = load_glm(&missing).unwrap_err();
    assert!(format!("{err:#}").contains("does_not_exist.glm"));

    let err = load_glm(&sample_path("unbalanced.glm")).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("parsing GLM file"));
    assert!(message.contains("never closed"));
}

#[test]
fn lenient_dump_reports_skipped_blocks() {
    let tree = load_glm(&sample_path("unrecognized.glm")).expect("load");
    let dir = tempdir().expect("tmp dir");
    let out = dir.path().join("out.glm");
    assert!(dump_glm(&tree, &out, &WriteOptions::default()).is_err());

    let diagnostics = dump_glm_lenient(&tree, &out, &WriteOptions::default()).expect("dump");
    assert_eq!(diagnostics.error_count(), 1);
    let text = fs::read_to_string(&out).unwrap();
    assert!(!text.contains("instance"));
}

#[test]
fn glm_to_omd_and_back() {
    let dir = tempdir().expect("tmp dir");
    let weather = dir.path().join("weather.csv");
    fs::write(&weather, "temperature,humidity\n70,0.4\n").unwrap();

    let omd_path = dir.path().join("feeder.omd");
    let doc = glm_to_omd(&sample_path("simple_system.glm"), &omd_path, &[weather]).expect("to omd");
    assert_eq!(doc.attachments.len(), 1);

    let text = fs::read_to_string(&omd_path).unwrap();
    assert!(text.contains("\"layoutVars\""));
    assert!(text.contains("\"omfEmbeddedConfigObject\": \"configuration object underground_line_configuration\""));

    let out_dir = dir.path().join("unpacked");
    let glm_path = omd_to_glm(&omd_path, &out_dir).expect("to glm");
    assert_eq!(glm_path, out_dir.join("feeder.glm"));
    assert_eq!(
        fs::read_to_string(out_dir.join("weather.csv")).unwrap(),
        "temperature,humidity\n70,0.4\n"
    );

    let original = load_glm(&sample_path("simple_system.glm")).unwrap();
    let round_tripped = load_glm(&glm_path).unwrap();
    assert!(original.eq_ignoring_ids(&round_tripped));
}

#[test]
fn omd_round_trip_preserves_tree() {
    let tree = load_glm(&sample_path("simple_system.glm")).unwrap();
    let dir = tempdir().expect("tmp dir");
    let path = dir.path().join("feeder.omd");
    save_omd(&OmdDocument::new(tree.clone()), &path).unwrap();
    let doc = load_omd(&path).unwrap();
    assert_eq!(doc.tree, tree);
    assert_eq!(doc.layout_vars, LayoutVars::default());
}

#[test]
fn load_feeder_dispatches_on_extension() {
    let doc = load_feeder(&sample_path("simple_system.glm"), &[]).unwrap();
    assert_eq!(doc.tree.len(), 17);

    let dir = tempdir().expect("tmp dir");
    let path = dir.path().join("feeder.omd");
    let tree = GlmTree::parse("object node { name n1; };").unwrap();
    save_omd(&OmdDocument::new(tree), &path).unwrap();
    let doc = load_feeder(&path, &[]).unwrap();
    assert_eq!(doc.tree.leaves()[0].name(), Some("n1"));

    assert!(load_feeder(&dir.path().join("feeder.txt"), &[]).is_err());
}
