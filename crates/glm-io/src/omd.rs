//! OMD feeder documents.
//!
//! An `.omd` file is JSON: a keyed copy of the GLM tree plus layout
//! settings for the web editor and any attached files (player CSVs,
//! weather data) the model `#include`s.
//!
//! ```json
//! {
//!     "links": [], "hiddenLinks": [], "nodes": [], "hiddenNodes": [],
//!     "layoutVars": {"theta": "0.8", "gravity": "0.01", ...},
//!     "tree": {
//!         "0": {"omftype": "#set", "argument": "minimum_timestep=60"},
//!         "1": {"object": "house", "name": "h1", "2": {"object": "ZIPload"}}
//!     },
//!     "attachments": {"weather.csv": "..."}
//! }
//! ```
//!
//! Inside `tree` every leaf is an object keyed by its id. The block type is
//! carried by a marker key: `omftype` + `argument` for directives (and for
//! `class` blocks), `module`, `clock`, `object` (`object: schedule` plus
//! `cron` for schedules) and `omfEmbeddedConfigObject`. Any other string
//! value is an attribute; any object value is a nested leaf. Entry order is
//! significant and is kept in both directions.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use glm_core::{writer, Entry, GlmError, GlmResult, GlmTree, Leaf, LeafId, LeafKind};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{self, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

const OMFTYPE: &str = "omftype";
const ARGUMENT: &str = "argument";
const EMBEDDED: &str = "omfEmbeddedConfigObject";
const CRON: &str = "cron";

/// Force-layout settings stored alongside the tree. Values are strings, as
/// the web editor writes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutVars {
    pub theta: String,
    pub gravity: String,
    pub friction: String,
    pub link_strength: String,
    pub link_distance: String,
    pub charge: String,
}

impl Default for LayoutVars {
    fn default() -> Self {
        Self {
            theta: "0.8".into(),
            gravity: "0.01".into(),
            friction: "0.9".into(),
            link_strength: "5".into(),
            link_distance: "5".into(),
            charge: "-5".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OmdDocument {
    #[serde(default)]
    pub links: Vec<Value>,
    #[serde(default)]
    pub hidden_links: Vec<Value>,
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub hidden_nodes: Vec<Value>,
    #[serde(default)]
    pub layout_vars: LayoutVars,
    #[serde(with = "keyed_tree")]
    pub tree: GlmTree,
    /// File name to file contents
    #[serde(default)]
    pub attachments: BTreeMap<String, String>,
}

impl OmdDocument {
    /// Empty wireframe around `tree`.
    pub fn new(tree: GlmTree) -> Self {
        Self {
            tree,
            ..Self::default()
        }
    }

    /// Attach files by base name.
    pub fn attach_files(&mut self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow!("attachment path has no file name: {}", path.display()))?;
            let contents = fs::read_to_string(path)
                .with_context(|| format!("reading attachment: {}", path.display()))?;
            self.attachments.insert(name.to_string(), contents);
        }
        Ok(())
    }
}

/// Serialize a tree to the keyed JSON shape used under `"tree"`.
pub fn tree_to_json(tree: &GlmTree) -> Result<String> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(
        &mut out,
        serde_json::ser::PrettyFormatter::with_indent(b"    "),
    );
    keyed_tree::serialize(tree, &mut ser)?;
    Ok(String::from_utf8(out)?)
}

/// Parse the keyed JSON tree shape back into a tree.
pub fn tree_from_json(text: &str) -> Result<GlmTree> {
    let mut de = serde_json::Deserializer::from_str(text);
    let tree = keyed_tree::deserialize(&mut de)?;
    de.end()?;
    Ok(tree)
}

pub fn load_omd(path: &Path) -> Result<OmdDocument> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading OMD file: {}", path.display()))?;
    let doc: OmdDocument = serde_json::from_str(&text)
        .with_context(|| format!("parsing OMD file: {}", path.display()))?;
    debug!(
        path = %path.display(),
        leaves = doc.tree.len(),
        attachments = doc.attachments.len(),
        "loaded OMD"
    );
    Ok(doc)
}

/// Write a document as JSON with four-space indentation.
pub fn save_omd(doc: &OmdDocument, path: &Path) -> Result<()> {
    let mut out = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(
        &mut out,
        serde_json::ser::PrettyFormatter::with_indent(b"    "),
    );
    doc.serialize(&mut ser)
        .with_context(|| format!("serializing OMD for {}", path.display()))?;
    fs::write(path, out).with_context(|| format!("writing OMD file: {}", path.display()))?;
    info!(path = %path.display(), "wrote OMD");
    Ok(())
}

/// Parse a GLM file and save it, with attachments, as an OMD document.
pub fn glm_to_omd(glm_path: &Path, omd_path: &Path, attachments: &[PathBuf]) -> Result<OmdDocument> {
    let tree = crate::glm::load_glm(glm_path)?;
    let mut doc = OmdDocument::new(tree);
    doc.attach_files(attachments)?;
    save_omd(&doc, omd_path)?;
    Ok(doc)
}

/// Where an attachment called `name` lands inside `dir`. Only a bare file
/// name is accepted, so a document cannot write outside `dir`.
pub fn attachment_target(dir: &Path, name: &str) -> Result<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(file)), None) => Ok(dir.join(file)),
        _ => bail!("attachment name is not a plain file name: {name:?}"),
    }
}

/// Write `doc` as the GLM file `glm_path`, sorted by id, with every
/// attachment beside it. Attachment names are checked before anything is
/// written.
pub fn unpack_omd(doc: &OmdDocument, glm_path: &Path) -> Result<()> {
    let dir = match glm_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let targets = doc
        .attachments
        .iter()
        .map(|(name, contents)| Ok((attachment_target(dir, name)?, contents)))
        .collect::<Result<Vec<_>>>()?;
    let text = writer::write_sorted(&doc.tree)
        .with_context(|| format!("serializing tree for {}", glm_path.display()))?;

    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    for (target, contents) in targets {
        fs::write(&target, contents)
            .with_context(|| format!("writing attachment: {}", target.display()))?;
    }
    fs::write(glm_path, text)
        .with_context(|| format!("writing GLM file: {}", glm_path.display()))?;
    info!(path = %glm_path.display(), attachments = doc.attachments.len(), "unpacked OMD");
    Ok(())
}

/// Unpack an OMD document into `out_dir` as `<stem>.glm` plus its
/// attachments. Returns the GLM path.
pub fn omd_to_glm(omd_path: &Path, out_dir: &Path) -> Result<PathBuf> {
    let doc = load_omd(omd_path)?;
    let stem = omd_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("OMD path has no file name: {}", omd_path.display()))?;
    let glm_path = out_dir.join(format!("{stem}.glm"));
    unpack_omd(&doc, &glm_path)?;
    Ok(glm_path)
}

/// `#[serde(with)]` adapter between [`GlmTree`] and the keyed JSON shape.
pub mod keyed_tree {
    use super::*;

    pub fn serialize<S: Serializer>(tree: &GlmTree, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(tree.len()))?;
        for leaf in tree.leaves() {
            map.serialize_entry(&leaf.id().value().to_string(), &KeyedLeaf(leaf))?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<GlmTree, D::Error> {
        let raw = RawValue::deserialize(deserializer)?;
        tree_from_raw(raw).map_err(de::Error::custom)
    }
}

struct KeyedLeaf<'a>(&'a Leaf);

impl Serialize for KeyedLeaf<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let leaf = self.0;
        let mut map = serializer.serialize_map(None)?;
        match leaf.kind() {
            LeafKind::Directive { keyword, argument } => {
                map.serialize_entry(OMFTYPE, keyword)?;
                map.serialize_entry(ARGUMENT, argument)?;
            }
            LeafKind::Module { name } => map.serialize_entry("module", name)?,
            LeafKind::Clock => map.serialize_entry("clock", "clock")?,
            LeafKind::Object { class } => map.serialize_entry("object", class)?,
            LeafKind::EmbeddedConfig { header } => map.serialize_entry(EMBEDDED, header)?,
            LeafKind::Schedule { name, body } => {
                map.serialize_entry("object", "schedule")?;
                map.serialize_entry("name", name)?;
                map.serialize_entry(CRON, body)?;
            }
            LeafKind::Class { name, body } => {
                map.serialize_entry(OMFTYPE, &format!("class {name}"))?;
                map.serialize_entry(ARGUMENT, &format!("{{\n{body}\n}}"))?;
            }
            LeafKind::Other { .. } | LeafKind::Anonymous => {
                return Err(ser::Error::custom(GlmError::UnrecognizedBlock {
                    id: leaf.id(),
                    description: leaf.kind().describe(),
                }));
            }
        }
        for entry in leaf.entries() {
            match entry {
                Entry::Attribute { key, value } => map.serialize_entry(key, value)?,
                Entry::Child(child) => {
                    map.serialize_entry(&child.id().value().to_string(), &KeyedLeaf(child))?
                }
            }
        }
        map.end()
    }
}

/// Order-preserving view of arbitrary JSON: strings (and scalars, rendered
/// as text) or objects.
#[derive(Debug)]
enum RawValue {
    Text(String),
    Block(Vec<(String, RawValue)>),
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawVisitor)
    }
}

struct RawVisitor;

impl<'de> Visitor<'de> for RawVisitor {
    type Value = RawValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a string, number or object")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<RawValue, E> {
        Ok(RawValue::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<RawValue, E> {
        Ok(RawValue::Text(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<RawValue, E> {
        Ok(RawValue::Text(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<RawValue, E> {
        Ok(RawValue::Text(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<RawValue, E> {
        Ok(RawValue::Text(v.to_string()))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<RawValue, E> {
        Ok(RawValue::Text(v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Text(String::new()))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RawValue, A::Error> {
        let mut entries = Vec::new();
        while let Some((key, value)) = access.next_entry::<String, RawValue>()? {
            entries.push((key, value));
        }
        Ok(RawValue::Block(entries))
    }
}

fn tree_from_raw(raw: RawValue) -> GlmResult<GlmTree> {
    let RawValue::Block(entries) = raw else {
        return Err(GlmError::InvalidArgument(
            "feeder tree must be a JSON object".into(),
        ));
    };
    let mut tree = GlmTree::new();
    for (key, value) in entries {
        let RawValue::Block(body) = value else {
            return Err(GlmError::InvalidArgument(format!(
                "top-level tree entry '{key}' is not an object"
            )));
        };
        tree.push_leaf(leaf_from_raw(&key, body)?);
    }
    Ok(tree)
}

fn leaf_from_raw(key: &str, mut body: Vec<(String, RawValue)>) -> GlmResult<Leaf> {
    let id = key
        .parse::<usize>()
        .map(LeafId::new)
        .map_err(|_| GlmError::InvalidArgument(format!("tree key '{key}' is not an integer id")))?;

    let kind = if let Some(omftype) = take_text(&mut body, OMFTYPE) {
        let argument = take_text(&mut body, ARGUMENT).unwrap_or_default();
        match omftype.strip_prefix("class ") {
            Some(name) => LeafKind::Class {
                name: name.trim().to_string(),
                body: unwrap_class_body(&argument),
            },
            None => LeafKind::Directive {
                keyword: omftype,
                argument,
            },
        }
    } else if let Some(name) = take_text(&mut body, "module") {
        LeafKind::Module { name }
    } else if take_text(&mut body, "clock").is_some() {
        LeafKind::Clock
    } else if let Some(class) = take_text(&mut body, "object") {
        if class == "schedule" {
            LeafKind::Schedule {
                name: take_text(&mut body, "name").unwrap_or_default(),
                body: take_text(&mut body, CRON).unwrap_or_default(),
            }
        } else {
            LeafKind::Object { class }
        }
    } else if let Some(header) = take_text(&mut body, EMBEDDED) {
        LeafKind::EmbeddedConfig { header }
    } else {
        LeafKind::Anonymous
    };

    let mut leaf = Leaf::new(id, kind);
    for (key, value) in body {
        match value {
            RawValue::Text(value) => leaf.set_attr(key, value),
            RawValue::Block(child) => leaf.push_child(leaf_from_raw(&key, child)?),
        }
    }
    Ok(leaf)
}

fn take_text(body: &mut Vec<(String, RawValue)>, key: &str) -> Option<String> {
    let index = body
        .iter()
        .position(|(k, v)| k == key && matches!(v, RawValue::Text(_)))?;
    match body.remove(index).1 {
        RawValue::Text(text) => Some(text),
        RawValue::Block(_) => None,
    }
}

fn unwrap_class_body(argument: &str) -> String {
    let inner = argument.trim();
    let inner = inner.strip_prefix('{').unwrap_or(inner);
    let inner = inner.strip_suffix('}').unwrap_or(inner);
    inner
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyed_json_uses_marker_keys_in_order() {
        let tree = GlmTree::parse(
            "#set minimum_timestep=60;\nobject house { name h1; object ZIPload { power 1; }; floor_area 1500; };",
        )
        .unwrap();
        let json = tree_to_json(&tree).unwrap();
        let expected = r##"{
    "0": {
        "omftype": "#set",
        "argument": "minimum_timestep=60"
    },
    "1": {
        "object": "house",
        "name": "h1",
        "2": {
            "object": "ZIPload",
            "power": "1"
        },
        "floor_area": "1500"
    }
}"##;
        assert_eq!(json, expected);
    }

    #[test]
    fn tree_json_round_trip_keeps_ids_and_order() {
        let source = "clock { timezone EST+5EDT; };\nmodule powerflow { solver_method NR; };\n\
                      schedule s { * * * * * 1.0; };\nclass player { double value; };\n\
                      object line { name l1; configuration object line_configuration { spacing s; }; length 5; };";
        let tree = GlmTree::parse(source).unwrap();
        let back = tree_from_json(&tree_to_json(&tree).unwrap()).unwrap();
        assert_eq!(tree, back);
    }

    #[test]
    fn reads_legacy_shapes() {
        let json = r#"{
            "3": {"omftype": "class player", "argument": "{\n\tdouble value;\n}"},
            "4": {"object": "schedule", "name": "s", "cron": "* * * * * 1.0 ;"},
            "9": {"object": "node", "name": "n1", "nominal_voltage": 7200}
        }"#;
        let tree = tree_from_json(json).unwrap();
        assert_eq!(
            tree.leaves()[0].kind(),
            &LeafKind::Class {
                name: "player".into(),
                body: "double value;".into()
            }
        );
        assert!(matches!(tree.leaves()[1].kind(), LeafKind::Schedule { name, .. } if name == "s"));
        assert_eq!(tree.leaves()[2].attr("nominal_voltage"), Some("7200"));
        assert_eq!(tree.leaves()[2].id(), LeafId::new(9));
        assert!(writer::write(&tree).is_ok());
    }

    #[test]
    fn rejects_bad_keys_and_unknown_blocks() {
        assert!(tree_from_json(r#"{"x": {"object": "node"}}"#).is_err());
        assert!(tree_from_json(r#"{"0": "loose string"}"#).is_err());

        let tree = GlmTree::parse("instance { a 1; };").unwrap();
        assert!(tree_to_json(&tree).is_err());
    }

    #[test]
    fn markerless_leaf_reads_as_anonymous() {
        let tree = tree_from_json(r#"{"0": {"name": "orphan"}}"#).unwrap();
        assert_eq!(tree.leaves()[0].kind(), &LeafKind::Anonymous);
        assert_eq!(tree.leaves()[0].name(), Some("orphan"));
    }

    #[test]
    fn wireframe_defaults() {
        let doc: OmdDocument = serde_json::from_str(r#"{"tree": {}}"#).unwrap();
        assert_eq!(doc.layout_vars, LayoutVars::default());
        assert!(doc.tree.is_empty());
        let value = serde_json::to_value(&OmdDocument::default()).unwrap();
        assert_eq!(value["layoutVars"]["linkStrength"], "5");
        assert_eq!(value["layoutVars"]["charge"], "-5");
        assert!(value["hiddenLinks"].as_array().unwrap().is_empty());
    }

    #[test]
    fn attachment_names_stay_inside_the_directory() {
        let dir = Path::new("out");
        assert_eq!(
            attachment_target(dir, "weather.csv").unwrap(),
            dir.join("weather.csv")
        );
        for name in ["../escaped.txt", "/etc/passwd", "sub/file.csv", "..", ".", ""] {
            assert!(attachment_target(dir, name).is_err(), "{name}");
        }
    }

    #[test]
    fn unpacking_rejects_escaping_attachments() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");
        let mut doc = OmdDocument::new(GlmTree::parse("object node { name n1; };").unwrap());
        doc.attachments.insert("../escaped.txt".into(), "x".into());
        doc.attachments.insert("ok.csv".into(), "1,2".into());

        assert!(unpack_omd(&doc, &out.join("feeder.glm")).is_err());
        assert!(!tmp.path().join("escaped.txt").exists());
        assert!(!out.join("ok.csv").exists());
        assert!(!out.join("feeder.glm").exists());
    }

    #[test]
    fn unpacking_creates_the_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let glm_path = tmp.path().join("new").join("feeder.glm");
        let mut doc = OmdDocument::new(GlmTree::parse("object node { name n1; };").unwrap());
        doc.attachments.insert("weather.csv".into(), "1,2".into());

        unpack_omd(&doc, &glm_path).unwrap();
        assert_eq!(fs::read_to_string(glm_path.with_file_name("weather.csv")).unwrap(), "1,2");
        assert!(fs::read_to_string(&glm_path).unwrap().contains("name n1;"));
    }
}
