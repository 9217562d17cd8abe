//! GLM serializer
//!
//! Walks a [`GlmTree`] and emits GLM text. Each top-level leaf is followed by
//! a blank line; nested blocks are emitted in place, between the attributes
//! that surrounded them in the source. Output of [`write`] always reparses to
//! an equal tree (modulo leaf ids).
//!
//! Leaves without a block type GridLAB-D understands (`Other`, `Anonymous`)
//! make [`write`] fail with [`GlmError::UnrecognizedBlock`]. [`write_lenient`]
//! drops them instead and records what it skipped.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::diagnostics::Diagnostics;
use crate::error::{GlmError, GlmResult};
use crate::tree::{Entry, GlmTree, Leaf, LeafKind};

/// GridLAB-D rejects object names longer than this.
pub const MAX_NAME_LEN: usize = 62;

/// Output formatting switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteOptions {
    /// Indent block bodies with one tab per nesting level
    pub indent: bool,
    /// Order top-level leaves by id instead of current position
    pub sorted: bool,
    /// Cut `name`/`parent` values to [`MAX_NAME_LEN`] characters
    pub truncate_names: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: true,
            sorted: false,
            truncate_names: false,
        }
    }
}

/// Serialize with default options.
pub fn write(tree: &GlmTree) -> GlmResult<String> {
    write_with(tree, &WriteOptions::default())
}

/// Serialize with top-level leaves ordered by id.
pub fn write_sorted(tree: &GlmTree) -> GlmResult<String> {
    write_with(
        tree,
        &WriteOptions {
            sorted: true,
            ..WriteOptions::default()
        },
    )
}

pub fn write_with(tree: &GlmTree, options: &WriteOptions) -> GlmResult<String> {
    let mut writer = Writer {
        options,
        diagnostics: None,
        out: String::new(),
    };
    writer.tree(tree)?;
    Ok(writer.out)
}

/// Serialize, skipping leaves that cannot be written. Every skipped leaf
/// (and its subtree) is reported as an error in `diagnostics`.
pub fn write_lenient(
    tree: &GlmTree,
    options: &WriteOptions,
    diagnostics: &mut Diagnostics,
) -> String {
    let mut writer = Writer {
        options,
        diagnostics: Some(diagnostics),
        out: String::new(),
    };
    if let Err(err) = writer.tree(tree) {
        warn!(error = %err, "lenient write stopped early");
    }
    writer.out
}

/// Serialize a single leaf (and its children) at top-level indentation.
pub fn write_leaf(leaf: &Leaf, options: &WriteOptions) -> GlmResult<String> {
    let mut writer = Writer {
        options,
        diagnostics: None,
        out: String::new(),
    };
    writer.leaf(leaf, 0)?;
    Ok(writer.out)
}

struct Writer<'a> {
    options: &'a WriteOptions,
    diagnostics: Option<&'a mut Diagnostics>,
    out: String,
}

impl Writer<'_> {
    fn tree(&mut self, tree: &GlmTree) -> GlmResult<()> {
        let mut leaves: Vec<&Leaf> = tree.leaves().iter().collect();
        if self.options.sorted {
            leaves.sort_by_key(|leaf| leaf.id());
        }
        for leaf in leaves {
            let before = self.out.len();
            self.leaf(leaf, 0)?;
            if self.out.len() > before {
                self.out.push('\n');
            }
        }
        Ok(())
    }

    fn leaf(&mut self, leaf: &Leaf, depth: usize) -> GlmResult<()> {
        let header = match leaf.kind() {
            LeafKind::Directive { keyword, argument } => {
                self.indent(depth);
                self.out.push_str(keyword);
                if !argument.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(argument);
                }
                self.out.push_str(";\n");
                return Ok(());
            }
            LeafKind::Schedule { name, body } => {
                return self.raw_block("schedule", name, body, depth);
            }
            LeafKind::Class { name, body } => {
                return self.raw_block("class", name, body, depth);
            }
            LeafKind::Module { name } => format!("module {name}"),
            LeafKind::Clock => "clock".to_string(),
            LeafKind::Object { class } => format!("object {class}"),
            LeafKind::EmbeddedConfig { header } => header.clone(),
            LeafKind::Other { .. } | LeafKind::Anonymous => return self.unrecognized(leaf),
        };

        self.indent(depth);
        self.out.push_str(&header);
        self.out.push_str(" {\n");
        for entry in leaf.entries() {
            match entry {
                Entry::Attribute { key, value } => self.attribute(key, value, depth + 1),
                Entry::Child(child) => self.leaf(child, depth + 1)?,
            }
        }
        self.indent(depth);
        self.out.push_str("};\n");
        Ok(())
    }

    fn raw_block(&mut self, keyword: &str, name: &str, body: &str, depth: usize) -> GlmResult<()> {
        self.indent(depth);
        self.out.push_str(keyword);
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str(" {\n");
        for line in body.lines().filter(|line| !line.trim().is_empty()) {
            self.indent(depth + 1);
            self.out.push_str(line.trim());
            self.out.push('\n');
        }
        self.indent(depth);
        self.out.push_str("};\n");
        Ok(())
    }

    fn attribute(&mut self, key: &str, value: &str, depth: usize) {
        self.indent(depth);
        self.out.push_str(key);
        if value.is_empty() {
            self.out.push_str(";\n");
            return;
        }

        let truncate = self.options.truncate_names
            && (key == "name" || key == "parent")
            && value.chars().count() > MAX_NAME_LEN;
        if truncate {
            let short: String = value.chars().take(MAX_NAME_LEN).collect();
            warn!(key, value, "truncating to {MAX_NAME_LEN} characters");
            self.out.push(' ');
            self.out.push_str(&short);
            self.out.push_str("; // truncated from ");
            self.out.push_str(value);
            self.out.push('\n');
        } else {
            self.out.push(' ');
            self.out.push_str(value);
            self.out.push_str(";\n");
        }
    }

    fn unrecognized(&mut self, leaf: &Leaf) -> GlmResult<()> {
        let description = leaf.kind().describe();
        let err = GlmError::UnrecognizedBlock {
            id: leaf.id(),
            description: description.clone(),
        };
        match self.diagnostics.as_deref_mut() {
            Some(diagnostics) => {
                warn!(id = %leaf.id(), block = %description, "skipping unrecognized block");
                diagnostics.add_error_with_entity(
                    "serialize",
                    &err.to_string(),
                    &leaf.id().to_string(),
                );
                Ok(())
            }
            None => Err(err),
        }
    }

    fn indent(&mut self, depth: usize) {
        if self.options.indent {
            for _ in 0..depth {
                self.out.push('\t');
            }
        }
    }
}
