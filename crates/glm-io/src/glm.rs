//! `.glm` file load and dump.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use glm_core::{writer, Diagnostics, GlmTree, WriteOptions};
use tracing::{debug, info};

/// Read and parse a GLM file.
pub fn load_glm(path: &Path) -> Result<GlmTree> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading GLM file: {}", path.display()))?;
    let tree = GlmTree::parse(&text)
        .with_context(|| format!("parsing GLM file: {}", path.display()))?;
    debug!(path = %path.display(), leaves = tree.len(), "loaded GLM");
    Ok(tree)
}

/// Serialize a tree and write it to `path`.
pub fn dump_glm(tree: &GlmTree, path: &Path, options: &WriteOptions) -> Result<()> {
    let text = writer::write_with(tree, options)
        .with_context(|| format!("serializing tree for {}", path.display()))?;
    write_text(path, &text)
}

/// Like [`dump_glm`], but leaves that cannot be written are skipped and
/// reported in the returned diagnostics.
pub fn dump_glm_lenient(tree: &GlmTree, path: &Path, options: &WriteOptions) -> Result<Diagnostics> {
    let mut diagnostics = Diagnostics::new();
    let text = writer::write_lenient(tree, options, &mut diagnostics);
    write_text(path, &text)?;
    Ok(diagnostics)
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    fs::write(path, text).with_context(|| format!("writing GLM file: {}", path.display()))?;
    info!(path = %path.display(), bytes = text.len(), "wrote GLM");
    Ok(())
}
