pub mod completions;
pub mod convert;
pub mod feeder;
pub mod fmt;
pub mod graph;
pub mod inspect;
pub mod tokens;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use glm_core::GlmTree;
use glm_io::load_feeder;

/// Load a model from either a GLM or an OMD file.
pub fn load_tree(input: &Path) -> Result<GlmTree> {
    if !input.exists() {
        bail!("Input '{}' does not exist", input.display());
    }
    Ok(load_feeder(input, &[])?.tree)
}

/// Write `text` to `out`, or to stdout when no path is given.
pub fn emit(text: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            if !text.ends_with('\n') {
                writeln!(stdout)?;
            }
        }
    }
    Ok(())
}
