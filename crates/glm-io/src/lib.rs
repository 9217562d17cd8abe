//! # glm-io: feeder file I/O
//!
//! Loads and saves GridLAB-D models in the two shapes they travel in:
//!
//! | Format | Extensions | Notes |
//! |--------|------------|-------|
//! | GLM | `.glm` | GridLAB-D model text |
//! | OMD | `.omd`, `.json` | JSON document: keyed tree, layout settings, attachments |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use glm_io::{dump_glm, load_glm};
//! use glm_core::WriteOptions;
//!
//! fn main() -> anyhow::Result<()> {
//!     let tree = load_glm(Path::new("feeder.glm"))?;
//!     println!("{} top-level blocks", tree.len());
//!     dump_glm(&tree, Path::new("feeder_out.glm"), &WriteOptions::default())?;
//!     Ok(())
//! }
//! ```

pub mod format;
pub mod glm;
pub mod omd;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

pub use format::{Confidence, Format};
pub use glm::{dump_glm, dump_glm_lenient, load_glm};
pub use omd::{
    attachment_target, glm_to_omd, load_omd, omd_to_glm, save_omd, tree_from_json, tree_to_json,
    unpack_omd, LayoutVars, OmdDocument,
};

/// Load either format into an OMD document. GLM input gets an empty
/// wireframe plus the given attachments; attachments are ignored for OMD
/// input, which carries its own.
pub fn load_feeder(path: &Path, attachments: &[PathBuf]) -> Result<OmdDocument> {
    match Format::detect(path) {
        Some((Format::Glm, _)) => {
            let mut doc = OmdDocument::new(load_glm(path)?);
            doc.attach_files(attachments)?;
            Ok(doc)
        }
        Some((Format::Omd, _)) => load_omd(path),
        None => bail!("Unsupported filetype at path {}", path.display()),
    }
}
