use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use glm_io::{glm_to_omd, load_omd, omd_to_glm, unpack_omd, Format};
use tracing::info;

fn format_of(path: &Path) -> Option<Format> {
    Format::detect(path).map(|(format, _)| format)
}

pub fn handle(input: &Path, output: &Path, attachments: &[PathBuf]) -> Result<()> {
    match (format_of(input), format_of(output)) {
        (Some(Format::Glm), Some(Format::Omd)) => {
            let doc = glm_to_omd(input, output, attachments)?;
            println!(
                "Wrote {} ({} blocks, {} attachment(s))",
                output.display(),
                doc.tree.len(),
                doc.attachments.len()
            );
        }
        (Some(Format::Omd), Some(Format::Glm)) => {
            let doc = load_omd(input)?;
            unpack_omd(&doc, output)?;
            println!("Wrote {}", output.display());
        }
        (Some(Format::Omd), None) => {
            let glm = omd_to_glm(input, output)?;
            println!("Wrote {}", glm.display());
        }
        (Some(from), Some(to)) if from == to => {
            bail!("{} and {} are both {}", input.display(), output.display(), from)
        }
        (None, _) => bail!("Unsupported filetype at path {}", input.display()),
        (Some(_), _) => bail!(
            "Cannot convert {} to {}: expected a .glm, .omd or .json destination",
            input.display(),
            output.display()
        ),
    }
    info!(input = %input.display(), output = %output.display(), "converted");
    Ok(())
}
