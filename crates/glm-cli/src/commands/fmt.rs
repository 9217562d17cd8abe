use std::path::Path;

use anyhow::{Context, Result};
use glm_core::{writer, Diagnostics, WriteOptions};
use glm_io::{dump_glm, dump_glm_lenient, load_glm};
use tracing::{info, warn};

pub struct FmtArgs<'a> {
    pub input: &'a Path,
    pub out: Option<&'a Path>,
    pub sorted: bool,
    pub no_indent: bool,
    pub truncate_names: bool,
    pub lenient: bool,
}

/// Command-line switches only ever turn behaviour on relative to the config.
fn options(args: &FmtArgs<'_>, defaults: WriteOptions) -> WriteOptions {
    WriteOptions {
        indent: defaults.indent && !args.no_indent,
        sorted: defaults.sorted || args.sorted,
        truncate_names: defaults.truncate_names || args.truncate_names,
    }
}

pub fn handle(args: &FmtArgs<'_>, defaults: WriteOptions) -> Result<()> {
    let tree = load_glm(args.input)?;
    let options = options(args, defaults);
    info!(input = %args.input.display(), leaves = tree.len(), "formatting");

    let diagnostics = match (args.out, args.lenient) {
        (Some(out), false) => {
            dump_glm(&tree, out, &options)?;
            println!("Wrote {}", out.display());
            Diagnostics::new()
        }
        (Some(out), true) => {
            let diagnostics = dump_glm_lenient(&tree, out, &options)?;
            println!("Wrote {}", out.display());
            diagnostics
        }
        (None, false) => {
            let text = writer::write_with(&tree, &options)
                .with_context(|| format!("serializing {}", args.input.display()))?;
            print!("{text}");
            Diagnostics::new()
        }
        (None, true) => {
            let mut diagnostics = Diagnostics::new();
            print!("{}", writer::write_lenient(&tree, &options, &mut diagnostics));
            diagnostics
        }
    };

    if diagnostics.has_issues() {
        warn!("{}", diagnostics.summary());
        eprint!("{diagnostics}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(sorted: bool, no_indent: bool) -> FmtArgs<'static> {
        FmtArgs {
            input: Path::new("in.glm"),
            out: None,
            sorted,
            no_indent,
            truncate_names: false,
            lenient: false,
        }
    }

    #[test]
    fn flags_layer_over_config() {
        let config = WriteOptions {
            indent: true,
            sorted: true,
            truncate_names: true,
        };
        let merged = options(&args(false, true), config);
        assert!(!merged.indent);
        assert!(merged.sorted);
        assert!(merged.truncate_names);

        let merged = options(&args(true, false), WriteOptions::default());
        assert!(merged.indent);
        assert!(merged.sorted);
        assert!(!merged.truncate_names);
    }
}
