use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use glm_core::tokenize;
use tabwriter::TabWriter;

pub fn handle(input: &Path, limit: Option<usize>) -> Result<()> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("reading GLM file: {}", input.display()))?;
    let tokens = tokenize(&text);
    let shown = limit.unwrap_or(tokens.len()).min(tokens.len());

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "LINE\tTOKEN")?;
    for token in &tokens[..shown] {
        writeln!(writer, "{}\t{}", token.line, token)?;
    }
    writer.flush()?;
    if shown < tokens.len() {
        println!("... {} more", tokens.len() - shown);
    }
    Ok(())
}
