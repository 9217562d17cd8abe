//! Model summary: block tallies, object classes and reference checks.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use glm_core::{validate_references, BlockCounts, Diagnostics};
use serde::Serialize;
use tabwriter::TabWriter;

use super::load_tree;

#[derive(Serialize)]
struct InspectReport {
    input: String,
    top_level: usize,
    counts: BlockCounts,
    classes: BTreeMap<String, usize>,
    diagnostics: Diagnostics,
}

pub fn handle(input: &Path, json: bool) -> Result<()> {
    let tree = load_tree(input)?;
    let report = InspectReport {
        input: input.display().to_string(),
        top_level: tree.len(),
        counts: tree.counts(),
        classes: tree.class_histogram(),
        diagnostics: validate_references(&tree),
    };

    if json {
        serde_json::to_writer_pretty(io::stdout(), &report)
            .map_err(|err| anyhow::anyhow!("serializing inspect report to JSON: {err}"))?;
        println!();
        return Ok(());
    }

    println!("Model: {}", report.input);
    println!("  Top-level blocks : {}", report.top_level);
    let counts = &report.counts;
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "BLOCK\tCOUNT")?;
    for (label, count) in [
        ("directives", counts.directives),
        ("modules", counts.modules),
        ("clocks", counts.clocks),
        ("objects", counts.objects),
        ("embedded configs", counts.embedded_configs),
        ("schedules", counts.schedules),
        ("classes", counts.classes),
        ("unrecognized", counts.unrecognized),
        ("attributes", counts.attributes),
    ] {
        writeln!(writer, "{label}\t{count}")?;
    }
    writeln!(writer)?;
    writeln!(writer, "CLASS\tOBJECTS")?;
    for (class, count) in &report.classes {
        writeln!(writer, "{class}\t{count}")?;
    }
    writer.flush()?;

    println!();
    print!("{}", report.diagnostics);
    Ok(())
}
