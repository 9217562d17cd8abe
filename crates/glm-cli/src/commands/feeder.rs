use anyhow::Result;
use chrono::Local;
use glm_cli::cli::{FeederCommands, FeederIo};
use glm_core::{GlmTree, WriteOptions};
use glm_feeder::{
    adjust_time, attach_named, fully_de_embed, group_swing_kids, merge_contig_lines,
    remove_number_refs, CLOCK_FORMAT,
};
use glm_io::{dump_glm, load_glm};

/// Load, edit, save. `edit` returns the line reported on success.
fn apply(
    io: &FeederIo,
    options: &WriteOptions,
    edit: impl FnOnce(&mut GlmTree) -> Result<String>,
) -> Result<()> {
    let mut tree = load_glm(&io.input)?;
    let summary = edit(&mut tree)?;
    dump_glm(&tree, &io.out, options)?;
    println!("{summary}");
    println!("Wrote {}", io.out.display());
    Ok(())
}

pub fn handle(command: &FeederCommands, options: &WriteOptions) -> Result<()> {
    match command {
        FeederCommands::AdjustTime {
            io,
            length,
            units,
            start,
        } => {
            let start = start
                .clone()
                .unwrap_or_else(|| Local::now().date_naive().to_string());
            apply(io, options, |tree| {
                let window = adjust_time(tree, *length, *units, &start)?;
                Ok(format!(
                    "Simulation window {} .. {} (interval {}s)",
                    window.start.format(CLOCK_FORMAT),
                    window.stop.format(CLOCK_FORMAT),
                    window.interval
                ))
            })
        }
        FeederCommands::DeEmbed { io } => apply(io, options, |tree| {
            let hoisted = fully_de_embed(tree)?;
            Ok(format!("Hoisted {hoisted} embedded block(s)"))
        }),
        FeederCommands::AttachRecorders {
            io,
            kind,
            key,
            value,
        } => apply(io, options, |tree| {
            let added = attach_named(tree, kind, key, value)?;
            Ok(format!("Attached {} {kind} recorder(s)", added.len()))
        }),
        FeederCommands::SwingKids { io } => apply(io, options, |tree| {
            let added = group_swing_kids(tree);
            Ok(format!("Added {} swing collector(s)", added.len()))
        }),
        FeederCommands::NumberRefs { io } => apply(io, options, |tree| {
            let renamed = remove_number_refs(tree);
            Ok(format!("Renamed {renamed} numbered object(s)"))
        }),
        FeederCommands::MergeLines { io } => apply(io, options, |tree| {
            let merged = merge_contig_lines(tree);
            Ok(format!("Merged {merged} line pair(s)"))
        }),
    }
}
