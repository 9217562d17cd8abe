use anyhow::Result;
use glm_cli::cli::GraphCommands;
use glm_core::graph_utils::{self, FeederGraph};

use super::{emit, load_tree};

pub fn handle(command: &GraphCommands) -> Result<()> {
    match command {
        GraphCommands::Stats { input } => {
            let feeder = FeederGraph::from_tree(&load_tree(input)?);
            let stats = graph_utils::graph_stats(&feeder)?;
            println!("Graph statistics for {}:", input.display());
            println!("  Nodes         : {}", stats.node_count);
            println!("  Edges         : {}", stats.edge_count);
            println!("  Components    : {}", stats.connected_components);
            println!(
                "  Degree [min/avg/max]: {}/{:.2}/{}",
                stats.min_degree, stats.avg_degree, stats.max_degree
            );
            println!("  Density       : {:.4}", stats.density);
            Ok(())
        }
        GraphCommands::Islands { input, emit } => {
            let feeder = FeederGraph::from_tree(&load_tree(input)?);
            let analysis = graph_utils::find_islands(&feeder)?;
            for summary in &analysis.islands {
                println!(
                    "Island {}: {} node(s)",
                    summary.island_id, summary.node_count
                );
            }
            if *emit {
                println!("\nNode -> Island assignments:");
                for assignment in &analysis.assignments {
                    println!(
                        "  idx {:>3}: {:<20} -> island {}",
                        assignment.node_index, assignment.label, assignment.island_id
                    );
                }
            }
            Ok(())
        }
        GraphCommands::Export { input, format, out } => {
            let feeder = FeederGraph::from_tree(&load_tree(input)?);
            let text = graph_utils::export_graph(&feeder, format.as_str())?;
            emit(&text, out.as_deref())
        }
        GraphCommands::D3 { input, out } => {
            let feeder = FeederGraph::from_tree(&load_tree(input)?);
            let text = serde_json::to_string_pretty(&graph_utils::to_d3_json(&feeder))?;
            emit(&text, out.as_deref())
        }
    }
}
