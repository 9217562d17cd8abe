use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::FmtSubscriber;

use glm_cli::cli::{Cli, Commands};
use glm_cli::config::{load_config, GlmConfig};

use crate::commands::{completions, convert, feeder, fmt, graph, inspect, tokens};

mod commands;

fn run(cli: &Cli, config: &GlmConfig) -> Result<()> {
    match &cli.command {
        Commands::Fmt {
            input,
            out,
            sorted,
            no_indent,
            truncate_names,
            lenient,
        } => fmt::handle(
            &fmt::FmtArgs {
                input,
                out: out.as_deref(),
                sorted: *sorted,
                no_indent: *no_indent,
                truncate_names: *truncate_names,
                lenient: *lenient,
            },
            config.output,
        ),
        Commands::Inspect { input, json } => inspect::handle(input, *json),
        Commands::Tokens { input, limit } => tokens::handle(input, *limit),
        Commands::Graph { command } => graph::handle(command),
        Commands::Feeder { command } => feeder::handle(command, &config.output),
        Commands::Convert {
            input,
            output,
            attachments,
        } => convert::handle(input, output, attachments),
        Commands::Completions { shell, out } => completions::handle(*shell, out.as_deref()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    let level = match cli.log_level {
        Some(level) => level,
        None => match config.log_level() {
            Ok(level) => level,
            Err(err) => {
                eprintln!("error: {err:#}");
                return ExitCode::FAILURE;
            }
        },
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }
    debug!(?config, "loaded config");

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:?}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
