pub mod cli;
pub mod config;

pub use cli::{
    build_cli_command, Cli, Commands, FeederCommands, FeederIo, GraphCommands, GraphFormat,
};
pub use config::{load_config, save_config, GlmConfig};
