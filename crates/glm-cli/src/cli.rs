use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use glm_feeder::SimUnits;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "glm", author, version, about = "GridLAB-D model toolkit", long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides the config file)
    #[arg(long)]
    pub log_level: Option<tracing::Level>,

    /// Config file to use instead of ~/.glm/config/glm.toml
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a GLM file and write it back out normalized
    Fmt {
        /// Input GLM file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        /// Order top-level blocks by id
        #[arg(long)]
        sorted: bool,
        /// Do not indent block bodies
        #[arg(long)]
        no_indent: bool,
        /// Cut long names to what GridLAB-D accepts
        #[arg(long)]
        truncate_names: bool,
        /// Skip blocks that cannot be written instead of failing
        #[arg(long)]
        lenient: bool,
    },
    /// Summarize the blocks and references in a model
    Inspect {
        /// Input GLM or OMD file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Emit JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Print the token stream of a GLM file
    Tokens {
        /// Input GLM file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Stop after this many tokens
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Topology of the feeder
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },
    /// In-place feeder edits
    Feeder {
        #[command(subcommand)]
        command: FeederCommands,
    },
    /// Convert between GLM and OMD (by extension)
    Convert {
        /// Source file
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Destination file, or a directory when unpacking OMD
        #[arg(value_hint = ValueHint::AnyPath)]
        output: PathBuf,
        /// Files to embed when writing OMD
        #[arg(long = "attach", value_hint = ValueHint::FilePath)]
        attachments: Vec<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GraphCommands {
    /// Graph stats summary
    Stats {
        /// Input GLM or OMD file
        input: PathBuf,
    },
    /// Find islands in the feeder
    Islands {
        /// Input GLM or OMD file
        input: PathBuf,
        /// Emit island IDs
        #[arg(long)]
        emit: bool,
    },
    /// Export graph to DOT or JSON
    Export {
        /// Input GLM or OMD file
        input: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = GraphFormat::Dot)]
        format: GraphFormat,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Force-layout JSON for the web viewer
    D3 {
        /// Input GLM or OMD file
        input: PathBuf,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum GraphFormat {
    Dot,
    Json,
}

impl GraphFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            GraphFormat::Dot => "dot",
            GraphFormat::Json => "json",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum FeederCommands {
    /// Point the clock and recorders at a new simulation window
    AdjustTime {
        #[command(flatten)]
        io: FeederIo,
        /// Run length, in --units
        #[arg(long)]
        length: i64,
        /// Unit of --length
        #[arg(long, default_value = "hours")]
        units: SimUnits,
        /// Start time, YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS" (today when omitted)
        #[arg(long)]
        start: Option<String>,
    },
    /// Hoist nested objects and embedded configurations to the top level
    DeEmbed {
        #[command(flatten)]
        io: FeederIo,
    },
    /// Attach recorders or collectors of one kind
    AttachRecorders {
        #[command(flatten)]
        io: FeederIo,
        /// Recorder kind (Regulator, Voltage, OverheadLosses, ...)
        #[arg(long)]
        kind: String,
        /// Attribute to match parents on
        #[arg(long, default_value = "object")]
        key: String,
        /// Value the attribute must have
        #[arg(long, default_value = "")]
        value: String,
    },
    /// Group links on the swing bus and collect their power
    SwingKids {
        #[command(flatten)]
        io: FeederIo,
    },
    /// Replace `class:N` object references with names
    NumberRefs {
        #[command(flatten)]
        io: FeederIo,
    },
    /// Merge pass-through line pairs
    MergeLines {
        #[command(flatten)]
        io: FeederIo,
    },
}

#[derive(clap::Args, Debug)]
pub struct FeederIo {
    /// Input GLM file
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,
    /// Output GLM file
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub out: PathBuf,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
