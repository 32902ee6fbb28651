//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Forge - incremental cluster installer
///
/// Builds install assets (install config, manifests, ignition configs)
/// from a dependency graph, reusing whatever earlier runs left in the
/// install directory.
#[derive(Parser, Debug)]
#[command(name = "forge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Install directory holding assets and the state file
    #[arg(long, global = true, default_value = ".", env = "FORGE_DIR")]
    pub dir: PathBuf,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FORGE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a target (install-config, manifests, ignition-configs, cluster)
    Create(CreateArgs),

    /// Tear down what `create` built
    Destroy(DestroyArgs),

    /// Show assets recorded in the state file
    View(ViewArgs),

    /// Print the asset dependency graph in DOT format
    Graph(GraphArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completion(CompletionArgs),
}

/// Arguments for the create command
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Target to create
    pub target: String,
}

/// Arguments for the destroy command
#[derive(Parser, Debug)]
pub struct DestroyArgs {
    /// What to destroy
    #[arg(value_enum)]
    pub what: DestroyTarget,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Things `destroy` can remove
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DestroyTarget {
    /// The cluster, its assets and the state file
    Cluster,
}

/// Arguments for the view command
#[derive(Parser, Debug)]
pub struct ViewArgs {
    /// Print one recorded file instead of listing assets
    pub file: Option<String>,

    /// Output format for the listing
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the graph command
#[derive(Parser, Debug)]
pub struct GraphArgs {
    /// Write the graph to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Arguments for the completion command
#[derive(Parser, Debug)]
pub struct CompletionArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
