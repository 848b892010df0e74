use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        long,
        help = "Specify the project directory paths are made relative to (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Specify path/filename of the TOML config file (default: .xtools/xbundle/xbundle.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "no_config",
        help_heading = "Project Setup"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        help = "Disable loading any TOML config file.",
        conflicts_with = "config",
        help_heading = "Project Setup"
    )]
    pub no_config: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct IgnoreOpts {
    #[arg(
        long,
        help = "Do not apply the built-in ignore catalog.",
        help_heading = "Ignore Rules"
    )]
    pub no_default_ignores: bool,

    #[arg(
        short = 'i',
        long = "ignore",
        help = "Add an ignore rule (glob; trailing '/' for directories). Repeatable.",
        value_name = "PATTERN",
        help_heading = "Ignore Rules"
    )]
    pub patterns: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Bundle a source tree into a single text file for AI models.",
    long_about = "xbundle walks a directory, skips paths matching ignore rules, and concatenates \nthe remaining text files with path headers into one context bundle.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  xbundle generate\n  xbundle generate src docs --stdout\n  xbundle generate -i 'fixtures/' -f json\n  xbundle check node_modules/ src/main.rs",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        about = "Bundle one or more directories into context files."
    )]
    Generate(GenerateArgs),

    #[command(
        visible_alias = "c",
        about = "Report whether paths would be ignored by the effective rules."
    )]
    Check(CheckArgs),

    #[command(about = "Show the default or effective configuration as TOML.")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(
        value_name = "ROOT",
        help = "Directories (or files) to bundle, one output per root (default: project root)."
    )]
    pub roots: Vec<PathBuf>,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub ignore: IgnoreOpts,

    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json", "yaml"], help_heading = "Output")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Write bundles to standard output instead of files.",
        conflicts_with = "output_dir",
        help_heading = "Output"
    )]
    pub stdout: bool,

    #[arg(
        short = 'o',
        long,
        help = "Directory to write bundles into (overrides config).",
        value_name = "DIR",
        help_heading = "Output"
    )]
    pub output_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(
        value_name = "PATH",
        required = true,
        help = "Project-relative paths to test; end directories with '/'."
    )]
    pub paths: Vec<String>,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub ignore: IgnoreOpts,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        long,
        help = "Show the configuration loaded for the project instead of the defaults."
    )]
    pub effective: bool,

    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
}
