use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Michał M. Więcław",
    version,
    about = "confsearch - conformational ensemble search: generate conformers, minimize them under constraints, and sieve by energy window and RMSD.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to minimize conformers in parallel.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the conformational space of one molecule.
    Search(SearchArgs),
    /// Print the default configuration file to stdout.
    Defaults,
}

/// Arguments for the `search` subcommand.
#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    // --- Core Arguments ---
    /// Path to the input structure (MDL molfile, V2000).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory receiving the output files [default: confsearch].
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Search Overrides ---
    /// Number of conformers to generate.
    #[arg(short = 'n', long, value_name = "INT")]
    pub num_conformers: Option<usize>,

    /// Heavy-atom RMSD (Angstrom) at or below which conformers are duplicates.
    #[arg(short = 'r', long, value_name = "FLOAT")]
    pub rms_threshold: Option<f64>,

    /// Energy window (kcal/mol) above the lowest conformer.
    #[arg(short = 'e', long, value_name = "FLOAT")]
    pub energy_window: Option<f64>,

    /// Seed for the conformer generator, for reproducible runs.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    // --- Minimization Overrides ---
    /// Maximum number of minimization cycles per conformer.
    #[arg(short = 'c', long, value_name = "INT")]
    pub max_cycles: Option<usize>,

    /// 0-based indices of atoms kept at their input positions.
    #[arg(short = 'f', long = "fixed", value_name = "ATOM", num_args = 1..)]
    pub fixed_atoms: Vec<usize>,

    /// Let fixed atoms move up to this distance (Angstrom) instead of pinning them.
    #[arg(short = 'x', long, value_name = "FLOAT")]
    pub max_displacement: Option<f64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S search.num-conformers=50
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}
