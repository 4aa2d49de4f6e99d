//! Clause CLI
//!
//! Formatting and round-trip checking for Clausewitz-style script files

mod commands;
mod output;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::error;

#[derive(Parser)]
#[command(name = "clause")]
#[command(about = "Format and check Clausewitz-style game script files")]
#[command(version = clause_core::VERSION)]
#[command(
    long_about = "Clause parses game script files without losing comments or blank lines,\n\
re-renders them under configurable layout rules and checks that nothing but\n\
whitespace changes on the way.\n\
\n\
Examples:\n  \
clause fmt common/              # Reformat every script under common/\n  \
clause fmt --check --diff .     # Show what would change\n  \
clause check game/ --json       # Round-trip report as JSON\n  \
clause dump common/goods.txt    # Print the key/value view of a file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        help = "Path to configuration file (clause.toml, .clauserc.json, ...)"
    )]
    config: Option<PathBuf>,

    /// Verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Number of threads to use for parallel processing
    #[arg(
        short = 'j',
        long,
        global = true,
        help = "Number of threads (default: number of CPU cores)"
    )]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reformat script files in place
    Fmt {
        /// Files or directories to format
        #[arg(help = "Files or directories to format (default: configured directories or .)")]
        paths: Vec<PathBuf>,

        /// Check formatting without modifying files
        #[arg(long, help = "Report files that would change without writing them")]
        check: bool,

        /// Show diff of proposed changes
        #[arg(long, help = "Print a unified diff of every change")]
        diff: bool,

        /// Exclude patterns (glob syntax)
        #[arg(long, help = "Skip files matching pattern (can be used multiple times)")]
        exclude: Vec<String>,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// Check that files parse and render back without changes beyond whitespace
    Check {
        /// Files or directories to check
        #[arg(help = "Files or directories to check (default: configured directories or .)")]
        paths: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long, help = "Print the report as JSON")]
        json: bool,

        /// Exclude patterns (glob syntax)
        #[arg(long, help = "Skip files matching pattern (can be used multiple times)")]
        exclude: Vec<String>,
    },

    /// Print the key/value view of a file as JSON
    Dump {
        /// Script file to dump
        file: PathBuf,
    },

    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the JSON Schema of the configuration file
    Schema,
    /// Print the configuration in effect
    Show,
}

/// Layout switches that override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct LayoutArgs {
    /// Collapse blank lines
    #[arg(long)]
    default_no_double_blank_line: bool,

    /// Put a blank line between all items
    #[arg(long, conflicts_with = "default_no_double_blank_line")]
    default_yes_double_blank_line: bool,

    /// Keep blank lines around objects
    #[arg(long)]
    object_forces_double_blank_line: bool,

    /// Objects with at most N items go on one line
    #[arg(long, value_name = "N")]
    force_single_line_below: Option<usize>,

    /// Objects with more than N items put each item on its own line
    #[arg(long, value_name = "N")]
    force_multi_line_above: Option<usize>,

    /// Whitespace before a comment that follows an item
    #[arg(long, value_name = "WHITESPACE")]
    separator: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    if !cli.no_color && std::env::var("NO_COLOR").is_err() {
        colored::control::unset_override();
    } else {
        colored::control::set_override(false);
    }

    let log_level = match cli.verbose {
        0 => "clause=error",
        1 => "clause=warn",
        2 => "clause=info",
        3 => "clause=debug",
        _ => "clause=trace",
    };
    clause_core::init_tracing(log_level);

    if let Some(threads) = cli.threads
        && let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
    {
        error!("Failed to set thread pool size: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run_command(cli) {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config;

    match cli.command {
        Commands::Fmt {
            paths,
            check,
            diff,
            exclude,
            layout,
        } => commands::format_command(paths, check, diff, exclude, layout, config_path),

        Commands::Check {
            paths,
            json,
            exclude,
        } => commands::check_command(paths, json, exclude, config_path),

        Commands::Dump { file } => commands::dump_command(&file),

        Commands::Config { action } => match action {
            ConfigAction::Schema => commands::config_schema_command(),
            ConfigAction::Show => commands::config_show_command(config_path),
        },

        Commands::Version => {
            println!("{} {}", env!("CARGO_BIN_NAME"), clause_core::VERSION);
            Ok(())
        }
    }
}
