//! Command-line interface for utilp
//!
//! This module provides the main CLI structure and command handling.
//! It uses clap for argument parsing and exposes a few of the library's
//! utilities as subcommands.

use anyhow::{Result, anyhow};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

pub use output::Output;

use crate::config::UtilpConfig;

/// utilp - small utilities around a background result reducer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Enable quiet output (minimal)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Replace substrings of TEXT in a single pass
    Replace {
        /// Text to transform
        text: String,
        /// Replacement pair, earlier pairs win on overlap
        #[arg(short, long = "map", value_name = "FROM=TO", value_parser = parse_pair, required = true)]
        pairs: Vec<(String, String)>,
    },
    /// Check whether a path is valid and exists or could be created
    Path {
        path: PathBuf,
        /// Check by creating a temporary sibling file instead of asking access(2)
        #[arg(long)]
        portable: bool,
    },
    /// Sum numbers on a background reducer thread
    Reduce {
        /// Numbers to sum, read from stdin (one per line) when omitted
        #[arg(allow_negative_numbers = true)]
        numbers: Vec<f64>,
        /// Report progress every N numbers
        #[arg(long, value_name = "N")]
        interval: Option<usize>,
        /// Poll the queue instead of blocking on it
        #[arg(long)]
        poll: bool,
        /// Also write the result to the log directory
        #[arg(long)]
        log: bool,
    },
    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
    /// Show version information
    Version,
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the merged configuration
    Show {
        /// Print raw JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

fn parse_pair(raw: &str) -> Result<(String, String)> {
    raw.split_once('=')
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .ok_or_else(|| anyhow!("expected FROM=TO, got '{raw}'"))
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        if !self.quiet {
            crate::logging::init_tracing(self.verbose);
        }
        let output = Output::new(self.verbose > 0, self.quiet);

        match self.command {
            Some(Commands::Replace { text, pairs }) => {
                commands::replace::execute(&text, &pairs, &output)
            }
            Some(Commands::Path { path, portable }) => {
                commands::path::execute(&path, portable, &output)
            }
            Some(Commands::Reduce {
                numbers,
                interval,
                poll,
                log,
            }) => {
                let config = UtilpConfig::load_with_custom_config(self.config.as_deref())?;
                let args = commands::reduce::ReduceArgs {
                    numbers,
                    interval,
                    poll,
                    log,
                };
                commands::reduce::execute(args, &config, &output)
            }
            Some(Commands::Config(ConfigCommands::Show { json })) => {
                let config = UtilpConfig::load_with_custom_config(self.config.as_deref())?;
                commands::config::show(&config, json, &output)
            }
            Some(Commands::Version) => commands::version::execute(&output),
            None => {
                // Show help when no command is provided
                let mut cmd = Cli::command();
                cmd.print_help()?;
                Ok(())
            }
        }
    }
}
