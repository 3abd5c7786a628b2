//! Command-line interface.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod commands;
mod helpers;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "pagewatch")]
#[command(about = "Watch web pages and get notified when they change")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: ./pagewatch.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one monitoring pass over the watch-list
    Check {
        /// Log notices instead of sending email
        #[arg(long)]
        no_email: bool,
        /// Send raw diffs without LLM summaries
        #[arg(long)]
        no_summary: bool,
        /// Skip the run lock (use when the caller already serializes runs)
        #[arg(long)]
        no_lock: bool,
    },

    /// Show tracked URLs and pending watch-list changes
    Status,

    /// Create the state file, snapshot directory and watch-list if missing
    Init,
}

/// Log level requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

/// Determine verbosity from raw arguments (for early logging setup).
pub fn verbosity() -> Verbosity {
    verbosity_from(std::env::args())
}

fn verbosity_from(args: impl IntoIterator<Item = String>) -> Verbosity {
    let mut verbosity = Verbosity::Normal;
    for arg in args {
        match arg.as_str() {
            "-v" | "--verbose" => verbosity = Verbosity::Verbose,
            "-q" | "--quiet" => verbosity = Verbosity::Quiet,
            _ => {}
        }
    }
    verbosity
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        use_cwd: cli.cwd,
    };
    let (settings, config) = load_settings_with_options(options).await?;

    match cli.command {
        Commands::Check {
            no_email,
            no_summary,
            no_lock,
        } => {
            let options = commands::CheckOptions {
                no_email,
                no_summary,
                no_lock,
            };
            commands::cmd_check(&settings, &config, options).await
        }
        Commands::Status => commands::cmd_status(&settings).await,
        Commands::Init => commands::cmd_init(&settings).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_from_args() {
        assert_eq!(verbosity_from(args(&["pagewatch", "check"])), Verbosity::Normal);
        assert_eq!(
            verbosity_from(args(&["pagewatch", "-v", "check"])),
            Verbosity::Verbose
        );
        assert_eq!(
            verbosity_from(args(&["pagewatch", "check", "--quiet"])),
            Verbosity::Quiet
        );
    }

    #[test]
    fn test_parse_check_flags() {
        let cli = Cli::try_parse_from(["pagewatch", "check", "--no-email", "--no-lock"]).unwrap();
        match cli.command {
            Commands::Check {
                no_email,
                no_summary,
                no_lock,
            } => {
                assert!(no_email);
                assert!(!no_summary);
                assert!(no_lock);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["pagewatch", "-v", "-q", "status"]).is_err());
    }
}
