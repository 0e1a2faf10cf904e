//! Command-line interface for the `vorsorge` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, ScheduleCommand, ServeCommand, StatusCommand};

use crate::logging::Verbosity;

/// vorsorge - Keep track of your children's U-checkups
///
/// Runs the family web app and offers a few maintenance commands.
#[derive(Debug, Parser)]
#[command(name = "vorsorge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the web server
    Serve(ServeCommand),

    /// Print the checkup schedule for a birth date
    Schedule(ScheduleCommand),

    /// Show database statistics
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
        assert_eq!(Cli::command().get_name(), "vorsorge");
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["vorsorge", "-q", "status"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["vorsorge", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["vorsorge", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["vorsorge", "-vv", "status"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_serve() {
        let cli = parse(&["vorsorge", "serve"]);
        assert!(matches!(cli.command, Command::Serve(ServeCommand { bind: None })));

        let cli = parse(&["vorsorge", "serve", "--bind", "0.0.0.0:8080"]);
        let Command::Serve(cmd) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(cmd.bind.unwrap().port(), 8080);
    }

    #[test]
    fn test_parse_serve_rejects_bad_address() {
        assert!(Cli::try_parse_from(["vorsorge", "serve", "--bind", "localhost"]).is_err());
    }

    #[test]
    fn test_parse_schedule() {
        let cli = parse(&["vorsorge", "schedule", "2023-05-15", "--json"]);
        let Command::Schedule(cmd) = cli.command else {
            panic!("expected schedule");
        };
        assert_eq!(cmd.birth_date, NaiveDate::from_ymd_opt(2023, 5, 15).unwrap());
        assert!(cmd.json);
    }

    #[test]
    fn test_parse_schedule_rejects_bad_date() {
        assert!(Cli::try_parse_from(["vorsorge", "schedule", "gestern"]).is_err());
    }

    #[test]
    fn test_parse_config_validate_with_file() {
        let cli = parse(&["vorsorge", "config", "validate", "--file", "/tmp/v.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["vorsorge", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
