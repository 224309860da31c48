//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// calscrape - Month calendars from an authenticated upstream
#[derive(Debug, Parser)]
#[command(name = "calscrape")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "CALSCRAPE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one month and print the response as JSON
    Fetch(FetchArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `calscrape fetch`.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Month to fetch (1-12)
    #[arg(long, short)]
    pub month: u32,

    /// Year to fetch; defaults to the current year in the configured timezone
    #[arg(long, short)]
    pub year: Option<i32>,

    /// Caller token; overrides the configured token
    #[arg(long, env = "CALSCRAPE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Upstream base URL; overrides the configured one
    #[arg(long)]
    pub base_url: Option<String>,

    /// Pretty-print the JSON response
    #[arg(long)]
    pub pretty: bool,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_fetch() {
        let cli = Cli::try_parse_from([
            "calscrape", "--debug", "fetch", "--month", "10", "--year", "2025", "--token",
            "abc123", "--pretty",
        ])
        .unwrap();

        assert!(cli.debug);
        let Command::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(args.month, 10);
        assert_eq!(args.year, Some(2025));
        assert_eq!(args.token.as_deref(), Some("abc123"));
        assert!(args.pretty);
    }

    #[test]
    fn fetch_requires_month() {
        assert!(Cli::try_parse_from(["calscrape", "fetch"]).is_err());
    }

    #[test]
    fn parses_config_path() {
        let cli = Cli::try_parse_from(["calscrape", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
