//! calscrape CLI entry point.

use std::process::ExitCode;

use clap::Parser;

use calscrape_cli::cli::{Cli, Command, ConfigAction};
use calscrape_cli::commands;
use calscrape_cli::config::Settings;
use calscrape_cli::error::CliResult;
use calscrape_core::{TracingConfig, TracingOutputFormat, init_tracing};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing_config = TracingConfig::cli(cli.debug);
    if cli.debug {
        tracing_config = tracing_config.with_env_filter("calscrape=debug");
    }
    if cli.json_logs {
        tracing_config = tracing_config.with_format(TracingOutputFormat::Json);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("warning: {}", e);
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<ExitCode> {
    let settings = match cli.config {
        Some(ref path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Command::Fetch(ref args) => {
            let response = commands::fetch::run(args, &settings).await?;
            println!("{}", commands::fetch::render(&response, args.pretty)?);
            Ok(if response.error {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Config { ref action } => {
            match action {
                ConfigAction::Dump => commands::config::dump(&settings)?,
                ConfigAction::Validate => commands::config::validate(&settings)?,
                ConfigAction::Path => commands::config::path()?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
