//! `treetrace` - CLI and API server for TreeTrace
//!
//! This binary serves the REST API and provides maintenance commands for the
//! database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use treetrace::cli::{self, Cli, Command, ConfigCommand, SessionsCommand};
use treetrace::{init_logging, Config, Storage};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Configuration commands must work when the configured file is broken
    let load = || Config::load_from(cli.config.clone()).context("loading configuration");

    match cli.command {
        Command::Serve(cmd) => {
            let config = load()?;
            let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            runtime.block_on(treetrace::server::serve(config, cmd.bind))?;
        }
        Command::Status(cmd) => println!("{}", cli::status(&load()?, cmd.json)?),
        Command::Tree(cmd) => {
            let config = load()?;
            let storage = Storage::open(config.database_path())?;
            println!("{}", cli::tree(&storage, &config, &cmd)?);
        }
        Command::Sessions(SessionsCommand::Prune) => {
            let storage = Storage::open(load()?.database_path())?;
            let removed = storage.prune_expired_sessions()?;
            println!("Removed {removed} expired sessions.");
        }
        Command::Config(cmd) => handle_config(cli.config.clone(), cmd)?,
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path).context("loading configuration")?;
            println!("{}", cli::show_config(&config, json)?);
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("{}", cli::validate_config(&path)?);
        }
    }
    Ok(())
}
