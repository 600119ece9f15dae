//! `tabsplit auth test`

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;

use tabsplit_remote::TokenProvider;

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Acquire a bearer token the same way `sync` would and print it.
    Test,
}

pub fn run(cmd: AuthCommand) -> Result<()> {
    match cmd {
        AuthCommand::Test => test(),
    }
}

fn test() -> Result<()> {
    let config = super::load_config()?;
    let provider = TokenProvider::from_config(&config.wolt);
    let source = if provider.is_fixed() {
        "WOLT_AUTH_BEARER_TOKEN"
    } else if config.wolt.session_command.is_some() {
        "session helper"
    } else {
        "session file"
    };

    let token = super::runtime()?
        .block_on(provider.token())
        .context("could not obtain a bearer token")?;

    println!("{} Bearer token obtained from {source}", "✓".green());
    println!("{}", token.header_value());
    Ok(())
}
