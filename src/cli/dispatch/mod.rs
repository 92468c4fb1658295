use crate::cli::actions::Action;
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use std::path::PathBuf;

/// # Errors
///
/// Returns an error if required arguments are missing
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    let config = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .ok_or_else(|| {
            anyhow!("Config is required. Please provide it using the --config flag.")
        })?;

    if matches.get_flag("check") {
        return Ok(Action::Check { config });
    }

    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // None means auto-detect
    let listen = matches
        .get_one::<String>("listen")
        .map(std::string::ToString::to_string);

    Ok(Action::Run {
        port,
        listen,
        config,
    })
}
