pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

use anyhow::Result;

/// Parse arguments, install telemetry and run the selected action.
///
/// # Errors
///
/// Returns an error if telemetry setup or the action fails
pub async fn start() -> Result<()> {
    let matches = commands::new().get_matches();

    let _guard = telemetry::init(matches.get_count("verbosity"))?;

    let action = dispatch::handler(&matches)?;

    actions::run::handle(action).await
}
