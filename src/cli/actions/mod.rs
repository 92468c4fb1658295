pub mod run;

use std::path::PathBuf;

#[derive(Debug)]
pub enum Action {
    /// Serve metrics until shut down
    Run {
        port: u16,
        listen: Option<String>,
        config: PathBuf,
    },
    /// One cycle per instance, then exit
    Check { config: PathBuf },
}
