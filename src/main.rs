use anyhow::Result;
use mysql_sampler::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::start().await
}
