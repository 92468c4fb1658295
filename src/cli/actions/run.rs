use crate::cli::actions::Action;
use crate::config::{Config, load_config, local_hostname};
use crate::exporter::new;
use crate::sampler::{DatabaseClient, Sampler, SqlxClient};
use crate::sink::{MemoryNotifier, MemorySink};
use anyhow::{Context, Result, anyhow};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// Handle the run action
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the exporter fails to
/// start, or (in check mode) any instance fails its cycle
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run {
            port,
            listen,
            config,
        } => {
            let config = load_config(&config)
                .with_context(|| format!("failed to load {}", config.display()))?;
            info!(instances = config.instances.len(), "configuration loaded");
            new(port, listen, config).await?;
        }
        Action::Check { config } => {
            let config = load_config(&config)
                .with_context(|| format!("failed to load {}", config.display()))?;
            let mut stdout = std::io::stdout().lock();
            check(config, Arc::new(SqlxClient::new()), &mut stdout).await?;
        }
    }

    Ok(())
}

/// Run one cycle per instance and write every emission, notification and
/// sub-query failure to `out` as one JSON object per line.
///
/// # Errors
///
/// Returns an error if writing fails or any instance could not complete its
/// connect and status phase.
pub async fn check<W: Write>(
    config: Config,
    client: Arc<dyn DatabaseClient>,
    out: &mut W,
) -> Result<()> {
    let sink = Arc::new(MemorySink::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let sampler = Sampler::new(client, sink.clone(), notifier.clone());

    let mut failed = Vec::new();

    for mut instance in config.into_instances(&local_hostname()) {
        let outcome = sampler.run_cycle(&mut instance).await;

        for (tags, emission) in sink.take() {
            writeln!(out, "{}", json!({ "tags": tags, "value": emission }))?;
        }
        for (tags, notification) in notifier.take() {
            writeln!(out, "{}", json!({ "tags": tags, "notification": notification }))?;
        }

        match outcome {
            Ok(report) => {
                for (sub_query, e) in report.failures() {
                    writeln!(
                        out,
                        "{}",
                        json!({
                            "tags": instance.tags(),
                            "sub_query": sub_query,
                            "error": e.to_string(),
                        })
                    )?;
                }
            }
            Err(e) => {
                writeln!(
                    out,
                    "{}",
                    json!({
                        "tags": instance.tags(),
                        "phase": e.phase(),
                        "error": e.to_string(),
                    })
                )?;
                failed.push(instance.name().to_string());
            }
        }

        instance.close().await;
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("cycle failed for: {}", failed.join(", ")))
    }
}
