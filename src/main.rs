use anyhow::Result;

/// Main entry point
#[tokio::main]
async fn main() -> Result<()> {
    let (config, warnings) = krc_assistant::config::load()?;
    let _log_guard = krc_assistant::logging::init(&config.logging)?;
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    let directory = krc_assistant::config::load_directory(&config)?;

    krc_assistant::server::serve(config, directory, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        tracing::info!("shutdown signal received");
    })
    .await
}
