use crate::app::create_app;
use crate::configs::Settings;
use crate::errors::AgentError;

pub mod app;
pub mod configs;
pub mod errors;
pub mod services;
pub mod sinks;

/// Runs the agent until interrupted, then releases all devices.
pub async fn run(settings: &Settings) -> Result<(), AgentError> {
    let app = create_app(settings).await?;

    tracing::info!(
        devices = settings.monitoring.devices.len(),
        format = ?settings.monitoring.format,
        "agent running"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    app.shutdown().await;

    Ok(())
}
