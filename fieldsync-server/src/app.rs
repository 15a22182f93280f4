use std::sync::Arc;

use tokio::sync::Mutex;

use crate::configs::Settings;
use crate::errors::AgentError;
use crate::services::commands::ReqwestPost;
use crate::services::monitor::Monitor;
use crate::services::telemetry::TelemetryService;
use crate::services::CommandClient;
use crate::sinks::{LogNotifier, LogSink};

pub struct App {
    pub monitor: Arc<Mutex<Monitor>>,
    pub bus: TelemetryService,
    pub commands: Arc<CommandClient>,
}

impl App {
    /// Unbinds every device and drops the remaining state.
    pub async fn shutdown(&self) {
        for id in self.bus.bound_devices().await {
            if let Err(err) = self.bus.unbind_device(id).await {
                tracing::warn!(%id, %err, "unbind failed during shutdown");
            }
        }
        self.monitor.lock().await.clear();
    }
}

pub async fn create_app(settings: &Settings) -> Result<App, AgentError> {
    let notifier = Arc::new(LogNotifier);
    let monitor = Arc::new(Mutex::new(Monitor::new(
        settings.monitoring.format,
        Arc::new(LogSink),
        notifier.clone(),
    )));

    let commands = Arc::new(CommandClient::new(
        settings.controller.base_url.clone(),
        Arc::new(ReqwestPost::new()),
        notifier,
    ));

    let (bus, event_loop) = TelemetryService::new(&settings.bus, monitor.clone())?;
    bus.start(event_loop);

    for device in &settings.monitoring.devices {
        bus.bind_device(device).await?;
    }

    Ok(App {
        monitor,
        bus,
        commands,
    })
}
