use std::env;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use fieldsync_api::adapter::WireFormat;
use fieldsync_api::models::DeviceClass;

use crate::services::registry::PoseMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Logger {
    pub level: String,
}

/// MQTT broker connection.
#[derive(Debug, Clone, Deserialize)]
pub struct Bus {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    /// Shared topic carrying plant error events.
    pub error_topic: String,
    /// Shared topic carrying host-wide acknowledgment broadcasts.
    pub ack_topic: String,
    pub auth: Option<BusAuth>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusAuth {
    pub cert_path: String,
    pub key_path: String,
}

/// Controller HTTP endpoint receiving device function calls.
#[derive(Debug, Clone, Deserialize)]
pub struct Controller {
    pub base_url: String,
}

/// One monitored device. The channel numbers address the controller's
/// function blocks; a value of 0 leaves commands disabled for the device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceEntry {
    pub name: String,
    pub class: DeviceClass,
    /// Telemetry topic this device's records arrive on.
    pub topic: String,
    #[serde(default)]
    pub axis_no: u32,
    #[serde(default)]
    pub move_no: u32,
    #[serde(default)]
    pub function_no: u32,
    #[serde(default)]
    pub pose: Option<PoseMap>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Monitoring {
    /// Wire shape this installation publishes.
    pub format: WireFormat,
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub bus: Bus,
    pub controller: Controller,
    pub monitoring: Monitoring,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Builds settings from an in-memory TOML document.
    pub fn from_toml(document: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(document, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
        [logger]
        level = "info"

        [bus]
        host = "broker.plant.local"
        port = 8883
        client_id = "fieldsync"
        error_topic = "plant/events/error"
        ack_topic = "plant/events/ack"

        [bus.auth]
        cert_path = "certs/client.pem"
        key_path = "certs/client.key"

        [controller]
        base_url = "http://plc.plant.local:5120"

        [monitoring]
        format = "flat"

        [[monitoring.devices]]
        name = "Axis_1"
        class = "axis"
        topic = "plant/cell1/telemetry"
        axis_no = 11
        move_no = 12
        pose = { origin = [0.0, 0.5, 0.0], travel = [0.0, 0.0, 1.0] }

        [[monitoring.devices]]
        name = "Valve_K3"
        class = "valve"
        topic = "plant/cell1/telemetry"
        function_no = 31
    "#;

    #[test]
    fn parses_a_full_document() {
        let settings = Settings::from_toml(DOCUMENT).unwrap();
        assert_eq!(settings.logger.level, "info");
        assert_eq!(settings.bus.port, 8883);
        assert_eq!(
            settings.bus.auth.as_ref().unwrap().cert_path,
            "certs/client.pem"
        );
        assert_eq!(settings.monitoring.format, WireFormat::Flat);
        assert_eq!(settings.monitoring.devices.len(), 2);

        let axis = &settings.monitoring.devices[0];
        assert_eq!(axis.class, DeviceClass::Axis);
        assert_eq!(axis.axis_no, 11);
        assert_eq!(axis.function_no, 0);
        let pose = axis.pose.unwrap();
        assert_eq!(pose.travel, [0.0, 0.0, 1.0]);

        let valve = &settings.monitoring.devices[1];
        assert_eq!(valve.class, DeviceClass::Valve);
        assert_eq!(valve.function_no, 31);
        assert!(valve.pose.is_none());
    }

    #[test]
    fn channel_numbers_default_to_disabled() {
        let settings = Settings::from_toml(
            r#"
            [logger]
            level = "debug"
            [bus]
            host = "localhost"
            port = 1883
            client_id = "fieldsync"
            error_topic = "err"
            ack_topic = "ack"
            [controller]
            base_url = "http://localhost:5120"
            [monitoring]
            format = "packed"
            [[monitoring.devices]]
            name = "Valve_K9"
            class = "valve"
            topic = "t"
            "#,
        )
        .unwrap();
        let valve = &settings.monitoring.devices[0];
        assert_eq!(valve.function_no, 0);
        assert!(settings.bus.auth.is_none());
    }
}
