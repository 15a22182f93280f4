pub mod commands;
pub mod correlator;
pub mod monitor;
pub mod reconciler;
pub mod registry;
pub mod telemetry;
pub mod tracker;

pub use commands::{AxisCommand, CommandClient, HttpPost, HttpReply, ReqwestPost, ValveCommand};
pub use monitor::{DeviceSummary, Monitor};
pub use registry::{DeviceRegistry, DeviceState, ErrorEntry, PoseMap};
pub use telemetry::TelemetryService;
