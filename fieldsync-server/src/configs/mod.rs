mod settings;

pub use settings::{Bus, BusAuth, Controller, DeviceEntry, Logger, Monitoring, Settings};
