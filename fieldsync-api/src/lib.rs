pub mod adapter;
pub mod codec;
pub mod message;
pub mod models;
pub mod sink;

pub use adapter::{FrameError, TelemetryFrame, WireFormat};
pub use models::{
    AxisReading, DeviceClass, DeviceId, FlagSet, GenericState, MotionState, PositionState,
    ValveReading,
};
