mod event;
mod telemetry;

pub use event::{AckEvent, AckItem, ErrorEvent, ErrorLevel, EventMessage};
pub use telemetry::{FlatFrame, FlatRecord, PackedBody, PackedFrame, PackedRecord};
