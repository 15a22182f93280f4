//! Format adapter between the two telemetry wire shapes and the uniform
//! device readings the monitoring core consumes.
//!
//! An installation runs exactly one shape, selected by configuration. The
//! shape of an incoming payload is still classified structurally so that a
//! misconfigured format is reported instead of decoding to nonsense.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::codec;
use crate::message::{FlatFrame, FlatRecord, PackedBody, PackedFrame};
use crate::models::{
    AXIS_ACTIVITY_LAYOUT, AXIS_STATUS_LAYOUT, AxisReading, DeviceClass, FlagSet, GenericState,
    MotionState, PositionState, VALVE_POSITION_LAYOUT, ValveReading,
};

/// Wire encoding selected for a monitored installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    Flat,
    Packed,
}

impl WireFormat {
    fn shape_name(&self) -> &'static str {
        match self {
            WireFormat::Flat => "flat",
            WireFormat::Packed => "packed",
        }
    }
}

/// Failure to turn a raw payload into a telemetry frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("payload is not a valid telemetry document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("configured for the {configured} shape but payload carries the {found} shape")]
    ShapeMismatch {
        configured: &'static str,
        found: &'static str,
    },
    #[error("payload carries neither a `data` nor a `pack` array")]
    UnknownShape,
}

/// A telemetry payload resolved to its wire shape exactly once. Per-device
/// extraction borrows the frame, so one payload fanned out to several devices
/// is parsed a single time.
#[derive(Debug, Clone)]
pub enum TelemetryFrame {
    Flat(FlatFrame),
    Packed(PackedFrame),
}

impl TelemetryFrame {
    /// Parses a payload against the configured shape.
    ///
    /// A structurally recognizable payload of the other shape is a
    /// [`FrameError::ShapeMismatch`], never a silent partial decode.
    pub fn parse(payload: &str, format: WireFormat) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(payload)?;
        let found = if value.get("data").is_some() {
            WireFormat::Flat
        } else if value.get("pack").is_some() {
            WireFormat::Packed
        } else {
            return Err(FrameError::UnknownShape);
        };
        if found != format {
            return Err(FrameError::ShapeMismatch {
                configured: format.shape_name(),
                found: found.shape_name(),
            });
        }
        match format {
            WireFormat::Flat => Ok(TelemetryFrame::Flat(serde_json::from_value(value)?)),
            WireFormat::Packed => Ok(TelemetryFrame::Packed(serde_json::from_value(value)?)),
        }
    }

    /// Extracts the axis reading addressed to `device_name`, if the frame
    /// carries a relevant record for it.
    pub fn extract_axis(&self, device_name: &str) -> Option<AxisReading> {
        let class = DeviceClass::Axis;
        match self {
            TelemetryFrame::Flat(frame) => frame
                .data
                .iter()
                .filter(|record| {
                    record.typ == class.record_tag() && record.has_hex_fields(&AXIS_FIELDS)
                })
                .find(|record| class.names_match(&record.name, device_name))
                .map(axis_from_flat),
            TelemetryFrame::Packed(frame) => frame
                .pack
                .iter()
                .filter_map(|record| record.body(class.record_tag()))
                .find(|body| class.names_match(&body.name, device_name))
                .map(axis_from_packed),
        }
    }

    /// Extracts the valve reading addressed to `device_name`, if the frame
    /// carries a relevant record for it.
    pub fn extract_valve(&self, device_name: &str) -> Option<ValveReading> {
        let class = DeviceClass::Valve;
        match self {
            TelemetryFrame::Flat(frame) => frame
                .data
                .iter()
                .filter(|record| record.typ == class.record_tag())
                .find(|record| class.names_match(&record.name, device_name))
                .map(valve_from_flat),
            TelemetryFrame::Packed(frame) => frame
                .pack
                .iter()
                .filter_map(|record| record.body(class.record_tag()))
                .find(|body| class.names_match(&body.name, device_name))
                .map(valve_from_packed),
        }
    }
}

/// Fields an axis record of the flat shape must carry to be usable.
const AXIS_FIELDS: [&str; 6] = ["st", "act", "diag", "pos", "wpos", "vel"];

fn axis_from_flat(record: &FlatRecord) -> AxisReading {
    AxisReading {
        motion: MotionState::from_word(codec::hex_word(record.hex_field("st").unwrap_or_default())),
        activity: FlagSet::decode(
            record.hex_field("act").unwrap_or_default(),
            AXIS_ACTIVITY_LAYOUT,
        ),
        status: FlagSet::decode(
            record.hex_field("diag").unwrap_or_default(),
            AXIS_STATUS_LAYOUT,
        ),
        position: codec::hex_f32(record.hex_field("pos").unwrap_or_default()),
        world_position: codec::hex_f32(record.hex_field("wpos").unwrap_or_default()),
        velocity: codec::hex_f32(record.hex_field("vel").unwrap_or_default()),
    }
}

fn axis_from_packed(body: &PackedBody) -> AxisReading {
    AxisReading {
        motion: MotionState::from_word(codec::hex_word(body.hex_field("st").unwrap_or_default())),
        // The packed shape predates the activity and diagnosis words.
        activity: FlagSet::all_false(AXIS_ACTIVITY_LAYOUT),
        status: FlagSet::all_false(AXIS_STATUS_LAYOUT),
        position: codec::hex_f32(body.hex_field("pos").unwrap_or_default()),
        world_position: codec::hex_f32(body.hex_field("wpos").unwrap_or_default()),
        velocity: codec::hex_f32(body.hex_field("vel").unwrap_or_default()),
    }
}

fn valve_from_flat(record: &FlatRecord) -> ValveReading {
    valve_reading(
        record.hex_field("st"),
        record.hex_field("pst"),
        record.hex_field("rcp"),
        record.hex_field("ts"),
    )
}

fn valve_from_packed(body: &PackedBody) -> ValveReading {
    valve_reading(
        body.hex_field("st"),
        body.hex_field("pst"),
        body.hex_field("rcp"),
        body.hex_field("ts"),
    )
}

fn valve_reading(
    st: Option<&str>,
    pst: Option<&str>,
    rcp: Option<&str>,
    ts: Option<&str>,
) -> ValveReading {
    let flags = FlagSet::decode(pst.unwrap_or_default(), VALVE_POSITION_LAYOUT);
    ValveReading {
        state: GenericState::from_word(codec::hex_word(st.unwrap_or_default())),
        position: PositionState::from_flags(&flags),
        flags,
        recipe: codec::hex_word(rcp.unwrap_or_default()) as u32,
        timestamp_ms: codec::filetime_ms(ts.unwrap_or_default()),
    }
}
