use serde::{Deserialize, Serialize};

use super::{BitSpec, FlagSet};

/// Execution state word reported by an NC axis controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionState {
    Unknown,
    Idle,
    Executing,
    Homing,
    Jogging,
    Stopping,
    Error,
}

impl MotionState {
    /// Maps the raw state word to its meaning. Codes added by newer firmware
    /// degrade to `Unknown` rather than failing the record.
    pub fn from_word(word: u64) -> Self {
        match word {
            1 => MotionState::Idle,
            2 => MotionState::Executing,
            3 => MotionState::Homing,
            4 => MotionState::Jogging,
            5 => MotionState::Stopping,
            6 => MotionState::Error,
            _ => MotionState::Unknown,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MotionState::Error)
    }
}

/// Bit layout of the axis activity word.
pub const AXIS_ACTIVITY_LAYOUT: &[BitSpec] = &[
    BitSpec {
        name: "homed",
        bit: 0,
    },
    BitSpec {
        name: "in_position",
        bit: 1,
    },
    BitSpec {
        name: "moving_plus",
        bit: 2,
    },
    BitSpec {
        name: "moving_minus",
        bit: 3,
    },
    BitSpec {
        name: "brake_released",
        bit: 4,
    },
    BitSpec {
        name: "in_target",
        bit: 5,
    },
    BitSpec {
        name: "warning",
        bit: 6,
    },
    BitSpec {
        name: "fault",
        bit: 7,
    },
];

/// Bit layout of the axis status and diagnosis word. The gaps are reserved
/// bits the controller never sets.
pub const AXIS_STATUS_LAYOUT: &[BitSpec] = &[
    BitSpec {
        name: "enabled",
        bit: 0,
    },
    BitSpec {
        name: "homing_active",
        bit: 1,
    },
    BitSpec {
        name: "jog_active",
        bit: 3,
    },
    BitSpec {
        name: "lag_error",
        bit: 8,
    },
    BitSpec {
        name: "overtemp",
        bit: 9,
    },
    BitSpec {
        name: "supply_ok",
        bit: 12,
    },
    BitSpec {
        name: "comm_ok",
        bit: 17,
    },
    BitSpec {
        name: "sim_mode",
        bit: 20,
    },
    BitSpec {
        name: "bus_sync",
        bit: 23,
    },
];

/// Uniform axis telemetry record produced by the format adapter, independent
/// of which wire shape carried it.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisReading {
    pub motion: MotionState,
    pub activity: FlagSet,
    pub status: FlagSet,
    /// Drive position in axis units.
    pub position: f32,
    /// Position projected into world coordinates by the controller.
    pub world_position: f32,
    pub velocity: f32,
}
