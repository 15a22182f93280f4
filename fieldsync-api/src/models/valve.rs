use serde::{Deserialize, Serialize};

use super::{BitSpec, FlagSet};

/// Coarse execution state word shared by non-axis devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenericState {
    Unknown,
    Idle,
    Executing,
    Error,
}

impl GenericState {
    pub fn from_word(word: u64) -> Self {
        match word {
            1 => GenericState::Idle,
            2 => GenericState::Executing,
            3 => GenericState::Error,
            _ => GenericState::Unknown,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, GenericState::Error)
    }
}

/// Bit layout of the valve position word.
pub const VALVE_POSITION_LAYOUT: &[BitSpec] = &[
    BitSpec {
        name: "at_base",
        bit: 0,
    },
    BitSpec {
        name: "at_work",
        bit: 1,
    },
    BitSpec {
        name: "to_base",
        bit: 2,
    },
    BitSpec {
        name: "to_work",
        bit: 3,
    },
    BitSpec {
        name: "sensor_fault",
        bit: 6,
    },
];

/// Discrete position cycle of a two-position valve, derived from the end
/// position sensors and the commanded direction bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionState {
    Unknown,
    MovingToBase,
    MovingToWork,
    ArrivedAtBase,
    ArrivedAtWork,
}

impl PositionState {
    /// Derives the cycle position from the decoded flag word.
    ///
    /// Arrival sensors win over direction bits: a valve that has reached an
    /// end position reports that position even while the command output is
    /// still energized.
    pub fn from_flags(flags: &FlagSet) -> Self {
        if flags.is_set("at_work") {
            PositionState::ArrivedAtWork
        } else if flags.is_set("at_base") {
            PositionState::ArrivedAtBase
        } else if flags.is_set("to_work") {
            PositionState::MovingToWork
        } else if flags.is_set("to_base") {
            PositionState::MovingToBase
        } else {
            PositionState::Unknown
        }
    }

    pub fn is_moving(&self) -> bool {
        matches!(self, PositionState::MovingToBase | PositionState::MovingToWork)
    }

    pub fn is_arrived(&self) -> bool {
        matches!(self, PositionState::ArrivedAtBase | PositionState::ArrivedAtWork)
    }
}

/// Uniform valve telemetry record produced by the format adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct ValveReading {
    pub state: GenericState,
    pub flags: FlagSet,
    pub position: PositionState,
    /// Active recipe number on the valve's function block.
    pub recipe: u32,
    /// Device-reported timestamp, Unix epoch milliseconds.
    pub timestamp_ms: i64,
}
