mod axis;
mod valve;

pub use axis::*;
pub use valve::*;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec;

/// Handle a bound device is addressed by across the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(Uuid);

impl DeviceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for DeviceId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for DeviceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of field device a monitored entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Axis,
    Valve,
}

impl DeviceClass {
    /// Type tag carried by telemetry records of this class.
    pub fn record_tag(&self) -> &'static str {
        match self {
            DeviceClass::Axis => "NcAxis",
            DeviceClass::Valve => "PnValve",
        }
    }

    /// Compares a wire-reported device name against a configured one.
    ///
    /// Surrounding whitespace is never significant. Valve controllers are
    /// known to report names with inconsistent casing, axis names are exact.
    pub fn names_match(&self, reported: &str, configured: &str) -> bool {
        let reported = reported.trim();
        let configured = configured.trim();
        match self {
            DeviceClass::Axis => reported == configured,
            DeviceClass::Valve => reported.eq_ignore_ascii_case(configured),
        }
    }
}

/// A named bit position within a device flag word.
#[derive(Debug, PartialEq, Eq)]
pub struct BitSpec {
    pub name: &'static str,
    pub bit: u8,
}

/// A decoded flag word together with the layout that gives its bits meaning.
#[derive(Clone, Copy, PartialEq)]
pub struct FlagSet {
    word: u64,
    layout: &'static [BitSpec],
}

impl FlagSet {
    /// Decodes a hex flag word against a layout. Malformed text decodes to an
    /// all-false set, same as [`codec::hex_word`].
    pub fn decode(text: &str, layout: &'static [BitSpec]) -> Self {
        Self {
            word: codec::hex_word(text),
            layout,
        }
    }

    /// The set every protocol revision without this word degrades to.
    pub fn all_false(layout: &'static [BitSpec]) -> Self {
        Self { word: 0, layout }
    }

    /// Whether the named flag is set. Names absent from the layout read as
    /// false.
    pub fn is_set(&self, name: &str) -> bool {
        self.layout
            .iter()
            .any(|spec| spec.name == name && self.word & (1 << spec.bit) != 0)
    }

    pub fn word(&self) -> u64 {
        self.word
    }

    /// Iterates every named flag with its current value.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.layout
            .iter()
            .map(|spec| (spec.name, self.word & (1 << spec.bit) != 0))
    }
}

impl fmt::Debug for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let set: Vec<&str> = self
            .iter()
            .filter_map(|(name, on)| on.then_some(name))
            .collect();
        f.debug_struct("FlagSet")
            .field("word", &format_args!("{:#x}", self.word))
            .field("set", &set)
            .finish()
    }
}
