//! Serde shapes of the two telemetry encodings found in the field.
//!
//! Newer controllers publish the flat shape: a `data` array of records whose
//! per-field values are plain hex strings. Legacy controllers publish the
//! packed shape: a `pack` array of single-key wrappers mapping the record tag
//! to a body whose scalar fields are `{typ, val}` pairs.
//!
//! Both shapes keep the per-class fields as raw JSON values. A record whose
//! field carries the wrong JSON type is simply not a usable record for that
//! field, it must not fail the whole frame.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One record of the flat telemetry shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatRecord {
    /// Record type tag, e.g. `NcAxis` or `PnValve`.
    pub typ: String,
    #[serde(default)]
    pub name: String,
    /// Remaining per-class fields, hex strings in well-formed records.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl FlatRecord {
    /// The named field, if present as a direct string.
    pub fn hex_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Whether every listed field is present as a direct string.
    pub fn has_hex_fields(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.hex_field(key).is_some())
    }
}

/// Envelope of the flat shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatFrame {
    pub data: Vec<FlatRecord>,
}

/// Inner body of a packed record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedBody {
    #[serde(default)]
    pub name: String,
    /// Remaining per-class fields, `{typ, val}` pairs in well-formed records.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl PackedBody {
    /// The `val` string of the named `{typ, val}` field, if shaped that way.
    pub fn hex_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key)?.get("val")?.as_str()
    }
}

/// One wrapper of the packed shape: a single-key map from record tag to body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackedRecord(pub BTreeMap<String, PackedBody>);

impl PackedRecord {
    pub fn body(&self, tag: &str) -> Option<&PackedBody> {
        self.0.get(tag)
    }
}

/// Envelope of the packed shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedFrame {
    pub pack: Vec<PackedRecord>,
}
