//! Asynchronous plant events broadcast on the shared event topics.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of a plant error event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorLevel {
    Info,
    Warning,
    Error,
}

/// Message body of an error event. Different controller generations emit a
/// plain string, an object with the text under `txt` or `text`, or nothing
/// usable at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventMessage {
    Text(String),
    Fields {
        #[serde(default)]
        txt: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    Other(Value),
}

impl EventMessage {
    pub const PLACEHOLDER: &'static str = "(no message)";

    /// The human-readable text, tried as plain string, then `txt`, then
    /// `text`, then a fixed placeholder.
    pub fn extract(&self) -> &str {
        match self {
            EventMessage::Text(text) => text,
            EventMessage::Fields { txt: Some(text), .. } => text,
            EventMessage::Fields { text: Some(text), .. } => text,
            _ => Self::PLACEHOLDER,
        }
    }
}

/// A plant error event as published on the error topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Device-reported timestamp, Unix epoch milliseconds.
    pub utc: i64,
    /// Severity tag, `ERR` or `WARN`; anything else is informational.
    #[serde(default)]
    pub lvl: String,
    /// Reported source device name.
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub msg: Option<EventMessage>,
}

impl ErrorEvent {
    pub fn level(&self) -> ErrorLevel {
        match self.lvl.as_str() {
            "ERR" => ErrorLevel::Error,
            "WARN" => ErrorLevel::Warning,
            _ => ErrorLevel::Info,
        }
    }

    pub fn message(&self) -> &str {
        self.msg
            .as_ref()
            .map(EventMessage::extract)
            .unwrap_or(EventMessage::PLACEHOLDER)
    }
}

/// Host-wide acknowledgment broadcast listing log entries cleared elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckEvent {
    pub items: Vec<AckItem>,
}

/// One acknowledged item; `nodeId` carries the device handle as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckItem {
    #[serde(rename = "nodeId")]
    pub node_id: String,
}
