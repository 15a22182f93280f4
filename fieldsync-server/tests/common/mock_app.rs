use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use fieldsync_api::adapter::WireFormat;
use fieldsync_api::codec::FILETIME_UNIX_OFFSET;
use fieldsync_api::models::DeviceId;
use fieldsync_api::sink::{Notifier, NoticeLevel, Rgb, VisualSink};
use fieldsync_server::services::monitor::Monitor;

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Highlight {
        device: DeviceId,
        color: Rgb,
        intensity: f32,
    },
    Pose {
        device: DeviceId,
        position: [f32; 3],
    },
}

/// Records every scene update the monitor issues.
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn highlights(&self) -> Vec<(DeviceId, f32)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Highlight {
                    device, intensity, ..
                } => Some((device, intensity)),
                SinkCall::Pose { .. } => None,
            })
            .collect()
    }
}

impl VisualSink for RecordingSink {
    fn set_highlight(&self, device: DeviceId, color: Rgb, intensity: f32) {
        self.calls.lock().unwrap().push(SinkCall::Highlight {
            device,
            color,
            intensity,
        });
    }

    fn set_pose(&self, device: DeviceId, position: [f32; 3], _rotation: [f32; 3], _transition_ms: u32) {
        self.calls
            .lock()
            .unwrap()
            .push(SinkCall::Pose { device, position });
    }
}

/// Records every user notice the monitor raises.
pub struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            notices: Mutex::new(Vec::new()),
        })
    }

    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, text: &str) {
        self.notices.lock().unwrap().push((level, text.to_string()));
    }
}

/// A monitor wired to recording sinks, plus builders for wire payloads.
pub struct MockApp {
    pub monitor: Monitor,
    pub sink: Arc<RecordingSink>,
    pub notifier: Arc<RecordingNotifier>,
}

impl MockApp {
    pub fn new(format: WireFormat) -> Self {
        let sink = RecordingSink::new();
        let notifier = RecordingNotifier::new();
        Self {
            monitor: Monitor::new(format, sink.clone(), notifier.clone()),
            sink,
            notifier,
        }
    }
}

/// FILETIME hex encoding of a Unix epoch millisecond instant.
pub fn filetime_hex(unix_ms: i64) -> String {
    let ticks = unix_ms as i128 * 10_000 + FILETIME_UNIX_OFFSET;
    format!("{:016X}", ticks as u64)
}

pub fn flat_axis_record(name: &str, st: &str, pos: &str) -> Value {
    json!({
        "typ": "NcAxis",
        "name": name,
        "st": st,
        "act": "3",
        "diag": "1",
        "pos": pos,
        "wpos": pos,
        "vel": "00000000",
    })
}

pub fn flat_valve_record(name: &str, st: &str, pst: &str, unix_ms: i64) -> Value {
    json!({
        "typ": "PnValve",
        "name": name,
        "st": st,
        "pst": pst,
        "rcp": "1",
        "ts": filetime_hex(unix_ms),
    })
}

pub fn flat_frame(records: Vec<Value>) -> String {
    json!({ "data": records }).to_string()
}

pub fn packed_frame(records: Vec<Value>) -> String {
    json!({ "pack": records }).to_string()
}

pub fn packed_axis_record(name: &str, st: &str, pos: &str) -> Value {
    json!({
        "NcAxis": {
            "name": name,
            "st": { "typ": "WORD", "val": st },
            "pos": { "typ": "REAL", "val": pos },
            "wpos": { "typ": "REAL", "val": pos },
            "vel": { "typ": "REAL", "val": "00000000" },
        }
    })
}

pub fn error_event(src: &str, lvl: &str, msg: &str, utc: i64) -> String {
    json!({ "utc": utc, "lvl": lvl, "src": src, "msg": msg }).to_string()
}
