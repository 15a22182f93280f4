//! Correlates asynchronous plant error events with bound devices and manages
//! acknowledgment of the per-device error rings.
//!
//! Correlation is by reported source name, matched with the same class rules
//! as telemetry. An event may hit several devices when duplicates of a name
//! are bound; each device gets its own independent entry.

use fieldsync_api::message::{ErrorEvent, ErrorLevel};
use fieldsync_api::models::DeviceId;
use fieldsync_api::sink::{ERROR_HIGHLIGHT, NO_HIGHLIGHT, VisualSink};

use crate::services::registry::{DeviceRegistry, ErrorEntry};

/// Records one plant error event on every device whose name matches its
/// source. Error-level events force the device into an error condition and
/// light up its visual sink. Returns how many devices matched.
pub fn record_error(
    registry: &mut DeviceRegistry,
    event: &ErrorEvent,
    raw_payload: &str,
    sink: &dyn VisualSink,
) -> usize {
    let level = event.level();
    let mut matched = 0;

    for device in registry.devices_mut() {
        if !device.class().names_match(&event.src, &device.name) {
            continue;
        }
        matched += 1;
        device.push_error(ErrorEntry {
            timestamp_ms: event.utc,
            level,
            source: event.src.clone(),
            message: event.message().to_string(),
            raw_payload: raw_payload.to_string(),
            acknowledged: false,
        });
        if level == ErrorLevel::Error {
            device.force_error_state();
            sink.set_highlight(device.id, ERROR_HIGHLIGHT, 1.0);
        }
    }

    if matched == 0 {
        tracing::debug!(source = %event.src, "error event matches no bound device");
    }
    matched
}

/// Acknowledges the entry at `index` in the device's error ring, newest
/// first. Unknown devices and out-of-range indices are silent no-ops.
pub fn acknowledge(registry: &mut DeviceRegistry, id: DeviceId, index: usize, sink: &dyn VisualSink) {
    let Some(device) = registry.lookup_mut(id) else {
        return;
    };
    let Some(entry) = device.errors.get_mut(index) else {
        return;
    };
    entry.acknowledged = true;
    if device.unacknowledged() == 0 {
        device.clear_error_state();
        sink.set_highlight(device.id, NO_HIGHLIGHT, 0.0);
    }
}

/// Empties the device's error ring and clears its error condition.
pub fn acknowledge_all(registry: &mut DeviceRegistry, id: DeviceId, sink: &dyn VisualSink) {
    let Some(device) = registry.lookup_mut(id) else {
        return;
    };
    device.errors.clear();
    device.clear_error_state();
    sink.set_highlight(device.id, NO_HIGHLIGHT, 0.0);
}

/// Applies a host-wide acknowledgment broadcast: every entry of each listed
/// device is marked acknowledged, the rings themselves are kept.
pub fn acknowledge_bulk(registry: &mut DeviceRegistry, ids: &[DeviceId], sink: &dyn VisualSink) {
    for &id in ids {
        let Some(device) = registry.lookup_mut(id) else {
            continue;
        };
        for entry in device.errors.iter_mut() {
            entry.acknowledged = true;
        }
        device.clear_error_state();
        sink.set_highlight(device.id, NO_HIGHLIGHT, 0.0);
    }
}
