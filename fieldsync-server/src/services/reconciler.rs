//! Applies parsed telemetry frames to registry entries.
//!
//! Writes are last-write-wins: a frame that yields a relevant record for the
//! device replaces the class state wholesale. A frame without one leaves the
//! entry untouched, including its `last_update` stamp.

use time::OffsetDateTime;

use fieldsync_api::adapter::{FrameError, TelemetryFrame, WireFormat};
use fieldsync_api::models::{AxisReading, DeviceClass, ValveReading};
use fieldsync_api::sink::VisualSink;

use crate::services::registry::{ClassState, DeviceState};
use crate::services::tracker;

/// What applying a payload did to the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// The frame was well-formed but carried no relevant record for the
    /// device. Routine when several devices share a topic.
    NoRecord,
}

/// Parses a payload against the configured shape and applies the record
/// addressed to this device, if any.
pub fn apply_payload(
    state: &mut DeviceState,
    payload: &str,
    format: WireFormat,
    sink: &dyn VisualSink,
) -> Result<Applied, FrameError> {
    let frame = TelemetryFrame::parse(payload, format)?;
    let applied = match state.class() {
        DeviceClass::Axis => match frame.extract_axis(&state.name) {
            Some(reading) => {
                apply_axis(state, reading, sink);
                Applied::Updated
            }
            None => Applied::NoRecord,
        },
        DeviceClass::Valve => match frame.extract_valve(&state.name) {
            Some(reading) => {
                apply_valve(state, reading);
                Applied::Updated
            }
            None => Applied::NoRecord,
        },
    };
    if applied == Applied::NoRecord {
        tracing::debug!(device = %state.name, "frame carries no record for this device");
    }
    Ok(applied)
}

fn apply_axis(state: &mut DeviceState, reading: AxisReading, sink: &dyn VisualSink) {
    let ClassState::Axis(axis) = &mut state.body else {
        return;
    };
    axis.motion = reading.motion;
    axis.activity = reading.activity;
    axis.status = reading.status;
    axis.position = reading.position;
    axis.world_position = reading.world_position;
    axis.velocity = reading.velocity;
    state.last_update = Some(OffsetDateTime::now_utc());

    if let Some(pose) = &state.pose {
        let (position, rotation) = pose.project(reading.world_position);
        sink.set_pose(state.id, position, rotation, pose.transition_ms);
    }
}

fn apply_valve(state: &mut DeviceState, reading: ValveReading) {
    let ClassState::Valve(valve) = &mut state.body else {
        return;
    };
    let previous = valve.position;
    valve.state = reading.state;
    valve.flags = reading.flags;
    valve.position = reading.position;
    valve.recipe = reading.recipe;
    tracker::observe(valve, previous, reading.position, reading.timestamp_ms);
    state.last_update = Some(OffsetDateTime::now_utc());
}

#[cfg(test)]
mod tests {
    use super::*;

    use fieldsync_api::models::{DeviceId, GenericState, MotionState, PositionState};

    use crate::services::registry::{AxisChannels, AxisState, ValveState};

    struct NullSink;

    impl VisualSink for NullSink {
        fn set_highlight(&self, _: DeviceId, _: [f32; 3], _: f32) {}
        fn set_pose(&self, _: DeviceId, _: [f32; 3], _: [f32; 3], _: u32) {}
    }

    fn axis_device() -> DeviceState {
        DeviceState::new(
            DeviceId::new(),
            "Axis_1",
            ClassState::Axis(AxisState::new(AxisChannels::default())),
        )
    }

    fn valve_device() -> DeviceState {
        DeviceState::new(DeviceId::new(), "Valve_K3", ClassState::Valve(ValveState::new(31)))
    }

    fn flat_axis_payload(st: &str, pos: &str) -> String {
        format!(
            r#"{{"data":[{{"typ":"NcAxis","name":"Axis_1","st":"{st}","act":"3",
                "diag":"1","pos":"{pos}","wpos":"{pos}","vel":"00000000"}}]}}"#
        )
    }

    #[test]
    fn relevant_record_replaces_axis_state() {
        let mut device = axis_device();
        let applied = apply_payload(
            &mut device,
            &flat_axis_payload("2", "3F800000"),
            WireFormat::Flat,
            &NullSink,
        )
        .unwrap();

        assert_eq!(applied, Applied::Updated);
        let axis = device.axis().unwrap();
        assert_eq!(axis.motion, MotionState::Executing);
        assert_eq!(axis.position, 1.0);
        assert!(device.last_update.is_some());
    }

    #[test]
    fn frame_without_a_record_changes_nothing() {
        let mut device = axis_device();
        apply_payload(
            &mut device,
            &flat_axis_payload("2", "3F800000"),
            WireFormat::Flat,
            &NullSink,
        )
        .unwrap();
        let before = device.clone();

        let foreign = r#"{"data":[{"typ":"NcAxis","name":"Axis_9","st":"6","act":"0",
            "diag":"0","pos":"00000000","wpos":"00000000","vel":"00000000"}]}"#;
        let applied = apply_payload(&mut device, foreign, WireFormat::Flat, &NullSink).unwrap();

        assert_eq!(applied, Applied::NoRecord);
        assert_eq!(device, before);
    }

    #[test]
    fn shape_mismatch_leaves_the_snapshot_identical() {
        let mut device = axis_device();
        apply_payload(
            &mut device,
            &flat_axis_payload("2", "3F800000"),
            WireFormat::Flat,
            &NullSink,
        )
        .unwrap();
        let before = device.clone();

        let packed = r#"{"pack":[{"NcAxis":{"name":"Axis_1","st":{"typ":"WORD","val":"6"}}}]}"#;
        let err = apply_payload(&mut device, packed, WireFormat::Flat, &NullSink).unwrap_err();

        assert!(matches!(err, FrameError::ShapeMismatch { .. }));
        assert_eq!(device, before);
    }

    #[test]
    fn malformed_payload_leaves_the_snapshot_identical() {
        let mut device = valve_device();
        let before = device.clone();
        let err = apply_payload(&mut device, "{not json", WireFormat::Flat, &NullSink).unwrap_err();
        assert!(matches!(err, FrameError::Parse(_)));
        assert_eq!(device, before);
    }

    #[test]
    fn valve_updates_run_the_duration_tracker() {
        let mut device = valve_device();
        let start = format!(
            r#"{{"data":[{{"typ":"PnValve","name":"Valve_K3","st":"2","pst":"8","rcp":"1","ts":"{}"}}]}}"#,
            filetime_hex(1_000)
        );
        let arrive = format!(
            r#"{{"data":[{{"typ":"PnValve","name":"Valve_K3","st":"1","pst":"2","rcp":"1","ts":"{}"}}]}}"#,
            filetime_hex(1_900)
        );

        apply_payload(&mut device, &start, WireFormat::Flat, &NullSink).unwrap();
        assert_eq!(device.valve().unwrap().position, PositionState::MovingToWork);

        apply_payload(&mut device, &arrive, WireFormat::Flat, &NullSink).unwrap();
        let valve = device.valve().unwrap();
        assert_eq!(valve.position, PositionState::ArrivedAtWork);
        assert_eq!(valve.state, GenericState::Idle);
        assert_eq!(valve.last_forward_ms, Some(900));
    }

    fn filetime_hex(unix_ms: i64) -> String {
        let ticks = unix_ms as i128 * 10_000 + fieldsync_api::codec::FILETIME_UNIX_OFFSET;
        format!("{:016X}", ticks as u64)
    }
}
