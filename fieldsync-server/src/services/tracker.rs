//! Stroke time measurement for two-position valves.
//!
//! All arithmetic here runs on device-reported timestamps. The host clock
//! stays out of it: telemetry can arrive batched or delayed, and mixing clock
//! domains would fold that transport jitter into the measurements.

use fieldsync_api::models::PositionState;

use crate::services::registry::ValveState;

/// Feeds one observed position transition into the valve's measurements.
///
/// Repeated observations of the same state are no-ops, a device resting in an
/// arrived position must not re-trigger duration math. An arrival always
/// consumes the pending start mark, even when it cannot be attributed to a
/// matching move.
pub fn observe(valve: &mut ValveState, previous: PositionState, current: PositionState, timestamp_ms: i64) {
    if current == previous {
        return;
    }
    match current {
        PositionState::MovingToBase | PositionState::MovingToWork => {
            valve.move_started_at = Some(timestamp_ms);
        }
        PositionState::ArrivedAtBase | PositionState::ArrivedAtWork => {
            let Some(started_at) = valve.move_started_at.take() else {
                tracing::debug!(
                    ?current,
                    "arrival without a recorded move start, no duration measured"
                );
                return;
            };
            let duration_ms = timestamp_ms - started_at;
            match (previous, current) {
                (PositionState::MovingToWork, PositionState::ArrivedAtWork) => {
                    valve.last_forward_ms = Some(duration_ms);
                }
                (PositionState::MovingToBase, PositionState::ArrivedAtBase) => {
                    valve.last_backward_ms = Some(duration_ms);
                }
                _ => {
                    tracing::debug!(
                        ?previous,
                        ?current,
                        "arrival does not complete a matching move, duration discarded"
                    );
                }
            }
        }
        PositionState::Unknown => {}
    }
}
