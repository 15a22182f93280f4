use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use serde::Deserialize;
use time::OffsetDateTime;

use fieldsync_api::message::ErrorLevel;
use fieldsync_api::models::{
    AXIS_ACTIVITY_LAYOUT, AXIS_STATUS_LAYOUT, DeviceClass, DeviceId, FlagSet, GenericState,
    MotionState, PositionState, VALVE_POSITION_LAYOUT,
};

/// Retained error entries per device. The newest entry sits at the front;
/// pushing beyond the bound evicts the oldest.
pub const MAX_DEVICE_ERRORS: usize = 20;

/// One entry of a device's error ring.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    /// Device-reported timestamp, Unix epoch milliseconds.
    pub timestamp_ms: i64,
    pub level: ErrorLevel,
    /// Source name exactly as reported on the wire.
    pub source: String,
    pub message: String,
    /// Original event JSON, kept verbatim for inspection.
    pub raw_payload: String,
    pub acknowledged: bool,
}

/// Controller function block numbers for commanding an axis. 0 means the
/// channel is not configured and commands are disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisChannels {
    pub axis_no: u32,
    pub move_no: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AxisState {
    pub channels: AxisChannels,
    pub motion: MotionState,
    pub activity: FlagSet,
    pub status: FlagSet,
    pub position: f32,
    pub world_position: f32,
    pub velocity: f32,
}

impl AxisState {
    pub fn new(channels: AxisChannels) -> Self {
        Self {
            channels,
            motion: MotionState::Unknown,
            activity: FlagSet::all_false(AXIS_ACTIVITY_LAYOUT),
            status: FlagSet::all_false(AXIS_STATUS_LAYOUT),
            position: 0.0,
            world_position: 0.0,
            velocity: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValveState {
    /// Controller function block number, 0 when commands are disabled.
    pub function_no: u32,
    pub state: GenericState,
    pub flags: FlagSet,
    pub position: PositionState,
    pub recipe: u32,
    /// Device timestamp of the transition into a moving state, if one is in
    /// flight. Stroke durations are pure device time, the host clock never
    /// enters this math.
    pub move_started_at: Option<i64>,
    pub last_forward_ms: Option<i64>,
    pub last_backward_ms: Option<i64>,
}

impl ValveState {
    pub fn new(function_no: u32) -> Self {
        Self {
            function_no,
            state: GenericState::Unknown,
            flags: FlagSet::all_false(VALVE_POSITION_LAYOUT),
            position: PositionState::Unknown,
            recipe: 0,
            move_started_at: None,
            last_forward_ms: None,
            last_backward_ms: None,
        }
    }
}

/// Class-specific half of a device's state.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassState {
    Axis(AxisState),
    Valve(ValveState),
}

impl ClassState {
    pub fn class(&self) -> DeviceClass {
        match self {
            ClassState::Axis(_) => DeviceClass::Axis,
            ClassState::Valve(_) => DeviceClass::Valve,
        }
    }
}

fn default_transition_ms() -> u32 {
    250
}

/// Projection of a device's scalar world position into a host scene pose.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PoseMap {
    pub origin: [f32; 3],
    /// Travel direction for linear devices, rotation axis scaling for rotary
    /// ones.
    pub travel: [f32; 3],
    #[serde(default)]
    pub rotary: bool,
    /// Interpolation window handed to the host, milliseconds.
    #[serde(default = "default_transition_ms")]
    pub transition_ms: u32,
}

impl PoseMap {
    /// Maps a world position onto `(position, rotation)` for the host scene.
    pub fn project(&self, world_position: f32) -> ([f32; 3], [f32; 3]) {
        if self.rotary {
            let rotation = [
                self.travel[0] * world_position,
                self.travel[1] * world_position,
                self.travel[2] * world_position,
            ];
            (self.origin, rotation)
        } else {
            let position = [
                self.origin[0] + self.travel[0] * world_position,
                self.origin[1] + self.travel[1] * world_position,
                self.origin[2] + self.travel[2] * world_position,
            ];
            (position, [0.0, 0.0, 0.0])
        }
    }
}

/// Everything the agent knows about one bound device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceState {
    pub id: DeviceId,
    /// Configured name telemetry and events are matched against.
    pub name: String,
    pub body: ClassState,
    pub pose: Option<PoseMap>,
    /// Error ring, newest first.
    pub errors: VecDeque<ErrorEntry>,
    /// Set while the device carries an unacknowledged error-level entry.
    pub error_active: bool,
    /// Host wall clock of the last applied telemetry.
    pub last_update: Option<OffsetDateTime>,
}

impl DeviceState {
    pub fn new(id: DeviceId, name: impl Into<String>, body: ClassState) -> Self {
        Self {
            id,
            name: name.into(),
            body,
            pose: None,
            errors: VecDeque::new(),
            error_active: false,
            last_update: None,
        }
    }

    pub fn with_pose(mut self, pose: Option<PoseMap>) -> Self {
        self.pose = pose;
        self
    }

    pub fn class(&self) -> DeviceClass {
        self.body.class()
    }

    pub fn axis(&self) -> Option<&AxisState> {
        match &self.body {
            ClassState::Axis(axis) => Some(axis),
            ClassState::Valve(_) => None,
        }
    }

    pub fn valve(&self) -> Option<&ValveState> {
        match &self.body {
            ClassState::Valve(valve) => Some(valve),
            ClassState::Axis(_) => None,
        }
    }

    /// Prepends an entry, evicting the oldest beyond [`MAX_DEVICE_ERRORS`].
    pub fn push_error(&mut self, entry: ErrorEntry) {
        self.errors.push_front(entry);
        self.errors.truncate(MAX_DEVICE_ERRORS);
    }

    pub fn unacknowledged(&self) -> usize {
        self.errors.iter().filter(|entry| !entry.acknowledged).count()
    }

    /// Forces the device into an explicit error condition, as reported by an
    /// error-level plant event.
    pub fn force_error_state(&mut self) {
        self.error_active = true;
        match &mut self.body {
            ClassState::Axis(axis) => axis.motion = MotionState::Error,
            ClassState::Valve(valve) => valve.state = GenericState::Error,
        }
    }

    /// Clears the error condition flag. The class state itself stays until
    /// the next telemetry write, which is the only source of truth for it.
    pub fn clear_error_state(&mut self) {
        self.error_active = false;
    }
}

/// All bound devices, keyed by handle. Plain data; whoever owns it decides
/// how access is serialized.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceId, DeviceState>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a device, replacing any prior entry under the same handle.
    /// Callers release subscriptions tied to a replaced entry themselves.
    pub fn register(&mut self, state: DeviceState) -> &mut DeviceState {
        match self.devices.entry(state.id) {
            Entry::Occupied(mut slot) => {
                slot.insert(state);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(state),
        }
    }

    pub fn unregister(&mut self, id: DeviceId) -> Option<DeviceState> {
        self.devices.remove(&id)
    }

    pub fn lookup(&self, id: DeviceId) -> Option<&DeviceState> {
        self.devices.get(&id)
    }

    pub fn lookup_mut(&mut self, id: DeviceId) -> Option<&mut DeviceState> {
        self.devices.get_mut(&id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceState> {
        self.devices.values()
    }

    pub fn devices_mut(&mut self) -> impl Iterator<Item = &mut DeviceState> {
        self.devices.values_mut()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }
}
