//! Single-owner core of the agent. One `Monitor` instance holds the
//! registry and the host sinks; the bus task drives it one message at a
//! time from behind an async mutex, so none of the state below needs its
//! own locking.

use std::sync::Arc;

use time::OffsetDateTime;

use fieldsync_api::adapter::{FrameError, WireFormat};
use fieldsync_api::message::{AckEvent, ErrorEvent};
use fieldsync_api::models::{DeviceClass, DeviceId};
use fieldsync_api::sink::{Notifier, NoticeLevel, VisualSink};

use crate::services::correlator;
use crate::services::reconciler;
use crate::services::registry::{
    AxisChannels, AxisState, ClassState, DeviceRegistry, DeviceState, PoseMap, ValveState,
};

/// Condensed per-device view for polling readers.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSummary {
    pub id: DeviceId,
    pub name: String,
    pub class: DeviceClass,
    pub error_active: bool,
    pub unacknowledged: usize,
    pub last_update: Option<OffsetDateTime>,
}

pub struct Monitor {
    format: WireFormat,
    registry: DeviceRegistry,
    sink: Arc<dyn VisualSink>,
    notifier: Arc<dyn Notifier>,
}

impl Monitor {
    pub fn new(format: WireFormat, sink: Arc<dyn VisualSink>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            format,
            registry: DeviceRegistry::new(),
            sink,
            notifier,
        }
    }

    pub fn format(&self) -> WireFormat {
        self.format
    }

    /// Binds an axis under a fresh handle.
    pub fn bind_axis(
        &mut self,
        name: &str,
        channels: AxisChannels,
        pose: Option<PoseMap>,
    ) -> DeviceId {
        let state = DeviceState::new(
            DeviceId::new(),
            name,
            ClassState::Axis(AxisState::new(channels)),
        )
        .with_pose(pose);
        self.registry.register(state).id
    }

    /// Binds a valve under a fresh handle.
    pub fn bind_valve(&mut self, name: &str, function_no: u32, pose: Option<PoseMap>) -> DeviceId {
        let state = DeviceState::new(
            DeviceId::new(),
            name,
            ClassState::Valve(ValveState::new(function_no)),
        )
        .with_pose(pose);
        self.registry.register(state).id
    }

    /// Releases a device. Unknown handles are a no-op, so a message that
    /// raced the removal resolves to nothing instead of an error.
    pub fn unbind(&mut self, id: DeviceId) {
        if self.registry.unregister(id).is_none() {
            tracing::debug!(%id, "unbind for an unknown device");
        }
    }

    pub fn device(&self, id: DeviceId) -> Option<&DeviceState> {
        self.registry.lookup(id)
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceState> {
        self.registry.devices()
    }

    pub fn clear(&mut self) {
        self.registry.clear();
    }

    /// Command channel numbers of an axis, snapshotted for use outside the
    /// monitor lock.
    pub fn axis_channels(&self, id: DeviceId) -> Option<AxisChannels> {
        self.registry.lookup(id)?.axis().map(|axis| axis.channels)
    }

    /// Controller function number of a valve, snapshotted likewise.
    pub fn valve_function(&self, id: DeviceId) -> Option<u32> {
        self.registry.lookup(id)?.valve().map(|valve| valve.function_no)
    }

    pub fn snapshot(&self) -> Vec<DeviceSummary> {
        self.registry
            .devices()
            .map(|device| DeviceSummary {
                id: device.id,
                name: device.name.clone(),
                class: device.class(),
                error_active: device.error_active,
                unacknowledged: device.unacknowledged(),
                last_update: device.last_update,
            })
            .collect()
    }

    /// Telemetry entry point for one raw payload addressed to one device.
    ///
    /// Never propagates: whatever goes wrong is reported here and the
    /// message dropped, leaving the prior state intact.
    pub fn apply_telemetry(&mut self, id: DeviceId, payload: &str) {
        let Some(state) = self.registry.lookup_mut(id) else {
            tracing::debug!(%id, "telemetry for an unbound device dropped");
            return;
        };
        match reconciler::apply_payload(state, payload, self.format, self.sink.as_ref()) {
            Ok(_) => {}
            Err(err @ FrameError::ShapeMismatch { .. }) => {
                tracing::error!(device = %state.name, %err, "telemetry rejected");
                self.notifier.notify(
                    NoticeLevel::Warning,
                    &format!("Telemetry format mismatch on {}: {err}", state.name),
                );
            }
            Err(err) => {
                tracing::error!(%id, %err, "telemetry payload rejected");
            }
        }
    }

    /// Entry point for one raw payload from the shared error topic.
    pub fn record_error(&mut self, payload: &str) {
        match serde_json::from_str::<ErrorEvent>(payload) {
            Ok(event) => {
                correlator::record_error(&mut self.registry, &event, payload, self.sink.as_ref());
            }
            Err(err) => tracing::error!(%err, "malformed error event dropped"),
        }
    }

    /// Entry point for one raw payload from the acknowledgment topic.
    pub fn apply_ack_event(&mut self, payload: &str) {
        let event: AckEvent = match serde_json::from_str(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(%err, "malformed acknowledgment event dropped");
                return;
            }
        };
        let ids: Vec<DeviceId> = event
            .items
            .iter()
            .filter_map(|item| match item.node_id.parse() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::debug!(node_id = %item.node_id, "unparsable node id skipped");
                    None
                }
            })
            .collect();
        correlator::acknowledge_bulk(&mut self.registry, &ids, self.sink.as_ref());
    }

    pub fn acknowledge(&mut self, id: DeviceId, index: usize) {
        correlator::acknowledge(&mut self.registry, id, index, self.sink.as_ref());
    }

    pub fn acknowledge_all(&mut self, id: DeviceId) {
        correlator::acknowledge_all(&mut self.registry, id, self.sink.as_ref());
    }
}
