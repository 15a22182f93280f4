//! Default host sinks for running the agent headless. A host embedding the
//! monitor as a library supplies its own implementations instead.

use fieldsync_api::models::DeviceId;
use fieldsync_api::sink::{Notifier, NoticeLevel, Rgb, VisualSink};

/// Routes scene updates to the log.
pub struct LogSink;

impl VisualSink for LogSink {
    fn set_highlight(&self, device: DeviceId, color: Rgb, intensity: f32) {
        tracing::info!(%device, ?color, intensity, "highlight");
    }

    fn set_pose(&self, device: DeviceId, position: [f32; 3], rotation: [f32; 3], transition_ms: u32) {
        tracing::debug!(%device, ?position, ?rotation, transition_ms, "pose");
    }
}

/// Routes user notices to the log at their matching level.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NoticeLevel, text: &str) {
        match level {
            NoticeLevel::Info => tracing::info!("{text}"),
            NoticeLevel::Warning => tracing::warn!("{text}"),
            NoticeLevel::Error => tracing::error!("{text}"),
        }
    }
}
