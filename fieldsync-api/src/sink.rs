//! Host integration traits. The monitoring core drives whatever scene and
//! notification surface the embedding host provides through these, so the
//! core itself stays free of any rendering or UI dependency.

use crate::models::DeviceId;

/// RGB color in the host scene, each channel in `0.0..=1.0`.
pub type Rgb = [f32; 3];

/// Styling applied to a device carrying an unacknowledged error.
pub const ERROR_HIGHLIGHT: Rgb = [1.0, 0.0, 0.0];

/// Color handed over together with intensity 0 when a highlight is removed.
pub const NO_HIGHLIGHT: Rgb = [0.0, 0.0, 0.0];

/// Severity of a user-facing notification raised by the monitoring core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Visual representation of monitored devices in the host scene.
pub trait VisualSink: Send + Sync {
    /// Tint a device. An intensity of 0.0 restores the regular material.
    fn set_highlight(&self, device: DeviceId, color: Rgb, intensity: f32);

    /// Reposition a device, interpolated over `transition_ms`.
    fn set_pose(&self, device: DeviceId, position: [f32; 3], rotation: [f32; 3], transition_ms: u32);
}

/// User-facing notification surface of the host.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, text: &str);
}
