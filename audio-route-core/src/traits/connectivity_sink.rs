use crate::models::audio_models::AudioDevice;

/// Per-stream notification capability for routing changes.
///
/// The module invokes this after a patch change alters which devices the
/// stream's port config can reach. Calls are made with no graph lock held,
/// so a slow implementation cannot stall unrelated graph operations; it
/// should still return promptly.
///
/// Notifications are deduplicated: a routing change that leaves the
/// stream's device set unchanged produces no call.
pub trait ConnectivitySink: Send + Sync {
    /// The stream's reachable device set changed. An empty slice means the
    /// stream is currently not wired to any device.
    fn on_connected_devices_changed(&self, devices: &[AudioDevice]);
}
