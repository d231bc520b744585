use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::audio_models::AudioDevice;
use crate::traits::connectivity_sink::ConnectivitySink;

/// Shared control block for one open stream.
///
/// The module holds it weakly; the `StreamContext` handed to the data path
/// holds it strongly. Once every strong reference is gone the stream is
/// considered closed and the registry prunes the entry lazily.
pub struct StreamControl {
    port_config_id: i32,
    connected_devices: Mutex<Vec<AudioDevice>>,
    sink: Option<Arc<dyn ConnectivitySink>>,
}

impl StreamControl {
    pub(crate) fn new(
        port_config_id: i32,
        connected_devices: Vec<AudioDevice>,
        sink: Option<Arc<dyn ConnectivitySink>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            port_config_id,
            connected_devices: Mutex::new(connected_devices),
            sink,
        })
    }

    pub fn port_config_id(&self) -> i32 {
        self.port_config_id
    }

    /// Devices this stream can currently reach. Empty means unwired, which
    /// is a normal state, not an error.
    pub fn connected_devices(&self) -> Vec<AudioDevice> {
        self.connected_devices.lock().clone()
    }

    /// Whether the stream is currently wired to at least one device.
    pub fn is_connected(&self) -> bool {
        !self.connected_devices.lock().is_empty()
    }

    /// Store `devices`, returning whether the list actually changed.
    /// Drives "no change, no notification".
    pub(crate) fn replace_connected_devices(&self, devices: &[AudioDevice]) -> bool {
        let mut current = self.connected_devices.lock();
        if *current == devices {
            return false;
        }
        *current = devices.to_vec();
        true
    }

    /// Invoke the sink with the given payload. Called with no graph lock
    /// held.
    pub(crate) fn notify_sink(&self, devices: &[AudioDevice]) {
        if let Some(sink) = &self.sink {
            sink.on_connected_devices_changed(devices);
        }
    }
}

impl std::fmt::Debug for StreamControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamControl")
            .field("port_config_id", &self.port_config_id)
            .field("connected_devices", &*self.connected_devices.lock())
            .finish()
    }
}

/// Handle returned from a successful stream open.
///
/// Carries what the data-path implementation needs: the binding, the
/// validated buffer geometry, and the shared control block.
#[derive(Clone)]
pub struct StreamContext {
    pub port_config_id: i32,
    pub buffer_size_frames: i64,
    pub frame_size_bytes: usize,
    pub control: Arc<StreamControl>,
}

/// Open streams, held weakly by the port config id they are bound to.
///
/// The registry never owns a stream; dead entries (all strong references
/// dropped) are pruned on access, so exclusivity checks and connectivity
/// propagation never see ghost streams.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: BTreeMap<i32, Weak<StreamControl>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, control: &Arc<StreamControl>) {
        self.streams
            .insert(control.port_config_id(), Arc::downgrade(control));
    }

    /// Live stream bound to the config, pruning a dead entry on the way.
    pub fn get(&mut self, port_config_id: i32) -> Option<Arc<StreamControl>> {
        let upgraded = self.streams.get(&port_config_id)?.upgrade();
        if upgraded.is_none() {
            log::debug!("pruning dead stream on port config {port_config_id}");
            self.streams.remove(&port_config_id);
        }
        upgraded
    }

    pub fn contains(&mut self, port_config_id: i32) -> bool {
        self.get(port_config_id).is_some()
    }

    /// Unbind the stream from its config; returns the control block if it
    /// was still live.
    pub fn remove(&mut self, port_config_id: i32) -> Option<Arc<StreamControl>> {
        self.streams
            .remove(&port_config_id)
            .and_then(|weak| weak.upgrade())
    }
}
