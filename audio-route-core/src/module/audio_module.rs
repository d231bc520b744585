use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::catalog::configuration::Configuration;
use crate::models::audio_models::{
    AudioDevice, AudioPatch, AudioPort, AudioPortConfig, AudioPortKind, AudioRoute,
};
use crate::models::controls::ModuleControls;
use crate::models::error::RouteError;
use crate::routing::patch_table::PatchTable;
use crate::routing::stream_registry::{StreamContext, StreamControl, StreamRegistry};
use crate::traits::connectivity_sink::ConnectivitySink;
use crate::traits::stream_factory::StreamFactory;

/// Fixed latency reported for every patch, in milliseconds.
pub const LATENCY_MS: u32 = 10;
/// Smallest stream buffer the module accepts.
pub const MIN_STREAM_BUFFER_SIZE_FRAMES: i64 = 16;
/// Largest stream buffer, as a byte count (1 GiB).
pub const MAX_STREAM_BUFFER_SIZE_BYTES: i64 = 1 << 30;

/// A connectivity update snapshotted under the graph lock and delivered
/// after it is released.
struct Notification {
    control: Arc<StreamControl>,
    devices: Vec<AudioDevice>,
}

/// All mutable graph state, guarded by one mutex.
struct ModuleInner {
    ports: BTreeMap<i32, AudioPort>,
    port_configs: BTreeMap<i32, AudioPortConfig>,
    routes: Vec<AudioRoute>,
    patches: BTreeMap<i32, AudioPatch>,
    patch_table: PatchTable,
    /// Ids of device ports created at runtime via `connect_external_device`.
    connected_device_ports: BTreeSet<i32>,
    streams: StreamRegistry,
    controls: ModuleControls,
    next_id: i32,
}

impl ModuleInner {
    fn alloc_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn port_config(&self, id: i32) -> Result<&AudioPortConfig, RouteError> {
        self.port_configs
            .get(&id)
            .ok_or_else(|| RouteError::InvalidArgument(format!("unknown port config id {id}")))
    }

    fn port_ids_from_port_config_ids(
        &self,
        config_ids: impl IntoIterator<Item = i32>,
    ) -> BTreeSet<i32> {
        config_ids
            .into_iter()
            .filter_map(|id| self.port_configs.get(&id).map(|c| c.port_id))
            .collect()
    }

    /// Every other port config sharing a patch with the given one.
    /// Excludes the config itself.
    fn find_connected_port_config_ids(&self, port_config_id: i32) -> BTreeSet<i32> {
        let mut connected = BTreeSet::new();
        for patch_id in self.patch_table.patches_for(port_config_id) {
            if let Some(patch) = self.patches.get(&patch_id) {
                connected.extend(patch.port_config_ids());
            }
        }
        connected.remove(&port_config_id);
        connected
    }

    /// Devices reachable from the given port config through any patch.
    /// Mix and session ports on the other side are filtered out.
    fn find_connected_devices(&self, port_config_id: i32) -> Vec<AudioDevice> {
        let mut devices: Vec<AudioDevice> = Vec::new();
        for id in self.find_connected_port_config_ids(port_config_id) {
            let Some(config) = self.port_configs.get(&id) else {
                continue;
            };
            let Some(port) = self.ports.get(&config.port_id) else {
                continue;
            };
            if let Some(device) = port.device() {
                if !devices.contains(device) {
                    devices.push(device.clone());
                }
            }
        }
        devices
    }

    fn route_allows(&self, source_port_id: i32, sink_port_id: i32) -> bool {
        self.routes
            .iter()
            .any(|r| r.sink_port_id == sink_port_id && r.source_port_ids.contains(&source_port_id))
    }

    /// Recompute connectivity for every touched port config and store it on
    /// the bound stream, if any. Returns the payloads whose device set
    /// actually changed, for delivery outside the lock.
    fn collect_connectivity(&mut self, touched: &BTreeSet<i32>) -> Vec<Notification> {
        let mut notifications = Vec::new();
        for &id in touched {
            if !self.port_configs.contains_key(&id) {
                continue;
            }
            let devices = self.find_connected_devices(id);
            if let Some(control) = self.streams.get(id) {
                if control.replace_connected_devices(&devices) {
                    notifications.push(Notification { control, devices });
                }
            }
        }
        notifications
    }
}

/// The graph manager for one audio module instance.
///
/// Owns the port and port config tables, the patch table, and the stream
/// registry behind a single `parking_lot::Mutex`: every mutating operation
/// both reads and writes the patch table and may cascade into the stream
/// registry, so they are serialized. Connectivity notifications are
/// snapshotted under the lock and delivered after it is released, so a slow
/// stream callback cannot stall unrelated graph operations.
///
/// The whole graph is in-memory, rebuilt from the [`Configuration`] catalog
/// at construction.
pub struct AudioModule {
    inner: Mutex<ModuleInner>,
}

impl AudioModule {
    /// Build the module from a catalog. The catalog's ports and seed
    /// configs become the initial tables; ids allocated at runtime start
    /// above the largest catalog id.
    pub fn new(config: Configuration) -> Self {
        let next_id = config
            .ports
            .iter()
            .map(|p| p.id)
            .chain(config.port_configs.iter().map(|c| c.id))
            .max()
            .unwrap_or(0);
        let ports = config.ports.into_iter().map(|p| (p.id, p)).collect();
        let port_configs = config
            .port_configs
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Self {
            inner: Mutex::new(ModuleInner {
                ports,
                port_configs,
                routes: config.routes,
                patches: BTreeMap::new(),
                patch_table: PatchTable::new(),
                connected_device_ports: BTreeSet::new(),
                streams: StreamRegistry::new(),
                controls: ModuleControls::default(),
                next_id,
            }),
        }
    }

    // --- External device lifecycle ---

    /// Connect an external device. `template` names a catalog device port
    /// by id and carries the device address; the returned port is a clone
    /// of the catalog port with a fresh id and the caller's address.
    /// Routes mentioning the template port are extended to the new port.
    pub fn connect_external_device(&self, template: &AudioPort) -> Result<AudioPort, RouteError> {
        let mut inner = self.inner.lock();

        let source = inner.ports.get(&template.id).ok_or_else(|| {
            RouteError::InvalidArgument(format!("unknown port id {}", template.id))
        })?;
        let AudioPortKind::Device(source_device) = &source.kind else {
            return Err(RouteError::InvalidArgument(format!(
                "port {} is not a device port",
                template.id
            )));
        };
        if inner.connected_device_ports.contains(&template.id) {
            return Err(RouteError::InvalidArgument(format!(
                "port {} is itself a connected device, not a template",
                template.id
            )));
        }
        let address = match template.device() {
            Some(device) if !device.address.is_empty() => device.address.clone(),
            _ => {
                return Err(RouteError::InvalidArgument(format!(
                    "device address is required to connect port {}",
                    template.id
                )))
            }
        };

        let device = AudioDevice {
            device_type: source_device.device_type,
            address,
        };
        let mut port = source.clone();
        let id = inner.alloc_id();
        port.id = id;
        port.kind = AudioPortKind::Device(device);

        // Clone routes that mention the template, substituting the new id.
        let extended: Vec<AudioRoute> = inner
            .routes
            .iter()
            .filter(|r| r.sink_port_id == template.id || r.source_port_ids.contains(&template.id))
            .map(|r| AudioRoute {
                source_port_ids: r
                    .source_port_ids
                    .iter()
                    .map(|&p| if p == template.id { id } else { p })
                    .collect(),
                sink_port_id: if r.sink_port_id == template.id {
                    id
                } else {
                    r.sink_port_id
                },
            })
            .collect();
        inner.routes.extend(extended);
        inner.ports.insert(id, port.clone());
        inner.connected_device_ports.insert(id);
        log::debug!("connected external device port {id} from template {}", template.id);
        Ok(port)
    }

    /// Disconnect a dynamically connected device port, tearing down every
    /// patch and stream still referencing its configs first. The cascade is
    /// an ordered sequence of idempotent steps: reset patches, close
    /// streams, remove configs, remove the port.
    pub fn disconnect_external_device(&self, port_id: i32) -> Result<(), RouteError> {
        let notifications = {
            let mut inner = self.inner.lock();

            if !inner.ports.contains_key(&port_id) {
                return Err(RouteError::InvalidArgument(format!(
                    "unknown port id {port_id}"
                )));
            }
            if !inner.connected_device_ports.contains(&port_id) {
                return Err(RouteError::InvalidArgument(format!(
                    "port {port_id} is not a connected external device"
                )));
            }

            let config_ids: BTreeSet<i32> = inner
                .port_configs
                .values()
                .filter(|c| c.port_id == port_id)
                .map(|c| c.id)
                .collect();

            // 1. Reset every patch touching the port or its configs.
            let mut patch_ids = inner.patch_table.patches_for(port_id);
            for &cid in &config_ids {
                patch_ids.extend(inner.patch_table.patches_for(cid));
            }
            let mut touched = BTreeSet::new();
            for pid in patch_ids {
                if let Some(patch) = inner.patches.remove(&pid) {
                    inner.patch_table.unregister(pid);
                    touched.extend(patch.port_config_ids());
                }
            }

            // 2. Close streams bound to the port's configs, telling them
            // they are unwired on the way out.
            let mut notifications = Vec::new();
            for &cid in &config_ids {
                touched.remove(&cid);
                if let Some(control) = inner.streams.remove(cid) {
                    if control.replace_connected_devices(&[]) {
                        notifications.push(Notification {
                            control,
                            devices: Vec::new(),
                        });
                    }
                }
            }

            // 3. Remove the configs.
            for &cid in &config_ids {
                inner.port_configs.remove(&cid);
            }

            // Defensive: the steps above clear every reference; anything
            // left is an internal consistency fault.
            if inner.patch_table.is_referenced(port_id)
                || config_ids
                    .iter()
                    .any(|&cid| inner.patch_table.is_referenced(cid) || inner.streams.contains(cid))
            {
                return Err(RouteError::IllegalState(format!(
                    "port {port_id} still referenced after cleanup"
                )));
            }

            // 4. Remove the port, its routes, and the connected-device entry.
            inner
                .routes
                .retain(|r| r.sink_port_id != port_id && !r.source_port_ids.contains(&port_id));
            inner.ports.remove(&port_id);
            inner.connected_device_ports.remove(&port_id);

            // Streams on the surviving side of removed patches see the change.
            notifications.extend(inner.collect_connectivity(&touched));
            log::debug!("disconnected external device port {port_id}");
            notifications
        };
        Self::deliver(notifications);
        Ok(())
    }

    // --- Port config lifecycle ---

    /// Create (`requested.id == 0`) or update a port config. Returns the
    /// stored config and `true` when the requested format was applied, or a
    /// suggested config (the port's default profile) and `false` when it
    /// was not supported; nothing is stored in the latter case.
    pub fn set_audio_port_config(
        &self,
        requested: &AudioPortConfig,
    ) -> Result<(AudioPortConfig, bool), RouteError> {
        let mut inner = self.inner.lock();

        let port = inner.ports.get(&requested.port_id).ok_or_else(|| {
            RouteError::InvalidArgument(format!("unknown port id {}", requested.port_id))
        })?;
        if requested.id != 0 {
            let existing = inner.port_configs.get(&requested.id).ok_or_else(|| {
                RouteError::InvalidArgument(format!("unknown port config id {}", requested.id))
            })?;
            if existing.port_id != requested.port_id {
                return Err(RouteError::InvalidArgument(format!(
                    "port config {} belongs to port {}, not {}",
                    requested.id, existing.port_id, requested.port_id
                )));
            }
        }
        if port.profiles.is_empty() {
            return Err(RouteError::IllegalState(format!(
                "port {} has no profiles",
                requested.port_id
            )));
        }
        if !port.profiles.contains(&requested.format) {
            let suggested = AudioPortConfig {
                id: requested.id,
                port_id: requested.port_id,
                format: port.profiles[0],
            };
            return Ok((suggested, false));
        }

        let id = if requested.id == 0 {
            inner.alloc_id()
        } else {
            requested.id
        };
        let config = AudioPortConfig { id, ..*requested };
        inner.port_configs.insert(id, config);
        Ok((config, true))
    }

    /// Remove a port config. Fails while any patch or open stream still
    /// references it.
    pub fn reset_audio_port_config(&self, port_config_id: i32) -> Result<(), RouteError> {
        let mut inner = self.inner.lock();

        if !inner.port_configs.contains_key(&port_config_id) {
            return Err(RouteError::InvalidArgument(format!(
                "unknown port config id {port_config_id}"
            )));
        }
        if inner.patch_table.is_referenced(port_config_id) {
            return Err(RouteError::IllegalState(format!(
                "port config {port_config_id} is used by a patch"
            )));
        }
        if inner.streams.contains(port_config_id) {
            return Err(RouteError::IllegalState(format!(
                "port config {port_config_id} has an open stream"
            )));
        }
        inner.port_configs.remove(&port_config_id);
        Ok(())
    }

    // --- Patch registration and teardown ---

    /// Register a patch (`requested.id == 0`) or replace the membership of
    /// an existing one. Replacement is "remove old edges, add new edges"
    /// with a single connectivity pass over the union of old and new
    /// touched configs, so streams unaffected by the change see no
    /// transient disconnect.
    pub fn set_audio_patch(&self, requested: &AudioPatch) -> Result<AudioPatch, RouteError> {
        let (stored, notifications) = {
            let mut inner = self.inner.lock();

            if requested.source_port_config_ids.is_empty()
                || requested.sink_port_config_ids.is_empty()
            {
                return Err(RouteError::InvalidArgument(
                    "patch requires at least one source and one sink".into(),
                ));
            }
            for id in requested.port_config_ids() {
                inner.port_config(id)?;
            }
            for &src in &requested.source_port_config_ids {
                for &sink in &requested.sink_port_config_ids {
                    let src_port = inner.port_config(src)?.port_id;
                    let sink_port = inner.port_config(sink)?.port_id;
                    if !inner.route_allows(src_port, sink_port) {
                        return Err(RouteError::InvalidArgument(format!(
                            "no route from port {src_port} to port {sink_port}"
                        )));
                    }
                }
            }
            let old = if requested.id != 0 {
                Some(
                    inner
                        .patches
                        .get(&requested.id)
                        .cloned()
                        .ok_or_else(|| {
                            RouteError::InvalidArgument(format!(
                                "unknown patch id {}",
                                requested.id
                            ))
                        })?,
                )
            } else {
                None
            };

            let id = match &old {
                Some(patch) => patch.id,
                None => inner.alloc_id(),
            };
            let patch = AudioPatch {
                id,
                source_port_config_ids: requested.source_port_config_ids.clone(),
                sink_port_config_ids: requested.sink_port_config_ids.clone(),
                latency_ms: LATENCY_MS,
            };

            if old.is_some() {
                inner.patch_table.unregister(id);
            }
            let port_ids = inner.port_ids_from_port_config_ids(patch.port_config_ids());
            inner.patch_table.register(&patch, &port_ids);
            inner.patches.insert(id, patch.clone());

            let mut touched: BTreeSet<i32> = patch.port_config_ids().collect();
            if let Some(old) = &old {
                touched.extend(old.port_config_ids());
            }
            (patch, inner.collect_connectivity(&touched))
        };
        Self::deliver(notifications);
        Ok(stored)
    }

    /// Remove a patch, then propagate connectivity over its former
    /// membership.
    pub fn reset_audio_patch(&self, patch_id: i32) -> Result<(), RouteError> {
        let notifications = {
            let mut inner = self.inner.lock();

            let patch = inner
                .patches
                .remove(&patch_id)
                .ok_or_else(|| RouteError::InvalidArgument(format!("unknown patch id {patch_id}")))?;
            inner.patch_table.unregister(patch_id);
            let touched: BTreeSet<i32> = patch.port_config_ids().collect();
            inner.collect_connectivity(&touched)
        };
        Self::deliver(notifications);
        Ok(())
    }

    // --- Connectivity queries ---

    /// Every other port config reachable from the given one through any
    /// patch containing it. Symmetric; never includes the config itself.
    pub fn connected_port_config_ids(
        &self,
        port_config_id: i32,
    ) -> Result<BTreeSet<i32>, RouteError> {
        let inner = self.inner.lock();
        inner.port_config(port_config_id)?;
        Ok(inner.find_connected_port_config_ids(port_config_id))
    }

    /// Devices currently reachable from the given port config. Empty when
    /// no patch connects it; that is a normal state, not an error.
    pub fn connected_devices(&self, port_config_id: i32) -> Result<Vec<AudioDevice>, RouteError> {
        let inner = self.inner.lock();
        inner.port_config(port_config_id)?;
        Ok(inner.find_connected_devices(port_config_id))
    }

    // --- Stream creation / teardown ---

    /// Open a stream on a port config. At most one stream per config;
    /// `buffer_size_frames` must lie in
    /// `[MIN_STREAM_BUFFER_SIZE_FRAMES, MAX_STREAM_BUFFER_SIZE_BYTES / frame_size]`,
    /// boundaries included. The stream's connectivity is seeded from the
    /// current patch state.
    pub fn open_stream(
        &self,
        port_config_id: i32,
        buffer_size_frames: i64,
        sink: Option<Arc<dyn ConnectivitySink>>,
    ) -> Result<StreamContext, RouteError> {
        let mut inner = self.inner.lock();

        let config = *inner.port_config(port_config_id)?;
        if inner.streams.contains(port_config_id) {
            return Err(RouteError::InvalidArgument(format!(
                "port config {port_config_id} already has an open stream"
            )));
        }
        let frame_size_bytes = config.format.frame_size_bytes();
        let max_frames = MAX_STREAM_BUFFER_SIZE_BYTES / frame_size_bytes as i64;
        if buffer_size_frames < MIN_STREAM_BUFFER_SIZE_FRAMES || buffer_size_frames > max_frames {
            return Err(RouteError::InvalidArgument(format!(
                "buffer size {buffer_size_frames} frames outside [{MIN_STREAM_BUFFER_SIZE_FRAMES}, {max_frames}]"
            )));
        }

        let devices = inner.find_connected_devices(port_config_id);
        let control = StreamControl::new(port_config_id, devices, sink);
        inner.streams.insert(&control);
        Ok(StreamContext {
            port_config_id,
            buffer_size_frames,
            frame_size_bytes,
            control,
        })
    }

    /// Open a stream and hand the validated context to a data-path factory.
    /// A factory failure unbinds the stream again.
    pub fn open_stream_with<F: StreamFactory>(
        &self,
        factory: &F,
        port_config_id: i32,
        buffer_size_frames: i64,
        sink: Option<Arc<dyn ConnectivitySink>>,
    ) -> Result<(StreamContext, F::Stream), RouteError> {
        let context = self.open_stream(port_config_id, buffer_size_frames, sink)?;
        match factory.create_stream(&context) {
            Ok(stream) => Ok((context, stream)),
            Err(e) => {
                let _ = self.close_stream(port_config_id);
                Err(e)
            }
        }
    }

    /// Close the stream bound to a port config, releasing the config for a
    /// new open. Dropping every strong reference to the stream's control
    /// block has the same effect.
    pub fn close_stream(&self, port_config_id: i32) -> Result<(), RouteError> {
        let mut inner = self.inner.lock();
        inner.streams.remove(port_config_id).ok_or_else(|| {
            RouteError::InvalidArgument(format!("no open stream on port config {port_config_id}"))
        })?;
        Ok(())
    }

    // --- Read accessors ---

    pub fn ports(&self) -> Vec<AudioPort> {
        self.inner.lock().ports.values().cloned().collect()
    }

    pub fn port(&self, port_id: i32) -> Result<AudioPort, RouteError> {
        self.inner
            .lock()
            .ports
            .get(&port_id)
            .cloned()
            .ok_or_else(|| RouteError::NotFound(format!("port {port_id}")))
    }

    pub fn port_configs(&self) -> Vec<AudioPortConfig> {
        self.inner.lock().port_configs.values().copied().collect()
    }

    pub fn patches(&self) -> Vec<AudioPatch> {
        self.inner.lock().patches.values().cloned().collect()
    }

    pub fn routes(&self) -> Vec<AudioRoute> {
        self.inner.lock().routes.clone()
    }

    /// Routes that mention the given port, as source or sink.
    pub fn routes_for_port(&self, port_id: i32) -> Result<Vec<AudioRoute>, RouteError> {
        let inner = self.inner.lock();
        if !inner.ports.contains_key(&port_id) {
            return Err(RouteError::NotFound(format!("port {port_id}")));
        }
        Ok(inner
            .routes
            .iter()
            .filter(|r| r.sink_port_id == port_id || r.source_port_ids.contains(&port_id))
            .cloned()
            .collect())
    }

    // --- Module-wide scalar state ---

    pub fn master_mute(&self) -> bool {
        self.inner.lock().controls.master_mute
    }

    pub fn set_master_mute(&self, mute: bool) {
        self.inner.lock().controls.master_mute = mute;
    }

    pub fn master_volume(&self) -> f32 {
        self.inner.lock().controls.master_volume
    }

    pub fn set_master_volume(&self, volume: f32) -> Result<(), RouteError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(RouteError::InvalidArgument(format!(
                "master volume {volume} outside [0.0, 1.0]"
            )));
        }
        self.inner.lock().controls.master_volume = volume;
        Ok(())
    }

    pub fn mic_mute(&self) -> bool {
        self.inner.lock().controls.mic_mute
    }

    pub fn set_mic_mute(&self, mute: bool) {
        self.inner.lock().controls.mic_mute = mute;
    }

    // --- Internal helpers ---

    /// Deliver snapshotted connectivity payloads. Must be called with the
    /// graph lock released.
    fn deliver(notifications: Vec<Notification>) {
        for n in notifications {
            n.control.notify_sink(&n.devices);
        }
    }
}
