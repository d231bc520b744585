use serde::{Deserialize, Serialize};

/// Kind of endpoint a device port represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioDeviceType {
    BuiltInSpeaker,
    BuiltInMic,
    WiredHeadset,
    WiredHeadphones,
    UsbDevice,
    UsbHeadset,
    BluetoothA2dp,
    BluetoothSco,
    Hdmi,
}

/// An audio device endpoint: its kind plus addressing data.
///
/// The address is empty for built-in devices and caller-supplied for
/// dynamically connected ones (e.g. a USB card/device pair).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    pub device_type: AudioDeviceType,
    pub address: String,
}

/// Sample encoding of one channel slot within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    I16,
    I24,
    I32,
    F32,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::I16 => 2,
            Self::I24 => 3,
            Self::I32 | Self::F32 => 4,
        }
    }
}

/// A fully resolved audio format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_format: SampleFormat,
    pub channel_count: u16,
    pub sample_rate: u32,
}

impl AudioFormat {
    /// Size of one interleaved frame in bytes.
    pub fn frame_size_bytes(&self) -> usize {
        self.channel_count as usize * self.sample_format.bytes_per_sample()
    }
}

/// What a port attaches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioPortKind {
    /// A hardware or virtual device endpoint.
    Device(AudioDevice),
    /// A mix point driven by the module itself.
    Mix,
    /// An endpoint tied to a client session.
    Session,
}

/// A named audio endpoint known to the module.
///
/// Port ids share one id space with port config and patch ids; an id is
/// never reused while anything references it. Static ports come from the
/// catalog; device ports may also be created at runtime via
/// `connect_external_device`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPort {
    pub id: i32,
    pub name: String,
    pub kind: AudioPortKind,
    /// Formats this port supports; the first entry is the default.
    pub profiles: Vec<AudioFormat>,
}

impl AudioPort {
    pub fn is_device(&self) -> bool {
        matches!(self.kind, AudioPortKind::Device(_))
    }

    /// The device behind this port, if it is a device port.
    pub fn device(&self) -> Option<&AudioDevice> {
        match &self.kind {
            AudioPortKind::Device(device) => Some(device),
            _ => None,
        }
    }
}

/// A concrete resolved configuration of a port.
///
/// Referenced by zero or more patches and by at most one open stream;
/// removable only when unreferenced by both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPortConfig {
    pub id: i32,
    pub port_id: i32,
    pub format: AudioFormat,
}

/// Live wiring: edges from a group of source port configs to a group of
/// sink port configs.
///
/// Id 0 in a request means "allocate a new patch"; a nonzero id updates an
/// existing patch in place (the id is stable across updates). Latency is
/// always the fixed module constant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPatch {
    pub id: i32,
    pub source_port_config_ids: Vec<i32>,
    pub sink_port_config_ids: Vec<i32>,
    pub latency_ms: u32,
}

impl AudioPatch {
    /// All port config ids referenced by this patch, sources then sinks.
    pub fn port_config_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.source_port_config_ids
            .iter()
            .chain(self.sink_port_config_ids.iter())
            .copied()
    }
}

/// A statically permitted wiring: any of the source ports may be patched
/// to the sink port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRoute {
    pub source_port_ids: Vec<i32>,
    pub sink_port_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_size() {
        let stereo_i16 = AudioFormat {
            sample_format: SampleFormat::I16,
            channel_count: 2,
            sample_rate: 48000,
        };
        assert_eq!(stereo_i16.frame_size_bytes(), 4);

        let mono_f32 = AudioFormat {
            sample_format: SampleFormat::F32,
            channel_count: 1,
            sample_rate: 44100,
        };
        assert_eq!(mono_f32.frame_size_bytes(), 4);
    }

    #[test]
    fn patch_lists_all_config_ids() {
        let patch = AudioPatch {
            id: 1,
            source_port_config_ids: vec![10, 11],
            sink_port_config_ids: vec![12],
            latency_ms: 10,
        };
        let ids: Vec<i32> = patch.port_config_ids().collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[test]
    fn device_accessor() {
        let port = AudioPort {
            id: 1,
            name: "Speaker".into(),
            kind: AudioPortKind::Device(AudioDevice {
                device_type: AudioDeviceType::BuiltInSpeaker,
                address: String::new(),
            }),
            profiles: Vec::new(),
        };
        assert!(port.is_device());
        assert_eq!(port.device().unwrap().device_type, AudioDeviceType::BuiltInSpeaker);

        let mix = AudioPort {
            id: 2,
            name: "primary output".into(),
            kind: AudioPortKind::Mix,
            profiles: Vec::new(),
        };
        assert!(mix.device().is_none());
    }
}
