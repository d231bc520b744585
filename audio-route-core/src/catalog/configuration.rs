use crate::models::audio_models::{
    AudioDevice, AudioDeviceType, AudioFormat, AudioPort, AudioPortConfig, AudioPortKind,
    AudioRoute, SampleFormat,
};

/// Static descriptor set for one module instance: the ports that exist,
/// their initial configurations, and the permitted routes between them.
///
/// Loaded once at module construction; the module copies it into its own
/// tables and nothing here is consulted afterwards. Ids must be unique
/// across `ports` and `port_configs` (they share one id space), and every
/// `port_config.port_id` must name a port in `ports`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Configuration {
    pub ports: Vec<AudioPort>,
    pub port_configs: Vec<AudioPortConfig>,
    pub routes: Vec<AudioRoute>,
}

impl Configuration {
    pub fn lookup_port(&self, id: i32) -> Option<&AudioPort> {
        self.ports.iter().find(|p| p.id == id)
    }

    /// A template configuration for the given port: its default (first)
    /// profile with an unset id. `None` if the port is unknown or has no
    /// profiles.
    pub fn port_config_template(&self, port_id: i32) -> Option<AudioPortConfig> {
        let port = self.lookup_port(port_id)?;
        let format = *port.profiles.first()?;
        Some(AudioPortConfig {
            id: 0,
            port_id,
            format,
        })
    }

    pub fn static_routes(&self) -> &[AudioRoute] {
        &self.routes
    }

    /// A representative catalog for a primary module: built-in speaker and
    /// mic device ports, output and input mix ports, a USB headset template
    /// port, routes wiring them, and seed configs for the built-in devices.
    pub fn primary() -> Self {
        let stereo_out = AudioFormat {
            sample_format: SampleFormat::I16,
            channel_count: 2,
            sample_rate: 48000,
        };
        let mono_in = AudioFormat {
            sample_format: SampleFormat::I16,
            channel_count: 1,
            sample_rate: 48000,
        };

        let ports = vec![
            AudioPort {
                id: 1,
                name: "Speaker".into(),
                kind: AudioPortKind::Device(AudioDevice {
                    device_type: AudioDeviceType::BuiltInSpeaker,
                    address: String::new(),
                }),
                profiles: vec![stereo_out],
            },
            AudioPort {
                id: 2,
                name: "Built-In Mic".into(),
                kind: AudioPortKind::Device(AudioDevice {
                    device_type: AudioDeviceType::BuiltInMic,
                    address: String::new(),
                }),
                profiles: vec![mono_in],
            },
            AudioPort {
                id: 3,
                name: "primary output".into(),
                kind: AudioPortKind::Mix,
                profiles: vec![stereo_out],
            },
            AudioPort {
                id: 4,
                name: "primary input".into(),
                kind: AudioPortKind::Mix,
                profiles: vec![mono_in],
            },
            AudioPort {
                id: 5,
                name: "USB Headset".into(),
                kind: AudioPortKind::Device(AudioDevice {
                    device_type: AudioDeviceType::UsbHeadset,
                    address: String::new(),
                }),
                profiles: vec![stereo_out, mono_in],
            },
        ];

        let port_configs = vec![
            AudioPortConfig {
                id: 6,
                port_id: 1,
                format: stereo_out,
            },
            AudioPortConfig {
                id: 7,
                port_id: 2,
                format: mono_in,
            },
        ];

        let routes = vec![
            AudioRoute {
                source_port_ids: vec![3],
                sink_port_id: 1,
            },
            AudioRoute {
                source_port_ids: vec![3],
                sink_port_id: 5,
            },
            AudioRoute {
                source_port_ids: vec![2, 5],
                sink_port_id: 4,
            },
        ];

        Self {
            ports,
            port_configs,
            routes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_is_consistent() {
        let config = Configuration::primary();

        let mut ids: Vec<i32> = config.ports.iter().map(|p| p.id).collect();
        ids.extend(config.port_configs.iter().map(|c| c.id));
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count, "ids must be unique across the catalog");

        for pc in &config.port_configs {
            let port = config.lookup_port(pc.port_id).expect("config references a port");
            assert!(port.profiles.contains(&pc.format));
        }
        for route in config.static_routes() {
            assert!(config.lookup_port(route.sink_port_id).is_some());
            for &src in &route.source_port_ids {
                assert!(config.lookup_port(src).is_some());
            }
        }
    }

    #[test]
    fn template_uses_default_profile() {
        let config = Configuration::primary();
        let template = config.port_config_template(5).unwrap();
        assert_eq!(template.id, 0);
        assert_eq!(template.port_id, 5);
        assert_eq!(template.format, config.lookup_port(5).unwrap().profiles[0]);

        assert!(config.port_config_template(99).is_none());
    }
}
