//! # audio-route-core
//!
//! Platform-agnostic audio module routing core.
//!
//! Manages the graph of audio ports, port configurations, patches (active
//! connections), and open streams for a single audio module instance:
//! which endpoints exist, how they are wired together, and which streams
//! are affected when the wiring changes. The transport-level data path,
//! the request/response surface, and hardware drivers live outside this
//! crate and plug in through the `traits` seams.
//!
//! ## Architecture
//!
//! ```text
//! audio-route-core (this crate)
//! ├── models/   ← AudioPort, AudioPortConfig, AudioPatch, AudioRoute,
//! │               AudioDevice, RouteError, ModuleControls
//! ├── traits/   ← ConnectivitySink, StreamFactory
//! ├── catalog/  ← Configuration (static ports, seed configs, routes)
//! ├── routing/  ← PatchTable (inverse index), StreamRegistry (weak refs)
//! └── module/   ← AudioModule (the graph manager)
//! ```

pub mod catalog;
pub mod models;
pub mod module;
pub mod routing;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use catalog::configuration::Configuration;
pub use models::audio_models::{
    AudioDevice, AudioDeviceType, AudioFormat, AudioPatch, AudioPort, AudioPortConfig,
    AudioPortKind, AudioRoute, SampleFormat,
};
pub use models::controls::ModuleControls;
pub use models::error::RouteError;
pub use module::audio_module::{
    AudioModule, LATENCY_MS, MAX_STREAM_BUFFER_SIZE_BYTES, MIN_STREAM_BUFFER_SIZE_FRAMES,
};
pub use routing::patch_table::PatchTable;
pub use routing::stream_registry::{StreamContext, StreamControl, StreamRegistry};
pub use traits::connectivity_sink::ConnectivitySink;
pub use traits::stream_factory::StreamFactory;
