//! The graph manager orchestrating ports, patches, and streams.

pub mod audio_module;
