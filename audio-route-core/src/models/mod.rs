//! Plain data types of the routing graph.

pub mod audio_models;
pub mod controls;
pub mod error;
