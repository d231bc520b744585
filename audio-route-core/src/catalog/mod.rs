//! Static descriptor set consumed at module construction.

pub mod configuration;
