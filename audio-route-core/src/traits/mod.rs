//! Seams between the routing core and the layers around it.

pub mod connectivity_sink;
pub mod stream_factory;
