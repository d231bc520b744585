use crate::models::error::RouteError;
use crate::routing::stream_registry::StreamContext;

/// Builds the concrete data-path object for a validated stream context.
///
/// The transport layer implements this; the core only validates the open
/// request, registers the stream, and hands over the context. If the
/// factory fails, the module unbinds the freshly registered stream so the
/// port config is free to be opened again.
pub trait StreamFactory {
    type Stream;

    fn create_stream(&self, context: &StreamContext) -> Result<Self::Stream, RouteError>;
}
