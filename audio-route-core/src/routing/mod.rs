//! Relational state of the graph: the patch inverse index and the open
//! stream registry.

pub mod patch_table;
pub mod stream_registry;
