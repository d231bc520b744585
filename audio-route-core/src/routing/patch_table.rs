use std::collections::{BTreeMap, BTreeSet};

use crate::models::audio_models::AudioPatch;

/// Inverse index from port ids and port config ids to the patches that
/// reference them.
///
/// Keyed by both id kinds in one map; valid because the module allocates
/// all ids from a single space. Answers "which patches touch this endpoint"
/// in O(edges) without scanning every patch. Entities carry no
/// back-references; this table is the only place the relation lives.
#[derive(Debug, Default)]
pub struct PatchTable {
    edges: BTreeMap<i32, BTreeSet<i32>>,
}

impl PatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert edges for `patch`: one per referenced port config id and one
    /// per owning port id in `port_ids`.
    pub fn register(&mut self, patch: &AudioPatch, port_ids: &BTreeSet<i32>) {
        for id in patch.port_config_ids().chain(port_ids.iter().copied()) {
            self.edges.entry(id).or_default().insert(patch.id);
        }
    }

    /// Remove every edge pointing at `patch_id`. Idempotent.
    pub fn unregister(&mut self, patch_id: i32) {
        self.edges.retain(|_, patches| {
            patches.remove(&patch_id);
            !patches.is_empty()
        });
    }

    /// Ids of the patches referencing the given port or port config id.
    pub fn patches_for(&self, id: i32) -> BTreeSet<i32> {
        self.edges.get(&id).cloned().unwrap_or_default()
    }

    /// Whether any patch references the given port or port config id.
    pub fn is_referenced(&self, id: i32) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
