use serde::{Deserialize, Serialize};

/// Module-wide scalar state with no graph interaction.
///
/// Owned by the module object next to the graph tables, but never consulted
/// by routing logic. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleControls {
    pub master_mute: bool,
    /// Linear gain in `[0.0, 1.0]`.
    pub master_volume: f32,
    pub mic_mute: bool,
}

impl Default for ModuleControls {
    fn default() -> Self {
        Self {
            master_mute: false,
            master_volume: 1.0,
            mic_mute: false,
        }
    }
}
