//! Memory layout constants for the mirrored structures.
//!
//! Offsets are relative to the owning structure's base address. All
//! fields are little-endian.

/// Layout of the state hub record.
pub mod state_hub {
    /// Pointer to the live scene record.
    pub const SCENE_PTR: usize = 0;
    /// Active-state discriminant.
    pub const ACTIVE: usize = 8;
    pub const SIZE: usize = 12;
}

/// Layout of the scene record.
pub mod scene {
    pub const ORIGIN_X: usize = 0;
    pub const ORIGIN_Y: usize = 4;
    pub const ORIGIN_Z: usize = 8;
    /// Pointer to the detail counter cell.
    pub const DETAIL_PTR: usize = 16;
    pub const SIZE: usize = 24;
}

/// Layout of the view scale record (four packed floats).
pub mod view_scale {
    pub const WORD: usize = 4;
    pub const COUNT: usize = 4;
    pub const SIZE: usize = WORD * COUNT;
}

/// Polling cadences.
pub mod timing {
    use std::time::Duration;

    /// Interval between attach attempts and liveness checks.
    pub const MONITOR_INTERVAL: Duration = Duration::from_secs(1);
}
