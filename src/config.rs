//! The tuning surface: frame-len bounds, flags, debug level and
//! timestamp-mode configuration.

use bitflags::bitflags;

/// Which of the two mode the buffer operates in. The original design
/// notes this is the only polymorphism axis worth modeling — deliberately
/// not a trait object, since audio and video differ enough that the
/// writer/reader paths branch explicitly on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JbKind {
    Audio,
    Video,
}

bitflags! {
    /// Behavioural flags toggled post-construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct JbFlags: u32 {
        /// Disables gap tracking and NACKs; the buffer becomes a bounded
        /// FIFO that drops the oldest frame once `complete_frames` exceeds
        /// `max_frame_len`.
        const QUEUE_ONLY = 0b0000_0001;
    }
}

/// Snapshot returned by `get_frames`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLenInfo {
    pub min_frame_len: u32,
    pub max_frame_len: u32,
    pub frame_len: u32,
    pub highest_frame_len: u32,
}

/// Timestamp-mode tuning, set once via `set_ts_mode`. A zero
/// `samples_per_frame` (the default) means the buffer stays in seq-mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TsModeConfig {
    pub samples_per_frame: u32,
    pub samples_per_second: u32,
}

impl TsModeConfig {
    pub fn is_active(&self) -> bool {
        self.samples_per_frame != 0
    }
}
