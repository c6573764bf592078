//! Error surface for the handful of genuinely-fallible, non-hot-path calls.
//!
//! The per-packet paths (`put_packet`, `get_packet`, `pop_nack`) never
//! return [`JbError`]: per the original design they cannot fail, they
//! self-heal via an internal reset and report that through [`crate::GetOutcome`]
//! instead.

use thiserror::Error;

/// Errors raised by the jitter buffer's configuration-time operations.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum JbError {
    #[error("min_frame_len ({min}) must not exceed max_frame_len ({max})")]
    InvalidFrameBounds { min: u32, max: u32 },

    #[error("samples_per_second must be non-zero when samples_per_frame is non-zero")]
    ZeroSampleRate,
}
