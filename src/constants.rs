//! Wire and tuning constants shared by the writer, reader and NACK paths.
//!
//! Values and names mirror the original design directly; a couple are kept
//! even though nothing in this crate consults them, for parity with the
//! upstream implementation they were distilled from.

/// Minimum interval, in microseconds, between two NACKs for the same seq.
pub const RENACK_TIME_US: u64 = 100_000;

/// Informational only: not consulted by any gating logic, matching upstream.
#[allow(dead_code)]
pub const NACK_TIME_US: u64 = 80_000;

/// Number of `get_packet` calls that make up one adaptive-controller period.
pub const PERIOD_LEN: u32 = 250;

/// Carried for parity with the upstream design; no gating logic consults it.
#[allow(dead_code)]
pub const MAX_FRAME_PADDING: u32 = 2;

/// Carried for parity with the upstream design; no gating logic consults it.
/// The missing-seq index is instead bounded by the `(highest_wrote_seq -
/// frame_len, highest_wrote_seq)` window and by expiry inside `pop_nack`.
#[allow(dead_code)]
pub const MAX_MISSING_SEQ: u32 = 20;

/// `consec_good_count` needed within a period before `frame_len` is allowed
/// to shrink by one.
pub const GOOD_STREAK_FOR_SHRINK: u32 = 245;

/// Miss percentage (in per-mille, i.e. out of 1000) above which the buffer
/// performs a full reset.
pub const RESET_MISS_PER_MILLE: u32 = 600;

/// 90 kHz video clock * 50 seconds: a timestamp jump bigger than this is
/// treated as a stream discontinuity rather than ordinary jitter.
pub const VIDEO_TS_DISCONTINUITY: u32 = 4_500_000;

/// Sequence gap beyond which we declare a resync regardless of
/// `max_frame_len`, per the original's "at least 17 frames missing" rule.
pub const MIN_RESYNC_SEQ_GAP: u32 = 17;

/// Window, in sequence numbers, searched forward from a missed `target_seq`
/// before giving up and reporting `NotFound`.
pub const FORWARD_SEARCH_WINDOW: u16 = 10;

/// Heuristic: a `want - got` bigger than this is treated as a sequence
/// wraparound rather than a reordering, and resyncs `next_seq`.
pub const WRAPAROUND_HEURISTIC: u32 = 1000;

/// Stride used by `thin_frames`: every Nth visible node's frame is dropped.
pub const THINNING_STRIDE: usize = 8;

/// Maximum number of frames `thin_frames` will drop in a single pass.
pub const THINNING_MAX_DROPS: usize = 25;

/// Valid range for a session's configured low-bitrate target, in kbps.
pub const LOW_BITRATE_RANGE_KBPS: (u32, u32) = (128, 10_240);

/// Largest RTP packet (header + payload) this buffer will store. Oversize
/// writes are truncated to this length with a warning, never rejected.
pub const MAX_STORED_PACKET_LEN: usize = 1500;
