//! Adaptive depth controller: periodic miss-rate computation, depth
//! shrink-on-good-streak, bitrate governance, and thinning.
//!
//! Grounded on the original's end-of-period bookkeeping in
//! `switch_jb_get_packet` (the `period_count`/`consec_good_count` block)
//! and its `jb_thin_frames` pass.

use crate::config::JbKind;
use crate::constants::{
    GOOD_STREAK_FOR_SHRINK, PERIOD_LEN, RESET_MISS_PER_MILLE, THINNING_MAX_DROPS, THINNING_STRIDE,
};
use crate::buffer::JitterBufferInner;

impl JitterBufferInner {
    /// Advance the period counter and, every `PERIOD_LEN` calls, shrink
    /// depth on a good streak and run bitrate governance. Independent of
    /// that period boundary, the miss-rate reset check runs on every call
    /// (mirroring the original's own unconditional check after its
    /// period-boundary block, not nested inside it) so a sustained high
    /// miss rate early in a window doesn't have to wait for the window to
    /// close. Returns `true` if a reset happened this call (the caller
    /// should surface `GetOutcome::Restart`).
    pub(crate) fn run_period_controller(&mut self) -> bool {
        self.period_count += 1;

        if self.period_count >= PERIOD_LEN {
            if self.consec_good_count >= GOOD_STREAK_FOR_SHRINK {
                self.frame_len = self.frame_len.saturating_sub(1).max(self.min_frame_len);
            }

            // the original resets period_count to 1, not 0, so the very
            // next call's per-mille computation below never divides by zero
            self.period_count = 1;
            self.period_miss_count = 0;
            self.period_miss_bumped = false;
            self.consec_good_count = 0;
            self.consec_miss_count = 0;

            self.run_bitrate_governance();
        }

        // per-mille rather than the original's floating point percentage
        self.period_miss_pct = self.period_miss_count.saturating_mul(1000) / self.period_count;

        if self.period_miss_pct > RESET_MISS_PER_MILLE {
            tracing::warn!(pct = self.period_miss_pct, "sustained high miss rate, resetting");
            self.reset();
            return true;
        }

        false
    }

    /// Video-only: clamp the session to a low bitrate once depth has grown
    /// past twice the floor, and release that clamp once depth is back at
    /// the floor. Always requests a keyframe when either transition fires,
    /// since the encoder needs a clean point to change output around.
    fn run_bitrate_governance(&mut self) {
        if self.kind != JbKind::Video {
            return;
        }
        let Some(kbps) = self.low_bitrate_kbps else {
            return;
        };
        let Some(session) = self.session.clone() else {
            return;
        };

        if self.bitrate_unmanageable && self.frame_len == self.min_frame_len {
            self.bitrate_unmanageable = false;
            session.set_bitrate_unmanageable(false);
            session.request_keyframe();
        } else if !self.bitrate_unmanageable && self.frame_len > 2 * self.min_frame_len {
            session.set_bitrate_kbps(kbps);
            self.bitrate_unmanageable = true;
            session.set_bitrate_unmanageable(true);
            session.request_keyframe();
        }
    }

    /// Walk visible nodes in list order and drop every 8th one's whole
    /// ts-frame, up to a cap, until back under `max_frame_len`. Prefers
    /// old, low-seq frames since those sort toward the head.
    pub(crate) fn thin_frames(&mut self) {
        if self.complete_frames <= self.max_frame_len {
            return;
        }

        let candidates: Vec<_> = self.pool.iter_order().filter(|&idx| self.pool.is_visible(idx)).collect();
        let mut stride = 0u32;
        let mut drops = 0usize;

        for idx in candidates {
            if !self.pool.is_visible(idx) {
                continue; // hidden earlier in this pass by a sibling's drop_ts_frame
            }
            stride += 1;
            if stride % THINNING_STRIDE as u32 != 0 {
                continue;
            }

            let ts = self.pool.packet(idx).timestamp();
            if self.drop_ts_frame(ts) > 0 {
                drops += 1;
            }
            if drops >= THINNING_MAX_DROPS || self.complete_frames <= self.max_frame_len {
                break;
            }
        }

        if drops > 0 {
            tracing::debug!(drops, complete_frames = self.complete_frames, "thinning");
        }
    }
}
