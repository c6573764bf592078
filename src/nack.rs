//! NACK feedback generation — `pop_nack`.
//!
//! Grounded on the original's missing-seq walk in `switch_jb_pop_nack`:
//! expire anything below the current window, skip anything re-asked too
//! recently (RENACK_TIME), and fold up to 16 trailing losses into one
//! RTCP generic-NACK FCI word (primary seq + BLP bitmask).

use crate::buffer::JitterBufferInner;
use crate::config::JbKind;
use crate::constants::RENACK_TIME_US;
use crate::index::NackState;
use crate::types::{seq_is_newer, RtpSequence};

impl JitterBufferInner {
    pub(crate) fn pop_nack(&mut self) -> Option<u32> {
        if self.kind != JbKind::Video {
            return None;
        }

        let now = self.clock.now_micros();
        // Before the reader has advanced at all, `target_seq` is still the
        // zero sentinel: there's no meaningful window yet, so nothing can
        // be expired (computing `0 - frame_len` would wrap to a huge seq
        // and falsely expire every entry).
        let window_active = self.target_seq.get() != 0;
        let threshold = RtpSequence::new(self.target_seq.get().wrapping_sub(self.frame_len as u16));

        let entries: Vec<(RtpSequence, NackState)> = self.missing_seq.iter().collect();
        let mut least: Option<RtpSequence> = None;

        for (seq, state) in &entries {
            if window_active && seq_is_newer(*seq, threshold) {
                // threshold has moved past this seq: it fell out the back
                // of the window without ever being NACKed successfully.
                self.missing_seq.mark_resolved(*seq);
                continue;
            }

            if let NackState::SentAt(then) = state {
                if now.saturating_sub(*then) < RENACK_TIME_US {
                    continue;
                }
            }

            if least.is_none() || seq_is_newer(*seq, least.unwrap()) {
                least = Some(*seq);
            }
        }

        let least = least?;

        let mut blp: u16 = 0;
        for bit in 0..16u16 {
            let candidate = least + (bit + 1);
            if self.missing_seq.is_missing(candidate) {
                blp |= 1 << bit;
                self.missing_seq.record_nack_sent(candidate, now);
            }
        }
        self.missing_seq.record_nack_sent(least, now);

        Some(((blp as u32) << 16) | least.get() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::test_support::fresh_inner;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn raw(seq: u16, ts: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 12];
        buf[0] = 0x80;
        buf[2..4].copy_from_slice(&seq.to_be_bytes());
        buf[4..8].copy_from_slice(&ts.to_be_bytes());
        buf
    }

    #[test]
    fn nack_covers_gap_with_blp_and_respects_renack_time() {
        let clock = Arc::new(ManualClock::default());
        let mut jb = fresh_inner(JbKind::Video, 2, 30);
        jb.clock = clock.clone();

        jb.put_packet(&raw(500, 9000));
        jb.put_packet(&raw(503, 9180));

        let first = jb.pop_nack().expect("gap should produce a NACK");
        let primary = (first & 0xFFFF) as u16;
        let blp = (first >> 16) as u16;
        assert_eq!(primary, 501);
        assert_eq!(blp & 0b1, 1, "502 should be covered by BLP bit 0");

        assert!(jb.pop_nack().is_none(), "re-NACK inside RENACK_TIME should be suppressed");

        clock.advance(150_000);
        let second = jb.pop_nack().expect("after RENACK_TIME a new NACK should be possible");
        let primary2 = (second & 0xFFFF) as u16;
        assert_eq!(primary2, 501);
    }
}
