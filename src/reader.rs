//! The reader path: `get_packet` and its seq-mode / ts-mode selection.
//!
//! Grounded on the original's `switch_jb_get_packet`: the period/consec
//! counters, the forward-search-and-drop-stale-frame miss handling, and
//! the ts-mode pseudo-seq rewrite all mirror its control flow, translated
//! onto the arena-backed indexes instead of raw list pointers.

use crate::buffer::{GetOutcome, JitterBufferInner, MoreDataReason};
use crate::config::JbKind;
use crate::constants::FORWARD_SEARCH_WINDOW;
use crate::node_pool::NodeIdx;
use crate::types::{seq_is_newer, ts_is_newer, RtpSequence};

impl JitterBufferInner {
    pub(crate) fn get_packet(&mut self) -> GetOutcome {
        if self.complete_frames == 0 {
            return GetOutcome::MoreData(MoreDataReason::Break);
        }
        if self.complete_frames < self.frame_len {
            return GetOutcome::MoreData(MoreDataReason::Buffering);
        }

        if self.run_period_controller() {
            return GetOutcome::Restart;
        }

        let picked = if self.ts_mode.is_active() {
            self.pick_ts_mode()
        } else {
            self.pick_seq_mode()
        };

        let outcome = match picked {
            Some(idx) => self.deliver(idx),
            None => self.handle_selection_failure(),
        };

        self.thin_frames();
        outcome
    }

    /// Seq-mode selection (the default, used whenever ts-mode isn't
    /// configured). Records hit/miss bookkeeping, then on a video miss
    /// searches forward for a usable packet, dropping any stale frame head
    /// it runs into along the way.
    fn pick_seq_mode(&mut self) -> Option<NodeIdx> {
        let bootstrap = self.target_seq.get() == 0;
        let direct = if bootstrap {
            self.seq_index
                .get(RtpSequence::new(0))
                .or_else(|| self.pool.find_lowest_seq(None))
        } else {
            self.seq_index.get(self.target_seq)
        };

        if let Some(idx) = direct {
            self.consec_good_count += 1;
            self.consec_miss_count = 0;
            return Some(idx);
        }

        self.period_miss_count += 1;
        self.consec_miss_count += 1;
        self.consec_good_count = 0;

        if self.kind != JbKind::Video {
            self.target_seq = self.target_seq + 1;
            return None;
        }

        if self.period_miss_count > 1 && !self.period_miss_bumped {
            self.frame_len = (self.frame_len + 1).min(self.max_frame_len);
            self.period_miss_bumped = true;
        }

        loop {
            let mut probe = self.target_seq;
            let mut forward_hit = None;
            for _ in 0..FORWARD_SEARCH_WINDOW {
                probe = probe + 1;
                if let Some(idx) = self.seq_index.get(probe) {
                    forward_hit = Some(idx);
                    break;
                }
            }

            let idx = forward_hit?;
            let pkt = self.pool.packet(idx);
            let belongs_to_unusable_frame = pkt.marker() || pkt.timestamp() == self.highest_read_ts;
            if belongs_to_unusable_frame {
                let ts = pkt.timestamp();
                self.drop_ts_frame(ts);
                continue;
            }
            return Some(idx);
        }
    }

    /// Ts-mode selection: direct lookup at `target_ts`, advancing by
    /// `samples_per_frame` (and bumping the synthetic `psuedo_seq`) on a
    /// miss so the next call probes the following frame slot.
    fn pick_ts_mode(&mut self) -> Option<NodeIdx> {
        let bootstrap = self.target_ts.get() == 0;
        let direct = if bootstrap {
            self.pool.find_lowest_ts_node()
        } else {
            self.ts_index.get(self.target_ts)
        };

        if direct.is_none() {
            self.target_ts = self.target_ts + self.ts_mode.samples_per_frame;
            self.psuedo_seq = self.psuedo_seq + 1;
        }
        direct
    }

    /// Copy the selected node's packet out, advance targets/watermarks,
    /// and hide the node.
    fn deliver(&mut self, idx: NodeIdx) -> GetOutcome {
        let mut packet = self.pool.packet(idx).clone();
        let seq = packet.sequence();
        let ts = packet.timestamp();
        let first_read = !self.read_init;

        self.last_target_seq = self.target_seq;
        self.target_seq = seq + 1;

        if self.ts_mode.is_active() {
            self.last_target_ts = self.target_ts;
            self.target_ts = ts + self.ts_mode.samples_per_frame;
            self.last_psuedo_seq = self.psuedo_seq;
            packet.set_sequence(self.psuedo_seq);
            self.psuedo_seq = self.psuedo_seq + 1;
        }

        if first_read || seq_is_newer(self.highest_read_seq, seq) {
            self.highest_read_seq = seq;
        }

        if first_read || ts_is_newer(self.highest_read_ts, ts) {
            self.highest_read_ts = ts;
            self.complete_frames = self.complete_frames.saturating_sub(1);
        }

        self.read_init = true;
        self.last_len = packet.wire_len();
        self.hide_node(idx);

        GetOutcome::Success(packet)
    }

    /// Nothing could be delivered this call. Video always resets (it has
    /// no PLC fallback that tolerates holding a stale target); audio
    /// tolerates misses up to `frame_len` consecutive ones before giving
    /// up and resetting too.
    fn handle_selection_failure(&mut self) -> GetOutcome {
        if self.kind == JbKind::Video {
            tracing::debug!("video: nothing deliverable, resetting");
            self.reset();
            self.request_keyframe();
            return GetOutcome::Restart;
        }

        if self.consec_miss_count > self.frame_len {
            tracing::debug!(consec_miss_count = self.consec_miss_count, "audio: sustained miss streak, resetting");
            self.frame_len = (self.frame_len + 1).min(self.max_frame_len);
            self.reset();
            return GetOutcome::Restart;
        }

        GetOutcome::NotFound {
            last_target_seq: Some(self.last_target_seq),
            last_target_ts: self.ts_mode.is_active().then_some(self.last_target_ts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::test_support::fresh_inner;

    fn raw(seq: u16, ts: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 12];
        buf[0] = 0x80;
        buf[2..4].copy_from_slice(&seq.to_be_bytes());
        buf[4..8].copy_from_slice(&ts.to_be_bytes());
        buf
    }

    #[test]
    fn audio_in_order_round_trip() {
        let mut jb = fresh_inner(JbKind::Audio, 1, 10);
        for i in 0..10u16 {
            jb.put_packet(&raw(100 + i, 1000 + i as u32 * 160));
        }
        for i in 0..10u16 {
            match jb.get_packet() {
                GetOutcome::Success(pkt) => assert_eq!(pkt.sequence(), RtpSequence::new(100 + i)),
                other => panic!("expected Success, got {other:?}"),
            }
        }
        assert!(matches!(jb.get_packet(), GetOutcome::MoreData(MoreDataReason::Break)));
    }

    #[test]
    fn video_gap_returns_not_found_with_hint() {
        let mut jb = fresh_inner(JbKind::Video, 1, 30);
        jb.put_packet(&raw(500, 9000));
        jb.put_packet(&raw(503, 9180));
        // frame_len floor is 1 so the first get should attempt target_seq 500.
        let first = jb.get_packet();
        assert!(matches!(first, GetOutcome::Success(_)));
    }
}
