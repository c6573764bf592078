//! The jitter buffer instance: inner state plus the locked public facade.
//!
//! `JitterBufferInner` holds everything the writer, reader, controller and
//! NACK modules operate on; each of those modules contributes an `impl
//! JitterBufferInner` block rather than cramming every method into this
//! file, the same separation the original keeps between `switch_jb_put_packet`,
//! `switch_jb_get_packet` and `switch_jb_poll` even though they all close
//! over the same `switch_jb_t`.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::config::{FrameLenInfo, JbFlags, JbKind, TsModeConfig};
use crate::error::JbError;
use crate::index::{MissingSeqIndex, SeqIndex, TsIndex};
use crate::node_pool::NodePool;
use crate::packet::StoredPacket;
use crate::session::Session;
use crate::types::{RtpSequence, RtpTimestamp};

/// Which underfull case applied when `get_packet` had nothing to deliver.
/// The original kept these as distinct `BREAK`/`MORE_DATA` status codes;
/// this carries the same distinction as data on `GetOutcome::MoreData`
/// rather than collapsing it away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoreDataReason {
    /// Nothing buffered at all (`complete_frames == 0`).
    Break,
    /// Buffering up to `frame_len` (`0 < complete_frames < frame_len`).
    Buffering,
}

/// Outcome of `get_packet`.
#[derive(Debug, Clone)]
pub enum GetOutcome {
    Success(StoredPacket),
    /// Not enough buffered yet; see [`MoreDataReason`] for which case.
    MoreData(MoreDataReason),
    /// A gap at the current target; caller should synthesize PLC using the
    /// carried hint.
    NotFound {
        last_target_seq: Option<RtpSequence>,
        last_target_ts: Option<RtpTimestamp>,
    },
    /// The core reset itself; caller should reset its downstream pipeline.
    Restart,
}

/// Selector for `peek_frame`.
#[derive(Debug, Clone, Copy)]
pub enum PeekKey {
    Seq(RtpSequence),
    Ts(RtpTimestamp),
}

/// A non-destructive snapshot of one buffered packet's header and payload.
#[derive(Debug, Clone)]
pub struct PeekedFrame {
    pub seq: RtpSequence,
    pub ts: RtpTimestamp,
    pub marker: bool,
    pub ssrc: u32,
    pub payload: Bytes,
}

/// All of the jitter buffer's mutable state, guarded by the facade's
/// single mutex. See SPEC_FULL.md §3's field table for the rationale
/// behind each one.
pub(crate) struct JitterBufferInner {
    pub(crate) kind: JbKind,

    pub(crate) min_frame_len: u32,
    pub(crate) max_frame_len: u32,
    pub(crate) frame_len: u32,
    pub(crate) highest_frame_len: u32,
    pub(crate) complete_frames: u32,

    pub(crate) pool: NodePool,
    pub(crate) seq_index: SeqIndex,
    pub(crate) ts_index: TsIndex,
    pub(crate) missing_seq: MissingSeqIndex,

    pub(crate) target_seq: RtpSequence,
    pub(crate) last_target_seq: RtpSequence,
    pub(crate) target_ts: RtpTimestamp,
    pub(crate) last_target_ts: RtpTimestamp,

    pub(crate) highest_wrote_seq: RtpSequence,
    pub(crate) highest_wrote_ts: RtpTimestamp,
    pub(crate) highest_read_seq: RtpSequence,
    pub(crate) highest_read_ts: RtpTimestamp,

    pub(crate) next_seq: RtpSequence,
    pub(crate) psuedo_seq: RtpSequence,
    pub(crate) last_psuedo_seq: RtpSequence,

    pub(crate) period_count: u32,
    pub(crate) period_miss_count: u32,
    pub(crate) period_miss_bumped: bool,
    pub(crate) consec_good_count: u32,
    pub(crate) consec_miss_count: u32,
    pub(crate) period_miss_pct: u32,

    pub(crate) ts_mode: TsModeConfig,
    pub(crate) flags: JbFlags,

    pub(crate) write_init: bool,
    pub(crate) read_init: bool,
    /// Set once by the first `add_node` since creation or the last
    /// `reset()`. Unlike `pool.visible_nodes() == 0`, this doesn't flip
    /// back to "first write" just because the pool happens to have
    /// drained to empty during normal steady-state delivery/thinning.
    pub(crate) ever_wrote_node: bool,

    pub(crate) last_len: usize,
    pub(crate) debug_level: u8,

    pub(crate) low_bitrate_kbps: Option<u32>,
    pub(crate) bitrate_unmanageable: bool,

    pub(crate) session: Option<Arc<dyn Session>>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl JitterBufferInner {
    fn new(kind: JbKind, min_frame_len: u32, max_frame_len: u32) -> Self {
        Self {
            kind,
            min_frame_len,
            max_frame_len,
            frame_len: min_frame_len,
            highest_frame_len: min_frame_len,
            complete_frames: 0,
            pool: NodePool::new(),
            seq_index: SeqIndex::default(),
            ts_index: TsIndex::default(),
            missing_seq: MissingSeqIndex::default(),
            target_seq: RtpSequence::new(0),
            last_target_seq: RtpSequence::new(0),
            target_ts: RtpTimestamp::new(0),
            last_target_ts: RtpTimestamp::new(0),
            highest_wrote_seq: RtpSequence::new(0),
            highest_wrote_ts: RtpTimestamp::new(0),
            highest_read_seq: RtpSequence::new(0),
            highest_read_ts: RtpTimestamp::new(0),
            next_seq: RtpSequence::new(0),
            psuedo_seq: RtpSequence::new(0),
            last_psuedo_seq: RtpSequence::new(0),
            period_count: 0,
            period_miss_count: 0,
            period_miss_bumped: false,
            consec_good_count: 0,
            consec_miss_count: 0,
            period_miss_pct: 0,
            ts_mode: TsModeConfig::default(),
            flags: JbFlags::empty(),
            write_init: false,
            read_init: false,
            ever_wrote_node: false,
            last_len: 0,
            debug_level: 0,
            low_bitrate_kbps: None,
            bitrate_unmanageable: false,
            session: None,
            clock: Arc::new(SystemClock::default()),
        }
    }

    /// Clear counters, watermarks and the missing-seq index; hide every
    /// node so its slot is reusable. Allocated slots stay in the arena.
    /// Video additionally requests a keyframe, since downstream decode
    /// state is now unrecoverable without one.
    pub(crate) fn reset(&mut self) {
        tracing::debug!(kind = ?self.kind, "jitter buffer reset");

        for idx in self.pool.iter_order().collect::<Vec<_>>() {
            if self.pool.is_visible(idx) {
                self.pool.hide(idx, false);
            }
        }
        self.seq_index = SeqIndex::default();
        self.ts_index = TsIndex::default();
        self.missing_seq.clear();

        self.complete_frames = 0;
        self.target_seq = RtpSequence::new(0);
        self.last_target_seq = RtpSequence::new(0);
        self.target_ts = RtpTimestamp::new(0);
        self.last_target_ts = RtpTimestamp::new(0);
        self.highest_wrote_seq = RtpSequence::new(0);
        self.highest_wrote_ts = RtpTimestamp::new(0);
        self.highest_read_seq = RtpSequence::new(0);
        self.highest_read_ts = RtpTimestamp::new(0);
        self.next_seq = RtpSequence::new(0);
        self.psuedo_seq = RtpSequence::new(0);
        self.last_psuedo_seq = RtpSequence::new(0);
        self.period_count = 0;
        self.period_miss_count = 0;
        self.period_miss_bumped = false;
        self.consec_good_count = 0;
        self.consec_miss_count = 0;
        self.period_miss_pct = 0;
        self.write_init = false;
        self.read_init = false;
        self.ever_wrote_node = false;
        self.last_len = 0;

        if self.kind == JbKind::Video {
            if let Some(session) = &self.session {
                session.request_keyframe();
            }
        }
    }

    pub(crate) fn request_keyframe(&self) {
        if let Some(session) = &self.session {
            session.request_keyframe();
        }
    }

    /// Hide every visible node sharing `ts`, removing them from both
    /// indexes and decrementing `complete_frames` once if anything was
    /// dropped. Shared by queue-only FIFO eviction, the reader's
    /// lost-frame-head drop, and thinning. Returns the number of nodes
    /// dropped.
    pub(crate) fn drop_ts_frame(&mut self, ts: RtpTimestamp) -> u32 {
        let matches: Vec<_> = self
            .pool
            .iter_order()
            .filter(|&idx| self.pool.is_visible(idx) && self.pool.packet(idx).timestamp() == ts)
            .collect();

        for &idx in &matches {
            let seq = self.pool.packet(idx).sequence();
            self.seq_index.remove(seq);
            self.pool.hide(idx, true);
        }
        self.ts_index.remove(ts);

        if !matches.is_empty() {
            self.complete_frames = self.complete_frames.saturating_sub(1);
            self.pool.sort();
        }
        matches.len() as u32
    }

    /// Hide a single delivered node, removing it from the seq index and,
    /// if it was the ts index's representative for its ts, repointing that
    /// entry at a surviving sibling (a video frame may still have other
    /// packets buffered under the same ts).
    pub(crate) fn hide_node(&mut self, idx: crate::node_pool::NodeIdx) {
        let seq = self.pool.packet(idx).sequence();
        let ts = self.pool.packet(idx).timestamp();
        self.seq_index.remove(seq);

        if self.ts_index.get(ts) == Some(idx) {
            self.ts_index.remove(ts);
            if let Some(sibling) = self.pool.iter_order().find(|&other| {
                other != idx && self.pool.is_visible(other) && self.pool.packet(other).timestamp() == ts
            }) {
                self.ts_index.insert(ts, sibling);
            }
        }

        self.pool.hide(idx, true);
    }
}

/// Thread-shareable, synchronous jitter buffer. Every public mutator takes
/// the single internal lock for its full duration.
pub struct JitterBuffer {
    inner: Mutex<JitterBufferInner>,
}

impl JitterBuffer {
    pub fn new(kind: JbKind, min_frame_len: u32, max_frame_len: u32) -> Self {
        Self {
            inner: Mutex::new(JitterBufferInner::new(kind, min_frame_len, max_frame_len)),
        }
    }

    /// Replace the injected clock (production code never needs this;
    /// tests use it to install a `ManualClock`).
    pub fn with_clock(kind: JbKind, min_frame_len: u32, max_frame_len: u32, clock: Arc<dyn Clock>) -> Self {
        let mut inner = JitterBufferInner::new(kind, min_frame_len, max_frame_len);
        inner.clock = clock;
        Self {
            inner: Mutex::new(inner),
        }
    }

    pub fn set_session(&self, session: Arc<dyn Session>) {
        let mut inner = self.inner.lock();
        if let Some(kbps) = session.low_bitrate_kbps() {
            let (lo, hi) = crate::constants::LOW_BITRATE_RANGE_KBPS;
            if kbps >= lo && kbps <= hi {
                inner.low_bitrate_kbps = Some(kbps);
            }
        }
        inner.session = Some(session);
    }

    pub fn set_ts_mode(&self, samples_per_frame: u32, samples_per_second: u32) -> Result<(), JbError> {
        if samples_per_second == 0 {
            return Err(JbError::ZeroSampleRate);
        }
        let mut inner = self.inner.lock();
        inner.ts_mode = TsModeConfig {
            samples_per_frame,
            samples_per_second,
        };
        Ok(())
    }

    pub fn set_flag(&self, flag: JbFlags) {
        self.inner.lock().flags.insert(flag);
    }

    pub fn clear_flag(&self, flag: JbFlags) {
        self.inner.lock().flags.remove(flag);
    }

    pub fn flags(&self) -> JbFlags {
        self.inner.lock().flags
    }

    pub fn set_debug_level(&self, level: u8) {
        self.inner.lock().debug_level = level;
    }

    pub fn set_frames(&self, min_frame_len: u32, max_frame_len: u32) -> Result<(), JbError> {
        if min_frame_len > max_frame_len {
            return Err(JbError::InvalidFrameBounds {
                min: min_frame_len,
                max: max_frame_len,
            });
        }
        let mut inner = self.inner.lock();
        let was_at_floor = inner.frame_len <= inner.min_frame_len;
        inner.min_frame_len = min_frame_len;
        inner.max_frame_len = max_frame_len;
        inner.frame_len = if was_at_floor {
            min_frame_len
        } else {
            inner.frame_len.clamp(min_frame_len, max_frame_len)
        };
        inner.highest_frame_len = inner.highest_frame_len.max(inner.frame_len);
        Ok(())
    }

    pub fn get_frames(&self) -> FrameLenInfo {
        let inner = self.inner.lock();
        FrameLenInfo {
            min_frame_len: inner.min_frame_len,
            max_frame_len: inner.max_frame_len,
            frame_len: inner.frame_len,
            highest_frame_len: inner.highest_frame_len,
        }
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }

    pub fn put_packet(&self, bytes: &[u8]) {
        let mut inner = self.inner.lock();
        inner.put_packet(bytes);
    }

    pub fn get_packet(&self) -> GetOutcome {
        let mut inner = self.inner.lock();
        inner.get_packet()
    }

    pub fn get_packet_by_seq(&self, seq: RtpSequence) -> Option<StoredPacket> {
        let inner = self.inner.lock();
        inner.seq_index.get(seq).map(|idx| inner.pool.packet(idx).clone())
    }

    pub fn peek_frame(&self, key: PeekKey, offset: i32) -> Option<PeekedFrame> {
        let inner = self.inner.lock();
        let idx = match key {
            PeekKey::Seq(seq) => {
                let shifted = if offset >= 0 {
                    seq + offset as u16
                } else {
                    seq + (offset as i32).rem_euclid(65536) as u16
                };
                inner.seq_index.get(shifted)
            }
            PeekKey::Ts(ts) => {
                let step = inner.ts_mode.samples_per_frame as i64 * offset as i64;
                let shifted = RtpTimestamp::new((ts.get() as i64 + step) as u32);
                inner.ts_index.get(shifted)
            }
        }?;

        let packet = inner.pool.packet(idx);
        Some(PeekedFrame {
            seq: packet.sequence(),
            ts: packet.timestamp(),
            marker: packet.marker(),
            ssrc: packet.ssrc(),
            payload: Bytes::copy_from_slice(packet.payload()),
        })
    }

    pub fn pop_nack(&self) -> Option<u32> {
        let mut inner = self.inner.lock();
        inner.pop_nack()
    }

    pub fn frame_count(&self) -> u32 {
        self.inner.lock().complete_frames
    }

    pub fn poll(&self) -> bool {
        let inner = self.inner.lock();
        inner.complete_frames >= inner.frame_len
    }

    pub fn last_read_len(&self) -> usize {
        self.inner.lock().last_len
    }
}

/// Test-only constructor so per-module unit tests (writer, reader,
/// controller, nack) can build a bare `JitterBufferInner` without going
/// through the locked facade.
#[cfg(test)]
pub(crate) mod test_support {
    use super::{JbKind, JitterBufferInner};

    pub(crate) fn fresh_inner(kind: JbKind, min_frame_len: u32, max_frame_len: u32) -> JitterBufferInner {
        JitterBufferInner::new(kind, min_frame_len, max_frame_len)
    }
}
