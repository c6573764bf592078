//! The three lookups kept alongside the node pool: by seq, by ts, and the
//! set of seqs known missing (with their NACK state).
//!
//! The original keeps these as a single hash table plus ad hoc scans; the
//! design notes call for making the three lookups first-class so each one's
//! invariants are checked independently instead of folded into one
//! catch-all map.

use std::collections::HashMap;

use crate::node_pool::NodeIdx;
use crate::types::{RtpSequence, RtpTimestamp};

/// Maps a live seq to the node holding it.
#[derive(Debug, Default)]
pub struct SeqIndex(HashMap<u16, NodeIdx>);

impl SeqIndex {
    pub fn insert(&mut self, seq: RtpSequence, idx: NodeIdx) {
        self.0.insert(seq.get(), idx);
    }

    pub fn get(&self, seq: RtpSequence) -> Option<NodeIdx> {
        self.0.get(&seq.get()).copied()
    }

    pub fn remove(&mut self, seq: RtpSequence) {
        self.0.remove(&seq.get());
    }

    pub fn contains(&self, seq: RtpSequence) -> bool {
        self.0.contains_key(&seq.get())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Maps a live ts to one representative node holding it (video frames: many
/// packets share a ts, so this points at the frame's first-seen node; ts-mode
/// reattaches from `find_lowest_seq` instead of this index directly).
#[derive(Debug, Default)]
pub struct TsIndex(HashMap<u32, NodeIdx>);

impl TsIndex {
    pub fn insert(&mut self, ts: RtpTimestamp, idx: NodeIdx) {
        self.0.entry(ts.get()).or_insert(idx);
    }

    pub fn get(&self, ts: RtpTimestamp) -> Option<NodeIdx> {
        self.0.get(&ts.get()).copied()
    }

    pub fn remove(&mut self, ts: RtpTimestamp) {
        self.0.remove(&ts.get());
    }

    pub fn contains(&self, ts: RtpTimestamp) -> bool {
        self.0.contains_key(&ts.get())
    }
}

/// A missing seq's NACK history: either never NACKed, or NACKed at a given
/// clock time (microseconds), so RENACK_TIME gating can tell "first ask"
/// from "ask again".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackState {
    NeverSent,
    SentAt(u64),
}

/// The set of seqs believed missing (gap between the highest seen seq and
/// some lower seq that never arrived), each tagged with its NACK history.
#[derive(Debug, Default)]
pub struct MissingSeqIndex(HashMap<u16, NackState>);

impl MissingSeqIndex {
    pub fn mark_missing(&mut self, seq: RtpSequence) {
        self.0.entry(seq.get()).or_insert(NackState::NeverSent);
    }

    pub fn mark_resolved(&mut self, seq: RtpSequence) {
        self.0.remove(&seq.get());
    }

    pub fn is_missing(&self, seq: RtpSequence) -> bool {
        self.0.contains_key(&seq.get())
    }

    pub fn nack_state(&self, seq: RtpSequence) -> Option<NackState> {
        self.0.get(&seq.get()).copied()
    }

    pub fn record_nack_sent(&mut self, seq: RtpSequence, at: u64) {
        self.0.insert(seq.get(), NackState::SentAt(at));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RtpSequence, NackState)> + '_ {
        self.0.iter().map(|(&seq, &state)| (RtpSequence::new(seq), state))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_index_round_trips() {
        let mut idx = SeqIndex::default();
        idx.insert(RtpSequence::new(5), 3);
        assert_eq!(idx.get(RtpSequence::new(5)), Some(3));
        idx.remove(RtpSequence::new(5));
        assert_eq!(idx.get(RtpSequence::new(5)), None);
    }

    #[test]
    fn missing_seq_tracks_nack_state() {
        let mut missing = MissingSeqIndex::default();
        let seq = RtpSequence::new(42);
        missing.mark_missing(seq);
        assert_eq!(missing.nack_state(seq), Some(NackState::NeverSent));

        missing.record_nack_sent(seq, 1_000);
        assert_eq!(missing.nack_state(seq), Some(NackState::SentAt(1_000)));

        missing.mark_resolved(seq);
        assert!(!missing.is_missing(seq));
    }
}
