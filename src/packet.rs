//! Owned packet storage and RTP header access.
//!
//! Packets are cached as owned byte buffers (no arena-wide byte slab; the
//! node pool's arena is over [`Node`](crate::node_pool::Node) slots, each of
//! which owns its own buffer) and read through [`discortp`]'s zero-copy RTP
//! header view, the same crate the original driver code parses packets
//! with.

use bytes::Bytes;
use discortp::rtp::{MutableRtpPacket, RtpPacket as DiscortpRtpPacket};
use discortp::Packet as _;

use crate::constants::MAX_STORED_PACKET_LEN;
use crate::types::{RtpSequence, RtpTimestamp};

/// Byte offset of the marker bit within the RTP header (RFC 3550 §5.1):
/// the high bit of the second octet.
const MARKER_BYTE: usize = 1;
const MARKER_MASK: u8 = 0x80;

/// A single RTP packet held by the jitter buffer: the full wire bytes
/// (header + payload) plus the length actually received.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StoredPacket {
    pub(crate) bytes: Bytes,
}

impl StoredPacket {
    /// Build a stored packet from wire bytes, truncating to
    /// [`MAX_STORED_PACKET_LEN`] if oversize. Returns `None` if the bytes
    /// are too short to contain a valid RTP header.
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        let truncated = if bytes.len() > MAX_STORED_PACKET_LEN {
            tracing::warn!(
                received_len = bytes.len(),
                max_len = MAX_STORED_PACKET_LEN,
                "put_packet: truncating oversize RTP packet"
            );
            &bytes[..MAX_STORED_PACKET_LEN]
        } else {
            bytes
        };

        DiscortpRtpPacket::new(truncated)?;
        Some(Self {
            bytes: Bytes::copy_from_slice(truncated),
        })
    }

    /// Parse the RTP header view over the stored bytes.
    ///
    /// # Panics
    /// Never: construction already validated the header parses.
    pub fn header(&self) -> DiscortpRtpPacket<'_> {
        DiscortpRtpPacket::new(&self.bytes)
            .expect("StoredPacket invariant: bytes always parse as RTP")
    }

    pub fn sequence(&self) -> RtpSequence {
        RtpSequence::new(self.header().get_sequence())
    }

    pub fn timestamp(&self) -> RtpTimestamp {
        RtpTimestamp::new(self.header().get_timestamp())
    }

    pub fn marker(&self) -> bool {
        self.bytes
            .get(MARKER_BYTE)
            .map(|b| b & MARKER_MASK != 0)
            .unwrap_or(false)
    }

    pub fn ssrc(&self) -> u32 {
        self.header().get_ssrc()
    }

    pub fn payload(&self) -> &[u8] {
        self.header().payload()
    }

    pub fn wire_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn wire_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrite the header's sequence number in place. Used in timestamp
    /// mode, where the delivered packet's seq is replaced by the
    /// synthetic, monotone `psuedo_seq` before handing it to the caller.
    pub(crate) fn set_sequence(&mut self, seq: RtpSequence) {
        let mut buf = self.bytes.to_vec();
        if let Some(mut view) = MutableRtpPacket::new(&mut buf) {
            view.set_sequence(seq.get());
        }
        self.bytes = Bytes::from(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_packet(seq: u16, ts: u32, marker: bool, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![0u8; 12 + payload.len()];
        buf[0] = 0x80; // version 2, no padding/extension/csrc
        buf[1] = if marker { 0x80 } else { 0x00 }; // payload type 0
        buf[2..4].copy_from_slice(&seq.to_be_bytes());
        buf[4..8].copy_from_slice(&ts.to_be_bytes());
        buf[8..12].copy_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
        buf[12..].copy_from_slice(payload);
        buf
    }

    #[test]
    fn round_trips_header_fields() {
        let raw = raw_packet(42, 9000, true, b"hello");
        let pkt = StoredPacket::from_wire(&raw).expect("valid RTP");
        assert_eq!(pkt.sequence(), RtpSequence::new(42));
        assert_eq!(pkt.timestamp(), RtpTimestamp::new(9000));
        assert!(pkt.marker());
        assert_eq!(pkt.payload(), b"hello");
    }

    #[test]
    fn truncates_oversize_packets() {
        let raw = raw_packet(1, 0, false, &vec![0u8; MAX_STORED_PACKET_LEN * 2]);
        let pkt = StoredPacket::from_wire(&raw).expect("valid RTP");
        assert_eq!(pkt.wire_len(), MAX_STORED_PACKET_LEN);
    }

    #[test]
    fn rewrites_sequence_for_ts_mode() {
        let raw = raw_packet(7, 100, false, b"x");
        let mut pkt = StoredPacket::from_wire(&raw).expect("valid RTP");
        pkt.set_sequence(RtpSequence::new(999));
        assert_eq!(pkt.sequence(), RtpSequence::new(999));
    }
}
