//! End-to-end scenarios, lifted directly from the design document's
//! literal S1-S6 walkthroughs.

use std::sync::Arc;

use rtp_jitter_buffer::{GetOutcome, JbKind, JitterBuffer, ManualClock, MoreDataReason};

fn raw_rtp(seq: u16, ts: u32, marker: bool, payload: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 12 + payload.len()];
    buf[0] = 0x80;
    buf[1] = if marker { 0x80 } else { 0x00 };
    buf[2..4].copy_from_slice(&seq.to_be_bytes());
    buf[4..8].copy_from_slice(&ts.to_be_bytes());
    buf[8..12].copy_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    buf[12..].copy_from_slice(payload);
    buf
}

#[test]
fn s1_audio_in_order() {
    let jb = JitterBuffer::new(JbKind::Audio, 1, 10);

    for i in 0..10u16 {
        let payload = format!("A{i}");
        jb.put_packet(&raw_rtp(100 + i, 1000 + 160 * i as u32, false, payload.as_bytes()));
    }

    for i in 0..10u16 {
        match jb.get_packet() {
            GetOutcome::Success(pkt) => {
                assert_eq!(pkt.sequence().get(), 100 + i);
                assert_eq!(pkt.payload(), format!("A{i}").as_bytes());
            }
            other => panic!("expected Success for packet {i}, got {other:?}"),
        }
    }

    assert!(matches!(jb.get_packet(), GetOutcome::MoreData(MoreDataReason::Break)));
}

#[test]
fn s2_video_gap_and_nack() {
    let clock = Arc::new(ManualClock::new());
    let jb = JitterBuffer::with_clock(JbKind::Video, 2, 30, clock.clone());

    jb.put_packet(&raw_rtp(500, 9000, false, b"x"));
    jb.put_packet(&raw_rtp(503, 9000 + 2 * 90, false, b"y"));

    let nack = jb.pop_nack().expect("a gap should produce a NACK");
    let primary = (nack & 0xFFFF) as u16;
    let blp = (nack >> 16) as u16;
    assert_eq!(primary, 501);
    assert_eq!(blp & 0b1, 1, "502 should ride along in the BLP");

    clock.advance(50_000);
    assert!(jb.pop_nack().is_none(), "inside RENACK_TIME, no re-NACK");

    clock.advance(100_000); // total 150ms elapsed
    jb.put_packet(&raw_rtp(501, 9000, false, b"z"));

    let nack2 = jb.pop_nack().expect("502 should still be missing");
    let primary2 = (nack2 & 0xFFFF) as u16;
    assert_eq!(primary2, 502);
}

#[test]
fn s3_video_huge_jump_resyncs() {
    let jb = JitterBuffer::new(JbKind::Video, 2, 10);

    jb.put_packet(&raw_rtp(1000, 0, false, b"a"));
    jb.put_packet(&raw_rtp(2000, 900_000, false, b"b"));

    assert_eq!(jb.frame_count(), 1);
    assert!(jb.pop_nack().is_none(), "resync clears the missing-seq index");
}

#[test]
fn s4_depth_stays_at_floor_on_perfect_stream() {
    let jb = JitterBuffer::new(JbKind::Video, 2, 10);

    for i in 0..250u32 {
        jb.put_packet(&raw_rtp((i % 65536) as u16, i * 3000, false, b"v"));
    }
    for _ in 0..250u32 {
        let _ = jb.get_packet();
    }

    assert_eq!(jb.get_frames().frame_len, 2);
}

#[test]
fn s5_depth_grows_on_misses() {
    let jb = JitterBuffer::new(JbKind::Video, 2, 10);

    jb.put_packet(&raw_rtp(0, 0, false, b"a"));
    jb.put_packet(&raw_rtp(4, 4 * 3000, false, b"b"));
    jb.put_packet(&raw_rtp(8, 8 * 3000, false, b"c"));

    assert!(jb.get_frames().frame_len > 2, "repeated gaps should have grown frame_len");
}

#[test]
fn s6_thinning_caps_buffered_frames() {
    let jb = JitterBuffer::new(JbKind::Video, 2, 4);

    for i in 0..20u16 {
        jb.put_packet(&raw_rtp(i, i as u32 * 3000, false, b"f"));
    }

    let _ = jb.get_packet();

    assert!(jb.frame_count() <= 4 + 24, "thinning bound from the design doc's invariant 8");
}
