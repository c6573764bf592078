//! Throughput micro-benchmark standing in for the original design's
//! "near-constant time per packet" performance claim: sustained put/get
//! under an in-order arrival pattern and under 10% loss.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rtp_jitter_buffer::{JbKind, JitterBuffer};

fn raw_rtp(seq: u16, ts: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 12 + 160];
    buf[0] = 0x80;
    buf[2..4].copy_from_slice(&seq.to_be_bytes());
    buf[4..8].copy_from_slice(&ts.to_be_bytes());
    buf
}

fn in_order(c: &mut Criterion) {
    c.bench_function("put_get_in_order", |b| {
        b.iter(|| {
            let jb = JitterBuffer::new(JbKind::Audio, 2, 20);
            for i in 0..1000u32 {
                jb.put_packet(&raw_rtp((i % 65536) as u16, i * 160));
                black_box(jb.get_packet());
            }
        });
    });
}

fn ten_percent_loss(c: &mut Criterion) {
    c.bench_function("put_get_10pct_loss", |b| {
        b.iter(|| {
            let jb = JitterBuffer::new(JbKind::Video, 2, 30);
            for i in 0..1000u32 {
                if i % 10 != 0 {
                    jb.put_packet(&raw_rtp((i % 65536) as u16, i * 3000));
                }
                black_box(jb.get_packet());
                black_box(jb.pop_nack());
            }
        });
    });
}

criterion_group!(benches, in_order, ten_percent_loss);
criterion_main!(benches);
