//! parse_step 与快照性能基准测试
//!
//! 一圈 18 线 × 1200 点，按最大批次切帧。

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use unilidar_driver::{CAllocator, LidarReader, MessageTag, ReaderConfig};
use unilidar_protocol::{MAX_POINTS_PER_BATCH, PointBatch, RawPoint};
use unilidar_serial::{MockDevice, MockTransport};

const RINGS: u16 = 18;
const POINTS_PER_RING: u32 = 1200;

fn revolution_bytes(scan_id: u32) -> Vec<u8> {
    let total = RINGS as u32 * POINTS_PER_RING;
    let mut out = Vec::new();
    let mut first_index = 0;
    while first_index < total {
        let count = (MAX_POINTS_PER_BATCH as u32).min(total - first_index);
        let batch = PointBatch {
            scan_id,
            stamp: scan_id as f64 * 0.1,
            ring_count: RINGS,
            points_per_revolution: total,
            first_index,
            points: (first_index..first_index + count)
                .map(|i| RawPoint {
                    azimuth: (i % 36000) as u16,
                    elevation: 0,
                    range: 500 + (i % 4000) as u16,
                    intensity: 20,
                    ring: (i % RINGS as u32) as u8,
                    time_offset_us: i,
                })
                .collect(),
        };
        out.extend_from_slice(&batch.to_frame().unwrap());
        first_index += count;
    }
    out
}

fn drain(reader: &mut LidarReader<MockTransport>, device: &MockDevice) -> usize {
    let mut completed = 0;
    loop {
        match reader.parse_step() {
            MessageTag::PointCloudComplete => completed += 1,
            MessageTag::NoMessage if device.pending() == 0 && reader.buffered_len() == 0 => {
                return completed;
            },
            _ => {},
        }
    }
}

fn bench_parse_step(c: &mut Criterion) {
    let bytes = revolution_bytes(7);
    let (transport, device) = MockTransport::new();
    let mut reader = LidarReader::new(transport, ReaderConfig::default()).unwrap();

    let mut group = c.benchmark_group("parse_step");
    group.throughput(Throughput::Elements((RINGS as u32 * POINTS_PER_RING) as u64));
    group.bench_function("full_revolution", |b| {
        b.iter(|| {
            device.feed(&bytes);
            black_box(drain(&mut reader, &device))
        })
    });
    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let (transport, device) = MockTransport::new();
    let mut reader = LidarReader::new(transport, ReaderConfig::default()).unwrap();
    device.feed(&revolution_bytes(3));
    drain(&mut reader, &device);
    let handoff = reader.handoff_with(CAllocator);

    c.bench_function("take_and_release_snapshot", |b| {
        b.iter(|| {
            let snapshot = handoff.take_snapshot();
            unsafe { handoff.release_snapshot_buffer(black_box(snapshot).points) };
        })
    });
}

criterion_group!(benches, bench_parse_step, bench_snapshot);
criterion_main!(benches);
