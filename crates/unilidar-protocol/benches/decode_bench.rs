//! 帧解码性能基准测试
//!
//! 模拟一整圈点云批次加 IMU 帧的字节流，测量解码吞吐。

use bytes::BytesMut;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use unilidar_protocol::{FrameDecoder, ImuPacket, PointBatch, RawPoint};

fn revolution_stream(batches: u32, points_per_batch: u32) -> Vec<u8> {
    let total = batches * points_per_batch;
    let mut stream = Vec::new();
    for b in 0..batches {
        let batch = PointBatch {
            scan_id: 1,
            stamp: 0.0,
            ring_count: 1,
            points_per_revolution: total,
            first_index: b * points_per_batch,
            points: (0..points_per_batch)
                .map(|i| RawPoint {
                    azimuth: (i * 10) as u16,
                    elevation: 0,
                    range: 1000,
                    intensity: 20,
                    ring: 0,
                    time_offset_us: i,
                })
                .collect(),
        };
        stream.extend_from_slice(&batch.to_frame().expect("batch fits in a frame"));
        let imu = ImuPacket {
            seq: b,
            ..Default::default()
        };
        stream.extend_from_slice(&imu.to_frame().expect("imu frame"));
    }
    stream
}

fn bench_decode(c: &mut Criterion) {
    let stream = revolution_stream(40, 300);
    let mut group = c.benchmark_group("frame_decoder");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("decode_revolution", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            let mut buf = BytesMut::from(&stream[..]);
            let mut frames = 0usize;
            while let Ok(Some(frame)) = decoder.decode(&mut buf) {
                frames += black_box(frame.payload.len()).min(1);
            }
            frames
        })
    });

    group.bench_function("decode_and_parse_batches", |b| {
        b.iter(|| {
            let mut decoder = FrameDecoder::new();
            let mut buf = BytesMut::from(&stream[..]);
            let mut points = 0usize;
            while let Ok(Some(frame)) = decoder.decode(&mut buf) {
                if let Ok(batch) = PointBatch::decode(&frame.payload) {
                    points += batch.points.len();
                }
            }
            black_box(points)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
