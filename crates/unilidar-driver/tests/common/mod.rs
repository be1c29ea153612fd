//! 集成测试公共工具：模拟 LiDAR 设备

#![allow(dead_code)]

use unilidar_driver::{LidarReader, MessageTag, ReaderConfig};
use unilidar_protocol::{PointBatch, RawPoint};
use unilidar_serial::{MockDevice, MockTransport};

/// 模拟设备：按固定布局生成整圈批次
#[derive(Debug, Clone, Copy)]
pub struct SimulatedLidar {
    pub rings: u16,
    pub points_per_ring: u32,
    pub batch_size: u32,
}

impl SimulatedLidar {
    pub fn new(rings: u16, points_per_ring: u32, batch_size: u32) -> Self {
        Self {
            rings,
            points_per_ring,
            batch_size,
        }
    }

    pub fn total_points(&self) -> u32 {
        self.rings as u32 * self.points_per_ring
    }

    /// 一圈的全部批次
    ///
    /// 每个点的强度由圈号决定，便于检查快照是否混入了其他圈的点。
    pub fn revolution_batches(&self, scan_id: u32) -> Vec<PointBatch> {
        let total = self.total_points();
        let intensity = intensity_byte(scan_id);
        let mut batches = Vec::new();
        let mut first_index = 0;
        loop {
            let count = self.batch_size.min(total - first_index);
            batches.push(PointBatch {
                scan_id,
                stamp: scan_id as f64 * 0.1,
                ring_count: self.rings,
                points_per_revolution: total,
                first_index,
                points: (first_index..first_index + count)
                    .map(|i| RawPoint {
                        azimuth: ((i as u64 * 36000) / total.max(1) as u64) as u16,
                        elevation: 0,
                        range: 1000 + (i % 1000) as u16,
                        intensity,
                        ring: (i % self.rings as u32) as u8,
                        time_offset_us: i,
                    })
                    .collect(),
            });
            first_index += count;
            if first_index >= total {
                break;
            }
        }
        batches
    }

    /// 一圈的完整字节流
    pub fn revolution_bytes(&self, scan_id: u32) -> Vec<u8> {
        self.revolution_batches(scan_id)
            .iter()
            .flat_map(|b| b.to_frame().expect("batch fits in a frame").to_vec())
            .collect()
    }
}

fn intensity_byte(scan_id: u32) -> u8 {
    (scan_id % 250) as u8 + 1
}

/// 某一圈所有点应有的强度
pub fn intensity_for(scan_id: u32) -> f32 {
    intensity_byte(scan_id) as f32
}

pub fn reader_with_device(config: ReaderConfig) -> (LidarReader<MockTransport>, MockDevice) {
    let (transport, device) = MockTransport::new();
    let reader = LidarReader::new(transport, config).expect("valid config");
    (reader, device)
}

/// 一直推进到没有可处理的数据，返回非空结果序列
pub fn run_until_idle(reader: &mut LidarReader<MockTransport>, device: &MockDevice) -> Vec<MessageTag> {
    let mut tags = Vec::new();
    loop {
        match reader.parse_step() {
            MessageTag::NoMessage if device.pending() == 0 => return tags,
            MessageTag::NoMessage => {},
            tag => tags.push(tag),
        }
    }
}
