//! Reader 运行指标
//!
//! 所有计数器都是原子变量，解析线程写入，任意线程读取快照。

use crate::assembler::AssemblyError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reader 实时指标
#[derive(Debug, Default)]
pub struct ReaderMetrics {
    /// 校验通过的帧数
    pub frames_decoded: AtomicU64,
    /// 损坏帧和负载解析失败的次数
    pub decode_errors: AtomicU64,
    /// 未知类型帧数
    pub unknown_frames: AtomicU64,
    /// 点云批次数
    pub point_batches: AtomicU64,
    /// 圈号不匹配被丢弃的批次数
    pub scan_id_mismatches: AtomicU64,
    /// 序号不连续被丢弃的批次数
    pub out_of_sequence_drops: AtomicU64,
    /// 布局不一致被丢弃的批次数
    pub layout_mismatches: AtomicU64,
    /// 点数超限被丢弃的起始批次数
    pub overflow_drops: AtomicU64,
    /// 完成的圈数
    pub revolutions_completed: AtomicU64,
    /// 未完成即被新起始批次放弃的圈数
    pub revolutions_abandoned: AtomicU64,
    /// IMU 采样数
    pub imu_samples: AtomicU64,
    /// 版本应答数
    pub version_messages: AtomicU64,
    /// 命令应答数
    pub command_acks: AtomicU64,
    /// 传输层读取错误次数
    pub transport_errors: AtomicU64,
    /// 成功的边界快照数
    pub snapshots_taken: AtomicU64,
    /// 边界快照分配失败次数
    pub snapshot_alloc_failures: AtomicU64,
    /// 读取线程通道已满而丢弃的点云数
    pub clouds_dropped: AtomicU64,
}

impl ReaderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按拒绝原因累加对应计数器
    pub fn record_assembly_error(&self, error: &AssemblyError) {
        let counter = match error {
            AssemblyError::ScanIdMismatch { .. } => &self.scan_id_mismatches,
            AssemblyError::OutOfSequence { .. } => &self.out_of_sequence_drops,
            AssemblyError::LayoutMismatch { .. } => &self.layout_mismatches,
            AssemblyError::Overflow { .. } => &self.overflow_drops,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            unknown_frames: self.unknown_frames.load(Ordering::Relaxed),
            point_batches: self.point_batches.load(Ordering::Relaxed),
            scan_id_mismatches: self.scan_id_mismatches.load(Ordering::Relaxed),
            out_of_sequence_drops: self.out_of_sequence_drops.load(Ordering::Relaxed),
            layout_mismatches: self.layout_mismatches.load(Ordering::Relaxed),
            overflow_drops: self.overflow_drops.load(Ordering::Relaxed),
            revolutions_completed: self.revolutions_completed.load(Ordering::Relaxed),
            revolutions_abandoned: self.revolutions_abandoned.load(Ordering::Relaxed),
            imu_samples: self.imu_samples.load(Ordering::Relaxed),
            version_messages: self.version_messages.load(Ordering::Relaxed),
            command_acks: self.command_acks.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            snapshots_taken: self.snapshots_taken.load(Ordering::Relaxed),
            snapshot_alloc_failures: self.snapshot_alloc_failures.load(Ordering::Relaxed),
            clouds_dropped: self.clouds_dropped.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        for counter in [
            &self.frames_decoded,
            &self.decode_errors,
            &self.unknown_frames,
            &self.point_batches,
            &self.scan_id_mismatches,
            &self.out_of_sequence_drops,
            &self.layout_mismatches,
            &self.overflow_drops,
            &self.revolutions_completed,
            &self.revolutions_abandoned,
            &self.imu_samples,
            &self.version_messages,
            &self.command_acks,
            &self.transport_errors,
            &self.snapshots_taken,
            &self.snapshot_alloc_failures,
            &self.clouds_dropped,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub frames_decoded: u64,
    pub decode_errors: u64,
    pub unknown_frames: u64,
    pub point_batches: u64,
    pub scan_id_mismatches: u64,
    pub out_of_sequence_drops: u64,
    pub layout_mismatches: u64,
    pub overflow_drops: u64,
    pub revolutions_completed: u64,
    pub revolutions_abandoned: u64,
    pub imu_samples: u64,
    pub version_messages: u64,
    pub command_acks: u64,
    pub transport_errors: u64,
    pub snapshots_taken: u64,
    pub snapshot_alloc_failures: u64,
    pub clouds_dropped: u64,
}

impl MetricsSnapshot {
    /// 被组装器拒绝的批次总数
    pub fn batches_dropped(&self) -> u64 {
        self.scan_id_mismatches
            + self.out_of_sequence_drops
            + self.layout_mismatches
            + self.overflow_drops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_assembly_error() {
        let metrics = ReaderMetrics::new();
        metrics.record_assembly_error(&AssemblyError::ScanIdMismatch {
            expected: Some(1),
            actual: 2,
        });
        metrics.record_assembly_error(&AssemblyError::Overflow { declared: 10, max: 1 });
        metrics.record_assembly_error(&AssemblyError::LayoutMismatch { scan_id: 1 });

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.scan_id_mismatches, 1);
        assert_eq!(snapshot.overflow_drops, 1);
        assert_eq!(snapshot.layout_mismatches, 1);
        assert_eq!(snapshot.out_of_sequence_drops, 0);
        assert_eq!(snapshot.batches_dropped(), 3);
    }

    #[test]
    fn test_reset() {
        let metrics = ReaderMetrics::new();
        metrics.frames_decoded.fetch_add(5, Ordering::Relaxed);
        metrics.clouds_dropped.fetch_add(1, Ordering::Relaxed);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }
}
