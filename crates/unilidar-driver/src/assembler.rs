//! 整圈点云组装
//!
//! 设备把一圈点云切成若干批次发送。`first_index == 0` 的批次是起始批次，
//! 声明本圈总点数和线束数；之后的批次必须按序紧接在已累积的点之后。
//! 累积点数恰好等于声明点数时，本圈完成。
//!
//! # 状态
//!
//! ```text
//! Idle ──起始批次──▶ Assembling ──点数达标──▶ Complete ──起始批次──▶ Assembling
//!   ▲                                                                   │
//!   └───────────────────────────── reset() ─────────────────────────────┘
//! ```

use crate::config::ReaderConfig;
use crate::point::{Point, PointCloud};
use std::f32::consts::TAU;
use thiserror::Error;
use unilidar_protocol::{PointBatch, RawPoint};

/// 组装器所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ReaderPhase {
    /// 尚未收到起始批次
    #[default]
    Idle = 0,
    /// 正在累积一圈
    Assembling = 1,
    /// 上一圈已完成，等待下一个起始批次
    Complete = 2,
}

impl ReaderPhase {
    /// 从 u8 转换，无效值视为 Idle
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Assembling,
            2 => Self::Complete,
            _ => Self::Idle,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// 被拒绝的批次（计数后丢弃，不中断数据流）
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyError {
    /// 圈号与正在组装的圈不一致，或当前没有正在组装的圈
    #[error("Scan id mismatch: expected {expected:?}, got {actual}")]
    ScanIdMismatch { expected: Option<u32>, actual: u32 },

    /// 批次起始序号与已累积点数不连续
    #[error("Out of sequence batch in scan {scan_id}: expected index {expected}, got {actual}")]
    OutOfSequence {
        scan_id: u32,
        expected: u32,
        actual: u32,
    },

    /// 批次声明的总点数或线束数与起始批次不一致
    #[error("Layout mismatch in scan {scan_id}")]
    LayoutMismatch { scan_id: u32 },

    /// 声明的总点数超过上限
    #[error("Revolution of {declared} points exceeds limit {max}")]
    Overflow { declared: u32, max: usize },
}

/// 原始点到物理量的换算
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointConverter {
    yaw_bias: f32,
    range_scale: f32,
    range_bias: f32,
    range_min: f32,
    range_max: f32,
}

impl PointConverter {
    pub fn new(config: &ReaderConfig) -> Self {
        Self {
            yaw_bias: config.yaw_bias,
            range_scale: config.range_scale,
            range_bias: config.range_bias,
            range_min: config.range_min,
            range_max: config.range_max,
        }
    }

    /// 换算单个点
    ///
    /// 超出 `[range_min, range_max]` 的点记为无回波（距离和强度为 0），
    /// 不从点云中删除。
    pub fn convert(&self, raw: &RawPoint) -> Point {
        let range = raw.range as f32 * self.range_scale + self.range_bias;
        let (range, intensity) = if raw.range == 0 || range < self.range_min || range > self.range_max {
            (0.0, 0.0)
        } else {
            (range, raw.intensity as f32)
        };

        let azimuth = (raw.azimuth as f32 * 0.01).to_radians() + self.yaw_bias;
        Point {
            azimuth: wrap_angle(azimuth),
            elevation: (raw.elevation as f32 * 0.01).to_radians(),
            range,
            intensity,
            time: raw.time_offset_us as f32 * 1e-6,
            ring: raw.ring as u32,
        }
    }
}

/// 规整到 [0, 2π)
fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid 对接近 -0 的输入可能返回 TAU
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// `append_points` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// 本圈仍未完成
    Partial,
    /// 本圈点数已达标，可以 `finalize`
    Complete,
}

/// 整圈点云组装器
#[derive(Debug)]
pub struct CloudAssembler {
    converter: PointConverter,
    max_points: usize,
    phase: ReaderPhase,
    current: PointCloud,
    /// 本圈声明的总点数
    expected: usize,
    /// 本圈已完成但尚未被取走
    ready: bool,
    /// 回收的缓冲区，供下一圈复用
    spare: Option<PointCloud>,
}

impl CloudAssembler {
    pub fn new(config: &ReaderConfig) -> Self {
        Self {
            converter: PointConverter::new(config),
            max_points: config.max_points_per_revolution,
            phase: ReaderPhase::Idle,
            current: PointCloud::new(),
            expected: 0,
            ready: false,
            spare: None,
        }
    }

    pub fn phase(&self) -> ReaderPhase {
        self.phase
    }

    /// 正在组装的圈号
    pub fn current_scan_id(&self) -> Option<u32> {
        (self.phase == ReaderPhase::Assembling).then_some(self.current.scan_id)
    }

    /// 已累积的点数
    pub fn accumulated(&self) -> usize {
        self.current.len()
    }

    /// 以起始批次开始新的一圈
    ///
    /// 返回被放弃的未完成圈号（如果有）。声明点数超限时不改变任何状态。
    pub fn begin_revolution(&mut self, batch: &PointBatch) -> Result<Option<u32>, AssemblyError> {
        if batch.points_per_revolution as usize > self.max_points {
            return Err(AssemblyError::Overflow {
                declared: batch.points_per_revolution,
                max: self.max_points,
            });
        }

        let abandoned = self.current_scan_id();
        // 上一圈完成后没有被取走时直接复用其缓冲区
        self.ready = false;

        self.current.clear();
        self.current.scan_id = batch.scan_id;
        self.current.stamp = batch.stamp;
        self.current.ring_count = batch.ring_count as u32;
        self.expected = batch.points_per_revolution as usize;
        self.current.points.reserve(self.expected);
        self.phase = ReaderPhase::Assembling;
        Ok(abandoned)
    }

    /// 追加一个批次的点
    pub fn append_points(&mut self, batch: &PointBatch) -> Result<AppendOutcome, AssemblyError> {
        let Some(scan_id) = self.current_scan_id() else {
            return Err(AssemblyError::ScanIdMismatch {
                expected: None,
                actual: batch.scan_id,
            });
        };
        if batch.scan_id != scan_id {
            return Err(AssemblyError::ScanIdMismatch {
                expected: Some(scan_id),
                actual: batch.scan_id,
            });
        }
        if batch.points_per_revolution as usize != self.expected
            || batch.ring_count as u32 != self.current.ring_count
            || self.current.len() + batch.points.len() > self.expected
        {
            return Err(AssemblyError::LayoutMismatch { scan_id });
        }
        let accumulated = self.current.len() as u32;
        if batch.first_index != accumulated {
            return Err(AssemblyError::OutOfSequence {
                scan_id,
                expected: accumulated,
                actual: batch.first_index,
            });
        }

        let converter = self.converter;
        self.current
            .points
            .extend(batch.points.iter().map(|raw| converter.convert(raw)));

        if self.current.len() == self.expected {
            self.phase = ReaderPhase::Complete;
            self.ready = true;
            Ok(AppendOutcome::Complete)
        } else {
            Ok(AppendOutcome::Partial)
        }
    }

    /// 取走已完成的一圈
    ///
    /// 只有 `append_points` 返回 `Complete` 之后才会返回 `Some`，且只返回一次。
    pub fn finalize(&mut self) -> Option<PointCloud> {
        if !self.ready {
            return None;
        }
        self.ready = false;
        let next = self.spare.take().unwrap_or_default();
        Some(std::mem::replace(&mut self.current, next))
    }

    /// 归还不再被引用的点云缓冲区
    pub fn recycle(&mut self, mut cloud: PointCloud) {
        cloud.clear();
        match &self.spare {
            Some(spare) if spare.points.capacity() >= cloud.points.capacity() => {},
            _ => self.spare = Some(cloud),
        }
    }

    /// 回到 Idle，丢弃未完成的圈
    pub fn reset(&mut self) {
        self.phase = ReaderPhase::Idle;
        self.ready = false;
        self.expected = 0;
        self.current.clear();
    }
}
