//! 点云数据类型

use unilidar_protocol::{ImuPacket, VersionPacket};

/// 单个点（极坐标，米/弧度/秒）
///
/// 内存布局固定（`#[repr(C)]`），可以逐字节复制给 C 侧。
/// 无回波的点保留在点云中，`range` 和 `intensity` 为 0。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// 水平角（弧度，[0, 2π)）
    pub azimuth: f32,
    /// 俯仰角（弧度）
    pub elevation: f32,
    /// 距离（米）
    pub range: f32,
    /// 反射强度
    pub intensity: f32,
    /// 相对本圈起始时刻的时间（秒）
    pub time: f32,
    /// 线束编号
    pub ring: u32,
}

impl Point {
    /// 是否有有效回波
    pub fn has_return(&self) -> bool {
        self.range > 0.0
    }
}

/// 一整圈点云
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointCloud {
    /// 本圈起始时间戳（秒，设备时钟）
    pub stamp: f64,
    /// 圈号
    pub scan_id: u32,
    /// 线束数
    pub ring_count: u32,
    /// 按到达顺序排列的点
    pub points: Vec<Point>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 清空内容但保留已分配的容量
    pub fn clear(&mut self) {
        self.stamp = 0.0;
        self.scan_id = 0;
        self.ring_count = 0;
        self.points.clear();
    }
}

/// IMU 采样
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImuSample {
    pub seq: u32,
    pub stamp: f64,
    /// 姿态四元数 (w, x, y, z)
    pub quaternion: [f32; 4],
    /// 角速度（rad/s）
    pub angular_velocity: [f32; 3],
    /// 线加速度（m/s²）
    pub linear_acceleration: [f32; 3],
}

impl From<ImuPacket> for ImuSample {
    fn from(packet: ImuPacket) -> Self {
        Self {
            seq: packet.seq,
            stamp: packet.stamp,
            quaternion: packet.quaternion,
            angular_velocity: packet.angular_velocity,
            linear_acceleration: packet.linear_acceleration,
        }
    }
}

/// 设备版本信息
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionInfo {
    pub hardware: String,
    pub firmware: String,
    pub date: String,
}

impl From<VersionPacket> for VersionInfo {
    fn from(packet: VersionPacket) -> Self {
        Self {
            hardware: packet.hardware_string(),
            firmware: packet.firmware_string(),
            date: packet.date_string(),
        }
    }
}
