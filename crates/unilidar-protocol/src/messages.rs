//! 消息负载定义
//!
//! 每种上行消息提供 `decode(payload)`，每种消息也提供 `encode()` / `to_frame()`，
//! 用于下发命令以及在测试中模拟设备。

use crate::codec::encode_frame;
use crate::constants::*;
use crate::ids::{CommandType, PacketType, WorkingMode};
use crate::ProtocolError;
use bytes::{Buf, BufMut, Bytes};

fn check_len(what: &'static str, payload: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if payload.len() != expected {
        return Err(ProtocolError::InvalidLength {
            what,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

// ============================================================================
// 点云批次 (0x66 / 102)
// ============================================================================

/// 线上编码的单个点（原始单位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawPoint {
    /// 水平角（0.01°）
    pub azimuth: u16,
    /// 俯仰角（0.01°，有符号）
    pub elevation: i16,
    /// 距离原始值（乘以 range_scale 得到米）
    pub range: u16,
    /// 反射强度
    pub intensity: u8,
    /// 线束（通道）编号
    pub ring: u8,
    /// 相对本圈起始时刻的时间偏移（微秒）
    pub time_offset_us: u32,
}

/// 点云批次
///
/// 一圈（revolution）由若干批次组成。`first_index == 0` 的批次是一圈的起始标记，
/// 并声明本圈的总点数和线束数。
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointBatch {
    /// 圈号（每圈单调递增）
    pub scan_id: u32,
    /// 本圈起始时间戳（秒）
    pub stamp: f64,
    /// 线束数
    pub ring_count: u16,
    /// 本圈声明的总点数
    pub points_per_revolution: u32,
    /// 本批次第一个点在圈内的序号
    pub first_index: u32,
    /// 点数据（采集顺序）
    pub points: Vec<RawPoint>,
}

impl PointBatch {
    /// 是否为一圈的起始批次
    pub fn is_revolution_start(&self) -> bool {
        self.first_index == 0
    }

    /// 解析负载并校验布局
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < POINT_BATCH_HEAD_LEN {
            return Err(ProtocolError::InvalidLength {
                what: "point batch",
                expected: POINT_BATCH_HEAD_LEN,
                actual: payload.len(),
            });
        }

        let mut buf = payload;
        let scan_id = buf.get_u32_le();
        let stamp = buf.get_f64_le();
        let ring_count = buf.get_u16_le();
        let _reserved = buf.get_u16_le();
        let points_per_revolution = buf.get_u32_le();
        let first_index = buf.get_u32_le();
        let point_count = buf.get_u16_le() as usize;
        let _reserved = buf.get_u16_le();

        check_len(
            "point batch",
            payload,
            POINT_BATCH_HEAD_LEN + point_count * POINT_RECORD_LEN,
        )?;

        if first_index as u64 + point_count as u64 > points_per_revolution as u64 {
            return Err(ProtocolError::InvalidValue {
                field: "first_index".to_string(),
                value: first_index,
            });
        }
        if points_per_revolution > 0 {
            if ring_count == 0 {
                return Err(ProtocolError::InvalidValue {
                    field: "ring_count".to_string(),
                    value: 0,
                });
            }
            if points_per_revolution % ring_count as u32 != 0 {
                return Err(ProtocolError::InvalidValue {
                    field: "points_per_revolution".to_string(),
                    value: points_per_revolution,
                });
            }
        }

        let mut points = Vec::with_capacity(point_count);
        for _ in 0..point_count {
            let point = RawPoint {
                azimuth: buf.get_u16_le(),
                elevation: buf.get_i16_le(),
                range: buf.get_u16_le(),
                intensity: buf.get_u8(),
                ring: buf.get_u8(),
                time_offset_us: buf.get_u32_le(),
            };
            if point.ring as u16 >= ring_count {
                return Err(ProtocolError::InvalidValue {
                    field: "ring".to_string(),
                    value: point.ring as u32,
                });
            }
            points.push(point);
        }

        Ok(Self {
            scan_id,
            stamp,
            ring_count,
            points_per_revolution,
            first_index,
            points,
        })
    }

    /// 编码负载
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(POINT_BATCH_HEAD_LEN + self.points.len() * POINT_RECORD_LEN);
        buf.put_u32_le(self.scan_id);
        buf.put_f64_le(self.stamp);
        buf.put_u16_le(self.ring_count);
        buf.put_u16_le(0);
        buf.put_u32_le(self.points_per_revolution);
        buf.put_u32_le(self.first_index);
        buf.put_u16_le(self.points.len() as u16);
        buf.put_u16_le(0);
        for p in &self.points {
            buf.put_u16_le(p.azimuth);
            buf.put_i16_le(p.elevation);
            buf.put_u16_le(p.range);
            buf.put_u8(p.intensity);
            buf.put_u8(p.ring);
            buf.put_u32_le(p.time_offset_us);
        }
        buf
    }

    /// 编码为完整帧
    ///
    /// 点数超过 [`MAX_POINTS_PER_BATCH`] 时返回 `PayloadTooLarge`。
    pub fn to_frame(&self) -> Result<Bytes, ProtocolError> {
        encode_frame(PacketType::PointData.into(), &self.encode())
    }
}

// ============================================================================
// IMU (0x68 / 104)
// ============================================================================

/// IMU 采样
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImuPacket {
    /// 序号
    pub seq: u32,
    /// 时间戳（秒）
    pub stamp: f64,
    /// 姿态四元数 (w, x, y, z)
    pub quaternion: [f32; 4],
    /// 角速度（rad/s）
    pub angular_velocity: [f32; 3],
    /// 线加速度（m/s²）
    pub linear_acceleration: [f32; 3],
}

impl ImuPacket {
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        check_len("imu", payload, IMU_PAYLOAD_LEN)?;
        let mut buf = payload;
        let seq = buf.get_u32_le();
        let stamp = buf.get_f64_le();
        let mut quaternion = [0.0f32; 4];
        for q in &mut quaternion {
            *q = buf.get_f32_le();
        }
        let mut angular_velocity = [0.0f32; 3];
        for v in &mut angular_velocity {
            *v = buf.get_f32_le();
        }
        let mut linear_acceleration = [0.0f32; 3];
        for a in &mut linear_acceleration {
            *a = buf.get_f32_le();
        }
        Ok(Self {
            seq,
            stamp,
            quaternion,
            angular_velocity,
            linear_acceleration,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(IMU_PAYLOAD_LEN);
        buf.put_u32_le(self.seq);
        buf.put_f64_le(self.stamp);
        self.quaternion.iter().for_each(|v| buf.put_f32_le(*v));
        self.angular_velocity.iter().for_each(|v| buf.put_f32_le(*v));
        self.linear_acceleration.iter().for_each(|v| buf.put_f32_le(*v));
        buf
    }

    pub fn to_frame(&self) -> Result<Bytes, ProtocolError> {
        encode_frame(PacketType::Imu.into(), &self.encode())
    }
}

// ============================================================================
// 版本信息 (0x69 / 105)
// ============================================================================

/// 版本信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VersionPacket {
    /// 硬件版本
    pub hardware: [u8; 4],
    /// 固件版本
    pub firmware: [u8; 4],
    /// 发布日期（ASCII，NUL 填充）
    pub date: [u8; 8],
}

impl VersionPacket {
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        check_len("version", payload, VERSION_PAYLOAD_LEN)?;
        let mut packet = Self::default();
        packet.hardware.copy_from_slice(&payload[0..4]);
        packet.firmware.copy_from_slice(&payload[4..8]);
        packet.date.copy_from_slice(&payload[8..16]);
        Ok(packet)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(VERSION_PAYLOAD_LEN);
        buf.put_slice(&self.hardware);
        buf.put_slice(&self.firmware);
        buf.put_slice(&self.date);
        buf
    }

    pub fn to_frame(&self) -> Result<Bytes, ProtocolError> {
        encode_frame(PacketType::Version.into(), &self.encode())
    }

    /// 固件版本字符串，如 `"1.2.0.5"`
    pub fn firmware_string(&self) -> String {
        dotted(&self.firmware)
    }

    /// 硬件版本字符串
    pub fn hardware_string(&self) -> String {
        dotted(&self.hardware)
    }

    /// 发布日期字符串（去除 NUL 填充，非 ASCII 字节被替换）
    pub fn date_string(&self) -> String {
        let end = self.date.iter().position(|&b| b == 0).unwrap_or(self.date.len());
        String::from_utf8_lossy(&self.date[..end]).into_owned()
    }
}

fn dotted(parts: &[u8; 4]) -> String {
    format!("{}.{}.{}.{}", parts[0], parts[1], parts[2], parts[3])
}

// ============================================================================
// 命令应答 (0x65 / 101)
// ============================================================================

/// 命令应答
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AckPacket {
    /// 被应答的包类型
    pub packet_type: u32,
    /// 被应答的命令类型
    pub cmd_type: u32,
    /// 被应答的命令参数
    pub cmd_value: u32,
    /// 状态（0 = 成功）
    pub status: u32,
}

impl AckPacket {
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        check_len("ack", payload, ACK_PAYLOAD_LEN)?;
        let mut buf = payload;
        Ok(Self {
            packet_type: buf.get_u32_le(),
            cmd_type: buf.get_u32_le(),
            cmd_value: buf.get_u32_le(),
            status: buf.get_u32_le(),
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ACK_PAYLOAD_LEN);
        buf.put_u32_le(self.packet_type);
        buf.put_u32_le(self.cmd_type);
        buf.put_u32_le(self.cmd_value);
        buf.put_u32_le(self.status);
        buf
    }

    pub fn to_frame(&self) -> Result<Bytes, ProtocolError> {
        encode_frame(PacketType::Ack.into(), &self.encode())
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

// ============================================================================
// 用户命令 (0x64 / 100)
// ============================================================================

/// 主机下发的用户命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserCommand {
    pub cmd_type: CommandType,
    pub cmd_value: u32,
}

impl UserCommand {
    /// 复位设备
    pub fn reset() -> Self {
        Self {
            cmd_type: CommandType::Reset,
            cmd_value: 0,
        }
    }

    /// 设置工作模式
    pub fn set_working_mode(mode: WorkingMode) -> Self {
        Self {
            cmd_type: CommandType::SetWorkingMode,
            cmd_value: mode.as_u32(),
        }
    }

    /// 请求版本信息
    pub fn request_version() -> Self {
        Self {
            cmd_type: CommandType::RequestVersion,
            cmd_value: 0,
        }
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        check_len("user command", payload, USER_COMMAND_PAYLOAD_LEN)?;
        let mut buf = payload;
        let cmd_type = CommandType::try_from(buf.get_u32_le())?;
        let cmd_value = buf.get_u32_le();
        Ok(Self { cmd_type, cmd_value })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(USER_COMMAND_PAYLOAD_LEN);
        buf.put_u32_le(self.cmd_type as u32);
        buf.put_u32_le(self.cmd_value);
        buf
    }

    pub fn to_frame(&self) -> Result<Bytes, ProtocolError> {
        encode_frame(PacketType::UserCommand.into(), &self.encode())
    }
}
