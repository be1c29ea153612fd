//! 包类型、命令类型与工作模式定义

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 包类型（帧头中的 `packet_type` 字段）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum PacketType {
    /// 用户命令（主机 → 设备）
    UserCommand = 100,
    /// 命令应答
    Ack = 101,
    /// 点云数据批次
    PointData = 102,
    /// IMU 数据
    Imu = 104,
    /// 版本信息
    Version = 105,
}

/// 设备上行消息的分类（封闭集合）
///
/// 新增消息种类必须在此处添加变体，Reader 中的分发是穷尽匹配，
/// 遗漏的分支会在编译期报错。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageKind {
    /// 点云批次
    PointBatch,
    /// IMU 采样
    Imu,
    /// 版本/信息应答
    Version,
    /// 命令应答
    Ack,
    /// 未知包类型（上报但忽略）
    Unknown(u32),
}

impl MessageKind {
    /// 根据包类型分类
    ///
    /// `UserCommand` 只会由主机发出，若从设备侧收到则视为未知。
    pub fn from_packet_type(packet_type: u32) -> Self {
        match PacketType::try_from(packet_type) {
            Ok(PacketType::PointData) => MessageKind::PointBatch,
            Ok(PacketType::Imu) => MessageKind::Imu,
            Ok(PacketType::Version) => MessageKind::Version,
            Ok(PacketType::Ack) => MessageKind::Ack,
            Ok(PacketType::UserCommand) | Err(_) => MessageKind::Unknown(packet_type),
        }
    }
}

/// 用户命令类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum CommandType {
    /// 复位设备
    Reset = 1,
    /// 设置工作模式（参数为 `WorkingMode`）
    SetWorkingMode = 2,
    /// 请求版本信息
    RequestVersion = 3,
}

impl TryFrom<u32> for CommandType {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CommandType::Reset),
            2 => Ok(CommandType::SetWorkingMode),
            3 => Ok(CommandType::RequestVersion),
            _ => Err(ProtocolError::InvalidValue {
                field: "CommandType".to_string(),
                value,
            }),
        }
    }
}

/// LiDAR 工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u32)]
pub enum WorkingMode {
    /// 正常旋转扫描
    #[default]
    Normal = 1,
    /// 待机（电机停转）
    Standby = 2,
}

impl WorkingMode {
    /// 转换为线上数值
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for WorkingMode {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(WorkingMode::Normal),
            2 => Ok(WorkingMode::Standby),
            _ => Err(ProtocolError::InvalidValue {
                field: "WorkingMode".to_string(),
                value,
            }),
        }
    }
}

impl std::str::FromStr for WorkingMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(WorkingMode::Normal),
            "standby" => Ok(WorkingMode::Standby),
            _ => Err(ProtocolError::InvalidValue {
                field: format!("WorkingMode({})", s),
                value: 0,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_kind_from_packet_type() {
        assert_eq!(MessageKind::from_packet_type(102), MessageKind::PointBatch);
        assert_eq!(MessageKind::from_packet_type(104), MessageKind::Imu);
        assert_eq!(MessageKind::from_packet_type(105), MessageKind::Version);
        assert_eq!(MessageKind::from_packet_type(101), MessageKind::Ack);
        assert_eq!(MessageKind::from_packet_type(103), MessageKind::Unknown(103));
        // 主机命令不会出现在上行方向
        assert_eq!(MessageKind::from_packet_type(100), MessageKind::Unknown(100));
    }

    #[test]
    fn test_packet_type_into_u32() {
        let value: u32 = PacketType::PointData.into();
        assert_eq!(value, 102);
        assert_eq!(PacketType::try_from(105).unwrap(), PacketType::Version);
        assert!(PacketType::try_from(7).is_err());
    }

    #[test]
    fn test_working_mode_from_u32() {
        assert_eq!(WorkingMode::try_from(1).unwrap(), WorkingMode::Normal);
        assert_eq!(WorkingMode::try_from(2).unwrap(), WorkingMode::Standby);
        assert!(WorkingMode::try_from(0).is_err());
        assert_eq!(WorkingMode::Standby.as_u32(), 2);
    }

    #[test]
    fn test_working_mode_from_str() {
        assert_eq!("normal".parse::<WorkingMode>().unwrap(), WorkingMode::Normal);
        assert_eq!("STANDBY".parse::<WorkingMode>().unwrap(), WorkingMode::Standby);
        assert!("sleep".parse::<WorkingMode>().is_err());
    }

    #[test]
    fn test_command_type_from_u32() {
        assert_eq!(CommandType::try_from(1).unwrap(), CommandType::Reset);
        assert_eq!(CommandType::try_from(3).unwrap(), CommandType::RequestVersion);
        let err = CommandType::try_from(42).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidValue { value: 42, .. }));
    }
}
