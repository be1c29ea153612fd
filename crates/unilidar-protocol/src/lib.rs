//! # Unilidar Protocol
//!
//! Unitree LiDAR 串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 帧头/帧尾、长度上限等协议常量
//! - `ids`: 包类型、命令类型、工作模式
//! - `codec`: 帧解码器（同步、长度、CRC 校验、重同步）与帧编码
//! - `messages`: 各类负载（点云批次、IMU、版本、应答、用户命令）
//!
//! ## 帧格式
//!
//! ```text
//! | 55 AA 05 0A | packet_type u32 | packet_size u32 | payload ... |
//! | crc32 u32 | msg_type_check u32 | reserved [2] | 00 FF |
//! ```
//!
//! 所有多字节字段均为小端字节序（Little Endian）。CRC32 覆盖帧头与负载。

pub mod codec;
pub mod constants;
pub mod ids;
pub mod messages;

// 重新导出常用类型
pub use codec::{DecoderStats, FrameDecoder, encode_frame};
pub use constants::*;
pub use ids::*;
pub use messages::*;

use bytes::Bytes;
use thiserror::Error;

/// 已通过完整性校验的协议帧
///
/// 只有 CRC、帧尾和类型校验全部通过的帧才会被构造出来，
/// 因此"有效性标志"由解码结果 `Result` 本身承载。
///
/// 帧是瞬态的：由 Reader 立即分发处理，不会被保留。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 原始包类型
    pub packet_type: u32,
    /// 包类型分类
    pub kind: MessageKind,
    /// 负载（不含帧头帧尾，零拷贝切片）
    pub payload: Bytes,
}

impl Frame {
    /// 负载字节
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid payload length for {what}: expected {expected}, got {actual}")]
    InvalidLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid frame size: {size} bytes")]
    InvalidFrameSize { size: usize },

    #[error("Checksum mismatch: frame carries 0x{expected:08X}, computed 0x{actual:08X}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("Invalid frame tail")]
    InvalidTail,

    #[error("Type check mismatch: packet type {packet_type}, check field {check}")]
    TypeCheckMismatch { packet_type: u32, check: u32 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u32 },

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },
}

impl ProtocolError {
    /// 是否为帧级损坏（解码器已丢弃一个字节并将重新同步）
    pub fn is_corrupt_frame(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidFrameSize { .. }
                | ProtocolError::ChecksumMismatch { .. }
                | ProtocolError::InvalidTail
                | ProtocolError::TypeCheckMismatch { .. }
        )
    }
}
