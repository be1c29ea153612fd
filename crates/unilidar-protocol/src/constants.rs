//! 协议常量定义

/// 帧头标记
pub const FRAME_HEADER: [u8; 4] = [0x55, 0xAA, 0x05, 0x0A];

/// 帧尾标记
pub const FRAME_TAIL: [u8; 2] = [0x00, 0xFF];

/// 帧头长度：header(4) + packet_type(4) + packet_size(4)
pub const HEADER_LEN: usize = 12;

/// 帧尾长度：crc32(4) + msg_type_check(4) + reserved(2) + tail(2)
pub const TAIL_LEN: usize = 12;

/// 最小帧长度（空负载）
pub const MIN_FRAME_LEN: usize = HEADER_LEN + TAIL_LEN;

/// 最大负载长度
pub const MAX_PAYLOAD_LEN: usize = 4096;

/// 最大帧长度
///
/// 声明长度超过此值的帧视为损坏，解码器据此防止在错误的长度字段上无限等待。
pub const MAX_FRAME_LEN: usize = MIN_FRAME_LEN + MAX_PAYLOAD_LEN;

/// 点云批次负载的固定头部长度
pub const POINT_BATCH_HEAD_LEN: usize = 28;

/// 单个点在线上的编码长度
pub const POINT_RECORD_LEN: usize = 12;

/// 单个批次最多可携带的点数
pub const MAX_POINTS_PER_BATCH: usize = (MAX_PAYLOAD_LEN - POINT_BATCH_HEAD_LEN) / POINT_RECORD_LEN;

/// IMU 负载长度
pub const IMU_PAYLOAD_LEN: usize = 52;

/// 版本负载长度
pub const VERSION_PAYLOAD_LEN: usize = 16;

/// 应答负载长度
pub const ACK_PAYLOAD_LEN: usize = 16;

/// 用户命令负载长度
pub const USER_COMMAND_PAYLOAD_LEN: usize = 8;
