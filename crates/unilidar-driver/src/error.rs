//! 驱动层错误类型定义

use thiserror::Error;
use unilidar_protocol::ProtocolError;
use unilidar_serial::SerialError;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口传输错误（打开失败、写入失败等）
    #[error("Serial transport error: {0}")]
    Serial(#[from] SerialError),

    /// 协议编解码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 配置参数非法
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Reader 尚未初始化
    #[error("Reader not initialized")]
    NotInitialized,

    /// 读取线程错误
    #[error("Reader thread error: {0}")]
    ReaderThread(String),
}
