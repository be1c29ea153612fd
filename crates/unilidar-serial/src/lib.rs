//! # Unilidar Serial Transport Layer
//!
//! 串口传输抽象层，为驱动层提供统一的非阻塞字节读写接口。
//!
//! - Linux: [`TtyPort`]（termios 原始模式）
//! - 所有平台: [`MockTransport`]（内存线路，用于测试和回放）

use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod tty;

#[cfg(target_os = "linux")]
pub use tty::TtyPort;

pub mod mock;

pub use mock::{MockDevice, MockTransport};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] SerialDeviceError),
    #[error("Write timeout")]
    Timeout,
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),
    #[error("Port closed")]
    Closed,
}

/// 设备错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialDeviceErrorKind {
    Unknown,
    NotFound,
    AccessDenied,
    Busy,
    UnsupportedConfig,
    Disconnected,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct SerialDeviceError {
    pub kind: SerialDeviceErrorKind,
    pub message: String,
}

impl SerialDeviceError {
    pub fn new(kind: SerialDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 致命错误：重试同一操作没有意义，需要重新初始化
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SerialDeviceErrorKind::NotFound
                | SerialDeviceErrorKind::AccessDenied
                | SerialDeviceErrorKind::Disconnected
        )
    }
}

impl From<String> for SerialDeviceError {
    fn from(message: String) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for SerialDeviceError {
    fn from(message: &str) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

/// 字节传输接口
///
/// `read` 必须是非阻塞的：没有可用数据时返回 `Ok(0)`，而不是等待。
/// 驱动层的单步解析依赖这一点保证不会阻塞调用方的 IO 循环。
pub trait Transport {
    /// 读取当前可用的字节，返回读取数量（0 表示暂无数据）
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    /// 写入全部字节
    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError>;

    /// 丢弃尚未读取的输入（默认无操作）
    fn discard_input(&mut self) -> Result<(), SerialError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        (**self).read(buf)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        (**self).write_all(data)
    }

    fn discard_input(&mut self) -> Result<(), SerialError> {
        (**self).discard_input()
    }
}
