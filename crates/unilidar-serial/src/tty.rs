//! Linux 串口传输实现
//!
//! 以 `O_NONBLOCK | O_NOCTTY` 打开 tty 设备，通过 termios 配置为原始模式
//! （8N1、无流控、`VMIN = 0`、`VTIME = 0`）。读操作在无数据时立即返回 0。
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**
//! - **权限要求**：通常需要 `dialout` 组权限

use crate::{SerialDeviceError, SerialDeviceErrorKind, SerialError, Transport};
use nix::sys::termios::{
    self, BaudRate, ControlFlags, FlushArg, SetArg, SpecialCharacterIndices,
};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 写超时：设备端长时间不读取视为链路故障
const WRITE_TIMEOUT: Duration = Duration::from_millis(100);

/// 非阻塞 tty 串口
#[derive(Debug)]
pub struct TtyPort {
    file: File,
    path: String,
    baud_rate: u32,
}

impl TtyPort {
    /// 打开并配置串口
    ///
    /// # 错误
    /// - `SerialError::UnsupportedBaudRate`: 波特率不在 termios 支持的列表中
    /// - `SerialError::Device`: 设备不存在、无权限或被占用
    /// - `SerialError::Io`: termios 配置失败
    pub fn open(path: impl Into<String>, baud_rate: u32) -> Result<Self, SerialError> {
        let path = path.into();
        let speed = baud_rate_constant(baud_rate)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(&path)
            .map_err(|e| open_error(&path, e))?;

        let mut tio = termios::tcgetattr(&file).map_err(nix_to_io)?;
        termios::cfmakeraw(&mut tio);
        termios::cfsetspeed(&mut tio, speed).map_err(nix_to_io)?;
        tio.control_flags |= ControlFlags::CLOCAL | ControlFlags::CREAD;
        tio.control_flags &= !(ControlFlags::CSTOPB | ControlFlags::CRTSCTS);
        tio.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        tio.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&file, SetArg::TCSANOW, &tio).map_err(nix_to_io)?;
        termios::tcflush(&file, FlushArg::TCIOFLUSH).map_err(nix_to_io)?;

        debug!("Opened serial port '{}' at {} baud", path, baud_rate);
        Ok(Self {
            file,
            path,
            baud_rate,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Transport for TtyPort {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        match self.file.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(0),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    fn write_all(&mut self, mut data: &[u8]) -> Result<(), SerialError> {
        let deadline = Instant::now() + WRITE_TIMEOUT;
        while !data.is_empty() {
            match self.file.write(data) {
                Ok(0) => return Err(SerialError::Closed),
                Ok(n) => data = &data[n..],
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                    if Instant::now() >= deadline {
                        return Err(SerialError::Timeout);
                    }
                    std::thread::sleep(Duration::from_micros(200));
                },
                Err(e) => return Err(io_error(&self.path, e)),
            }
        }
        Ok(())
    }

    fn discard_input(&mut self) -> Result<(), SerialError> {
        trace!("Flushing pending input on '{}'", self.path);
        termios::tcflush(&self.file, FlushArg::TCIFLUSH).map_err(nix_to_io)?;
        Ok(())
    }
}

/// 波特率映射到 termios 常量
fn baud_rate_constant(baud_rate: u32) -> Result<BaudRate, SerialError> {
    let speed = match baud_rate {
        9600 => BaudRate::B9600,
        19200 => BaudRate::B19200,
        38400 => BaudRate::B38400,
        57600 => BaudRate::B57600,
        115200 => BaudRate::B115200,
        230400 => BaudRate::B230400,
        460800 => BaudRate::B460800,
        500000 => BaudRate::B500000,
        921600 => BaudRate::B921600,
        1000000 => BaudRate::B1000000,
        1500000 => BaudRate::B1500000,
        2000000 => BaudRate::B2000000,
        3000000 => BaudRate::B3000000,
        4000000 => BaudRate::B4000000,
        other => return Err(SerialError::UnsupportedBaudRate(other)),
    };
    Ok(speed)
}

fn nix_to_io(errno: nix::errno::Errno) -> SerialError {
    SerialError::Io(std::io::Error::from(errno))
}

fn open_error(path: &str, e: std::io::Error) -> SerialError {
    let kind = match e.kind() {
        ErrorKind::NotFound => SerialDeviceErrorKind::NotFound,
        ErrorKind::PermissionDenied => SerialDeviceErrorKind::AccessDenied,
        _ if e.raw_os_error() == Some(libc::EBUSY) => SerialDeviceErrorKind::Busy,
        _ => SerialDeviceErrorKind::Unknown,
    };
    SerialError::Device(SerialDeviceError::new(
        kind,
        format!("Failed to open serial port '{}': {}", path, e),
    ))
}

/// 读写过程中设备被拔出时内核返回 EIO/ENXIO
fn io_error(path: &str, e: std::io::Error) -> SerialError {
    match e.raw_os_error() {
        Some(libc::EIO) | Some(libc::ENXIO) | Some(libc::ENODEV) => {
            SerialError::Device(SerialDeviceError::new(
                SerialDeviceErrorKind::Disconnected,
                format!("Serial port '{}' disconnected: {}", path, e),
            ))
        },
        _ => SerialError::Io(e),
    }
}
