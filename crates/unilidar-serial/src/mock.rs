//! 内存传输（Mock）
//!
//! `MockTransport` 交给驱动层，`MockDevice` 留在测试侧模拟设备：
//! 向线路灌入上行字节、限制单次读取长度（模拟串口分片到达）、
//! 注入读取错误、取回主机下发的字节。

use crate::{SerialDeviceError, SerialDeviceErrorKind, SerialError, Transport};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug)]
struct Line {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
    max_read: usize,
    fail_next_read: Option<SerialDeviceErrorKind>,
    closed: bool,
}

/// 主机侧的内存传输
#[derive(Debug)]
pub struct MockTransport {
    line: Arc<Mutex<Line>>,
}

/// 设备侧句柄（可克隆，可跨线程）
#[derive(Debug, Clone)]
pub struct MockDevice {
    line: Arc<Mutex<Line>>,
}

impl MockTransport {
    /// 创建一条线路，返回主机端和设备端
    pub fn new() -> (Self, MockDevice) {
        let line = Arc::new(Mutex::new(Line {
            inbound: VecDeque::new(),
            outbound: Vec::new(),
            max_read: usize::MAX,
            fail_next_read: None,
            closed: false,
        }));
        (Self { line: line.clone() }, MockDevice { line })
    }
}

impl MockDevice {
    /// 设备上行字节
    pub fn feed(&self, data: &[u8]) {
        self.line.lock().inbound.extend(data.iter().copied());
    }

    /// 限制主机单次 `read` 能拿到的最大字节数
    pub fn set_max_read(&self, max_read: usize) {
        self.line.lock().max_read = max_read.max(1);
    }

    /// 下一次 `read` 返回指定类型的设备错误
    pub fn fail_next_read(&self, kind: SerialDeviceErrorKind) {
        self.line.lock().fail_next_read = Some(kind);
    }

    /// 模拟拔线：之后的读写都返回 `SerialError::Closed`
    pub fn disconnect(&self) {
        self.line.lock().closed = true;
    }

    /// 尚未被主机读取的字节数
    pub fn pending(&self) -> usize {
        self.line.lock().inbound.len()
    }

    /// 取走主机写入的全部字节
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.line.lock().outbound)
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        let mut line = self.line.lock();
        if line.closed {
            return Err(SerialError::Closed);
        }
        if let Some(kind) = line.fail_next_read.take() {
            return Err(SerialError::Device(SerialDeviceError::new(
                kind,
                "injected read failure",
            )));
        }

        let n = buf.len().min(line.max_read).min(line.inbound.len());
        for (slot, byte) in buf.iter_mut().zip(line.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), SerialError> {
        let mut line = self.line.lock();
        if line.closed {
            return Err(SerialError::Closed);
        }
        line.outbound.extend_from_slice(data);
        Ok(())
    }

    fn discard_input(&mut self) -> Result<(), SerialError> {
        self.line.lock().inbound.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_empty_line_returns_zero() {
        let (mut transport, _device) = MockTransport::new();
        let mut buf = [0u8; 16];
        assert_eq!(transport.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_max_read_limits_chunk() {
        let (mut transport, device) = MockTransport::new();
        device.feed(&[1, 2, 3, 4, 5]);
        device.set_max_read(2);

        let mut buf = [0u8; 16];
        assert_eq!(transport.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[1, 2]);
        assert_eq!(device.pending(), 3);
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let (mut transport, device) = MockTransport::new();
        device.feed(&[7]);
        device.fail_next_read(SerialDeviceErrorKind::Busy);

        let mut buf = [0u8; 4];
        assert!(matches!(
            transport.read(&mut buf),
            Err(SerialError::Device(SerialDeviceError {
                kind: SerialDeviceErrorKind::Busy,
                ..
            }))
        ));
        assert_eq!(transport.read(&mut buf).unwrap(), 1);
    }

    #[test]
    fn test_disconnect() {
        let (mut transport, device) = MockTransport::new();
        device.disconnect();
        assert!(matches!(transport.write_all(&[1]), Err(SerialError::Closed)));
        assert!(matches!(transport.read(&mut [0u8; 1]), Err(SerialError::Closed)));
    }

    #[test]
    fn test_discard_input() {
        let (mut transport, device) = MockTransport::new();
        device.feed(&[1, 2, 3]);
        transport.discard_input().unwrap();
        assert_eq!(device.pending(), 0);
    }
}
