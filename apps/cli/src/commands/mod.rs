//! 命令定义和实现

pub mod mode;
pub mod monitor;
pub mod version;

pub use mode::ModeCommand;
pub use monitor::MonitorCommand;
pub use version::VersionCommand;

use anyhow::Result;
use std::time::{Duration, Instant};
use unilidar_sdk::serial::Transport;
use unilidar_sdk::{LidarReader, MessageTag, ReaderConfig};

/// 命令使用的 Reader（传输层擦除为 trait object）
pub type CliReader = LidarReader<Box<dyn Transport + Send>>;

/// 打开串口并创建 Reader
#[cfg(target_os = "linux")]
pub fn open_reader(config: ReaderConfig) -> Result<CliReader> {
    use anyhow::Context;

    println!("🔌 打开 {} @ {} baud...", config.port, config.baud_rate);
    let port = unilidar_sdk::serial::TtyPort::open(config.port.clone(), config.baud_rate)
        .with_context(|| format!("无法打开串口 {}", config.port))?;
    let transport: Box<dyn Transport + Send> = Box::new(port);
    Ok(LidarReader::new(transport, config)?)
}

#[cfg(not(target_os = "linux"))]
pub fn open_reader(_config: ReaderConfig) -> Result<CliReader> {
    anyhow::bail!("串口目前只支持 Linux")
}

/// 持续解析直到 `done` 返回 true 或超时
///
/// 返回是否在超时前满足条件。
pub fn poll_until<T, F>(reader: &mut LidarReader<T>, timeout: Duration, mut done: F) -> bool
where
    T: Transport,
    F: FnMut(&LidarReader<T>, MessageTag) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let tag = reader.parse_step();
        if done(reader, tag) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        if tag == MessageTag::NoMessage {
            std::thread::sleep(Duration::from_micros(500));
        }
    }
}
