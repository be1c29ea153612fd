//! 版本查询命令

use super::{open_reader, poll_until};
use anyhow::{Result, bail};
use clap::Args;
use std::time::Duration;
use unilidar_sdk::serial::Transport;
use unilidar_sdk::{LidarReader, MessageTag, ReaderConfig, prelude::VersionInfo};

/// 版本查询参数
#[derive(Args, Debug)]
pub struct VersionCommand {
    /// 等待设备应答的超时（毫秒）
    #[arg(long, default_value_t = 1000)]
    pub timeout_ms: u64,
}

impl VersionCommand {
    pub fn execute(&self, config: ReaderConfig) -> Result<()> {
        let mut reader = open_reader(config)?;
        let Some(info) = query_version(&mut reader, Duration::from_millis(self.timeout_ms))? else {
            bail!("{} ms 内没有收到版本信息", self.timeout_ms);
        };

        println!("硬件版本: {}", info.hardware);
        println!("固件版本: {}", info.firmware);
        println!("固件日期: {}", info.date);
        println!("SDK 版本: {}", reader.sdk_version());
        Ok(())
    }
}

/// 请求版本并等待应答，超时返回 `None`
pub fn query_version<T: Transport>(
    reader: &mut LidarReader<T>,
    timeout: Duration,
) -> Result<Option<VersionInfo>> {
    reader.request_version()?;
    let received = poll_until(reader, timeout, |_, tag| tag == MessageTag::VersionInfo);
    Ok(received.then(|| reader.version_info().cloned()).flatten())
}
