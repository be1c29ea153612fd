//! 工作模式命令

use super::{open_reader, poll_until};
use anyhow::Result;
use clap::Args;
use std::time::Duration;
use unilidar_sdk::protocol::{AckPacket, CommandType};
use unilidar_sdk::serial::Transport;
use unilidar_sdk::{LidarReader, MessageTag, ReaderConfig, WorkingMode};

/// 等待应答的时间
const ACK_TIMEOUT: Duration = Duration::from_millis(500);

/// 工作模式参数
#[derive(Args, Debug)]
pub struct ModeCommand {
    /// 目标模式（normal / standby）
    pub mode: WorkingMode,
}

impl ModeCommand {
    pub fn execute(&self, config: ReaderConfig) -> Result<()> {
        let mut reader = open_reader(config)?;
        println!("⚙️ 切换工作模式: {:?}", self.mode);

        match switch_mode(&mut reader, self.mode)? {
            Some(ack) if ack.status == 0 => println!("✅ 设备已确认"),
            Some(ack) => println!("⚠️ 设备应答状态 {}", ack.status),
            None => println!("⚠️ 命令已发送，未收到应答"),
        }
        Ok(())
    }
}

/// 下发模式并等待对应的应答
pub fn switch_mode<T: Transport>(reader: &mut LidarReader<T>, mode: WorkingMode) -> Result<Option<AckPacket>> {
    reader.set_working_mode(mode)?;
    let acked = poll_until(reader, ACK_TIMEOUT, |reader, tag| {
        tag == MessageTag::CommandAck
            && reader
                .last_ack()
                .is_some_and(|ack| ack.cmd_type == CommandType::SetWorkingMode as u32)
    });
    Ok(acked.then(|| reader.last_ack().copied()).flatten())
}
