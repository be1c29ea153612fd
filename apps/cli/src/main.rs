//! # Unilidar CLI
//!
//! Command-line interface for Unitree serial LiDAR sensors.
//!
//! ```bash
//! # 打印每一圈的摘要，Ctrl-C 退出
//! unilidar-cli --port /dev/ttyUSB0 monitor
//!
//! # 查询固件版本
//! unilidar-cli version --timeout-ms 2000
//!
//! # 电机停转
//! unilidar-cli mode standby
//! ```
//!
//! 配置文件默认位于 `<config_dir>/unilidar/config.toml`，内容为 `ReaderConfig` 的字段，
//! 命令行参数优先于配置文件。

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{ModeCommand, MonitorCommand, VersionCommand};

/// Unilidar CLI - LiDAR 命令行工具
#[derive(Parser, Debug)]
#[command(name = "unilidar-cli")]
#[command(about = "Command-line interface for Unitree LiDAR sensors", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 <config_dir>/unilidar/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 串口设备（覆盖配置文件）
    #[arg(long, global = true)]
    port: Option<String>,

    /// 波特率（覆盖配置文件）
    #[arg(long, global = true)]
    baud: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 持续打印每一圈点云的摘要
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 查询固件与 SDK 版本
    Version {
        #[command(flatten)]
        args: VersionCommand,
    },

    /// 切换工作模式
    Mode {
        #[command(flatten)]
        args: ModeCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("unilidar_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let reader_config = config::resolve(cli.config.as_deref(), cli.port, cli.baud)?;

    match cli.command {
        Commands::Monitor { args } => args.execute(reader_config),
        Commands::Version { args } => args.execute(reader_config),
        Commands::Mode { args } => args.execute(reader_config),
    }
}
