//! 点云监视命令
//!
//! 后台线程解析，主线程每收到一圈打印一行摘要，Ctrl-C 退出。

use super::open_reader;
use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::RecvTimeoutError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;
use unilidar_sdk::driver::{MetricsSnapshot, PipelineConfig, ReaderThread};
use unilidar_sdk::{PointCloud, ReaderConfig};

/// 监视参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 收到指定圈数后退出（默认一直运行）
    #[arg(short = 'n', long)]
    pub count: Option<u64>,
}

impl MonitorCommand {
    pub fn execute(&self, config: ReaderConfig) -> Result<()> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        ctrlc::set_handler(move || running_clone.store(false, Ordering::SeqCst))
            .context("无法注册 Ctrl-C 处理")?;

        let reader = open_reader(config)?;
        let thread = ReaderThread::spawn(reader, PipelineConfig::default())?;
        println!("📡 监视中，按 Ctrl-C 退出");

        let mut received = 0u64;
        while running.load(Ordering::SeqCst) {
            match thread.clouds().recv_timeout(Duration::from_millis(100)) {
                Ok(cloud) => {
                    received += 1;
                    println!("{}", summarize(&cloud));
                    if self.count.is_some_and(|count| received >= count) {
                        break;
                    }
                },
                Err(RecvTimeoutError::Timeout) => {},
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Reader thread stopped unexpectedly");
                    break;
                },
            }
        }

        let reader = thread.stop()?;
        println!("{}", summarize_metrics(&reader.metrics().snapshot()));
        Ok(())
    }
}

/// 一圈点云的单行摘要
pub fn summarize(cloud: &PointCloud) -> String {
    let returns: Vec<f32> = cloud
        .points
        .iter()
        .filter(|p| p.has_return())
        .map(|p| p.range)
        .collect();
    let (min, max) = returns
        .iter()
        .fold((f32::INFINITY, 0.0f32), |(lo, hi), &r| (lo.min(r), hi.max(r)));

    if returns.is_empty() {
        format!(
            "scan {:>6}  stamp {:.3}  points {:>6}  returns      0",
            cloud.scan_id,
            cloud.stamp,
            cloud.len()
        )
    } else {
        format!(
            "scan {:>6}  stamp {:.3}  points {:>6}  returns {:>6}  range {:.2}..{:.2} m",
            cloud.scan_id,
            cloud.stamp,
            cloud.len(),
            returns.len(),
            min,
            max
        )
    }
}

fn summarize_metrics(m: &MetricsSnapshot) -> String {
    format!(
        "📊 revolutions {} (abandoned {}), frames {}, decode errors {}, dropped batches {}, dropped clouds {}",
        m.revolutions_completed,
        m.revolutions_abandoned,
        m.frames_decoded,
        m.decode_errors,
        m.batches_dropped(),
        m.clouds_dropped
    )
}
