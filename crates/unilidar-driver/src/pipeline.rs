//! 后台读取线程
//!
//! 在独立线程上循环调用 `parse_step`，把每一圈完成的点云推入有界通道。
//! 消费者跟不上时新点云被丢弃（计入 `clouds_dropped`），不会阻塞解析。

use crate::error::DriverError;
use crate::metrics::ReaderMetrics;
use crate::point::PointCloud;
use crate::reader::{LidarReader, MessageTag};
use crate::snapshot::SnapshotReader;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, trace};
use unilidar_serial::Transport;

/// 读取线程配置
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// 点云通道容量
    pub channel_capacity: usize,
    /// 没有可处理数据时的休眠时间（微秒）
    pub idle_sleep_us: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 4,
            idle_sleep_us: 200,
        }
    }
}

/// 后台读取线程
///
/// `stop()` 或 drop 时设置停止标志并等待线程退出。
pub struct ReaderThread<T: Transport + Send + 'static> {
    is_running: Arc<AtomicBool>,
    handle: Option<JoinHandle<LidarReader<T>>>,
    clouds: Receiver<Arc<PointCloud>>,
    snapshots: SnapshotReader,
    metrics: Arc<ReaderMetrics>,
}

impl<T: Transport + Send + 'static> ReaderThread<T> {
    /// 启动读取线程，Reader 的所有权转移到线程中
    pub fn spawn(reader: LidarReader<T>, config: PipelineConfig) -> Result<Self, DriverError> {
        let (tx, rx) = bounded(config.channel_capacity.max(1));
        let is_running = Arc::new(AtomicBool::new(true));
        let snapshots = reader.snapshot_reader();
        let metrics = reader.metrics().clone();

        let is_running_clone = is_running.clone();
        let handle = std::thread::Builder::new()
            .name("unilidar-reader".into())
            .spawn(move || reader_loop(reader, tx, config, is_running_clone))
            .map_err(|e| DriverError::ReaderThread(format!("failed to spawn: {}", e)))?;

        info!("Reader thread started");
        Ok(Self {
            is_running,
            handle: Some(handle),
            clouds: rx,
            snapshots,
            metrics,
        })
    }

    /// 完成点云的接收端
    pub fn clouds(&self) -> &Receiver<Arc<PointCloud>> {
        &self.clouds
    }

    pub fn snapshot_reader(&self) -> &SnapshotReader {
        &self.snapshots
    }

    pub fn metrics(&self) -> &Arc<ReaderMetrics> {
        &self.metrics
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 停止线程并取回 Reader（线程 panic 时返回错误）
    pub fn stop(mut self) -> Result<LidarReader<T>, DriverError> {
        self.shutdown()
            .ok_or_else(|| DriverError::ReaderThread("reader thread panicked".into()))
    }

    fn shutdown(&mut self) -> Option<LidarReader<T>> {
        self.is_running.store(false, Ordering::Release);
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(reader) => {
                debug!("Reader thread joined");
                Some(reader)
            },
            Err(_) => {
                error!("Reader thread panicked");
                None
            },
        }
    }
}

impl<T: Transport + Send + 'static> Drop for ReaderThread<T> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn reader_loop<T: Transport>(
    mut reader: LidarReader<T>,
    tx: Sender<Arc<PointCloud>>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
) -> LidarReader<T> {
    // 设置线程优先级（可选 feature）
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::warn;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Reader thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set reader thread priority: {:?}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    let idle = Duration::from_micros(config.idle_sleep_us);
    while is_running.load(Ordering::Acquire) {
        match reader.parse_step() {
            MessageTag::NoMessage => spin_sleep::sleep(idle),
            MessageTag::PointCloudComplete => {
                let Some(cloud) = reader.latest_cloud() else {
                    continue;
                };
                match tx.try_send(cloud) {
                    Ok(()) => {},
                    Err(TrySendError::Full(cloud)) => {
                        reader.metrics().clouds_dropped.fetch_add(1, Ordering::Relaxed);
                        trace!("Cloud channel full, dropping scan {}", cloud.scan_id);
                    },
                    Err(TrySendError::Disconnected(_)) => {
                        // 没有消费者也继续解析，快照槽仍然可用
                    },
                }
            },
            _ => {},
        }
    }

    trace!("Reader thread: is_running flag is false, exiting");
    reader
}
