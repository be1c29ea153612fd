//! 最新完整点云的发布槽
//!
//! 写端（Reader）在一圈完成后以一次原子交换发布整圈点云；
//! 读端从任意线程 `load`，要么看到完整的旧圈，要么看到完整的新圈。

use crate::point::PointCloud;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// 写端
#[derive(Debug)]
pub struct CloudPublisher {
    slot: Arc<ArcSwapOption<PointCloud>>,
}

impl CloudPublisher {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(ArcSwapOption::empty()),
        }
    }

    /// 创建读端
    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            slot: self.slot.clone(),
        }
    }

    /// 发布一圈点云
    ///
    /// 如果被替换下来的旧圈已经没有任何读者持有，返回它以便复用缓冲区。
    pub fn publish(&self, cloud: PointCloud) -> Option<PointCloud> {
        let previous = self.slot.swap(Some(Arc::new(cloud)))?;
        Arc::try_unwrap(previous).ok()
    }

    pub fn latest(&self) -> Option<Arc<PointCloud>> {
        self.slot.load_full()
    }
}

impl Default for CloudPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// 读端（可克隆，可跨线程）
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    slot: Arc<ArcSwapOption<PointCloud>>,
}

impl SnapshotReader {
    /// 读取最新一圈（尚无完整圈时返回 `None`）
    pub fn load(&self) -> Option<Arc<PointCloud>> {
        self.slot.load_full()
    }

    pub fn has_cloud(&self) -> bool {
        self.slot.load().is_some()
    }
}
