//! 跨边界快照交接
//!
//! 把最新一圈点云复制到由 [`BoundaryAllocator`] 分配的缓冲区中，
//! 所有权随 [`BoundarySnapshot`] 转移给调用方（通常是 C/C++ 代码）。
//! 调用方用完后必须通过同一个分配器释放，且只能释放一次。
//!
//! - 尚无完整圈：`ready = false`，不分配
//! - 空圈：`ready = true`，`points` 为空指针，不分配
//! - 分配失败：`ready = false`，计入 `snapshot_alloc_failures`

use crate::metrics::ReaderMetrics;
use crate::point::Point;
use crate::snapshot::SnapshotReader;
use std::ptr::{self, NonNull};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{trace, warn};

/// 边界缓冲区分配器
pub trait BoundaryAllocator: Send + Sync {
    /// 分配可容纳 `len` 个点的未初始化缓冲区（`len > 0`），失败返回 `None`
    fn allocate(&self, len: usize) -> Option<NonNull<Point>>;

    /// 释放缓冲区
    ///
    /// # Safety
    ///
    /// `ptr` 必须由同一个分配器的 `allocate` 返回，且尚未被释放。
    unsafe fn release(&self, ptr: NonNull<Point>);
}

impl<A: BoundaryAllocator + ?Sized> BoundaryAllocator for Arc<A> {
    fn allocate(&self, len: usize) -> Option<NonNull<Point>> {
        (**self).allocate(len)
    }

    unsafe fn release(&self, ptr: NonNull<Point>) {
        unsafe { (**self).release(ptr) }
    }
}

/// C 运行时分配器（`malloc` / `free`）
///
/// C 侧也可以直接对缓冲区调用 `free()`。
#[derive(Debug, Clone, Copy, Default)]
pub struct CAllocator;

impl BoundaryAllocator for CAllocator {
    fn allocate(&self, len: usize) -> Option<NonNull<Point>> {
        let bytes = len.checked_mul(std::mem::size_of::<Point>())?;
        // malloc 的对齐满足任何基本类型
        let ptr = unsafe { libc::malloc(bytes) }.cast::<Point>();
        NonNull::new(ptr)
    }

    unsafe fn release(&self, ptr: NonNull<Point>) {
        unsafe { libc::free(ptr.as_ptr().cast()) }
    }
}

/// 交给调用方的一圈点云
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BoundarySnapshot {
    /// 是否包含一圈完整点云
    pub ready: bool,
    pub stamp: f64,
    pub scan_id: u32,
    pub ring_count: u32,
    /// 点缓冲区（空圈或未就绪时为空指针）
    pub points: *mut Point,
    pub len: usize,
    pub capacity: usize,
}

impl BoundarySnapshot {
    /// 未就绪的空快照
    pub const fn not_ready() -> Self {
        Self {
            ready: false,
            stamp: 0.0,
            scan_id: 0,
            ring_count: 0,
            points: ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    /// 以切片形式查看点
    ///
    /// # Safety
    ///
    /// 缓冲区必须尚未被释放。
    pub unsafe fn points(&self) -> &[Point] {
        if self.points.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.points, self.len) }
        }
    }
}

impl Default for BoundarySnapshot {
    fn default() -> Self {
        Self::not_ready()
    }
}

/// 快照交接
///
/// 只读取发布槽，不接触解析状态，可以与 `parse_step` 在不同线程并发调用。
#[derive(Debug, Clone)]
pub struct Handoff<A: BoundaryAllocator = CAllocator> {
    snapshots: SnapshotReader,
    allocator: A,
    metrics: Arc<ReaderMetrics>,
}

impl<A: BoundaryAllocator> Handoff<A> {
    pub fn new(snapshots: SnapshotReader, allocator: A, metrics: Arc<ReaderMetrics>) -> Self {
        Self {
            snapshots,
            allocator,
            metrics,
        }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// 复制最新一圈到新分配的边界缓冲区
    ///
    /// 每次调用都产生独立的缓冲区；非空的就绪快照必须恰好释放一次。
    pub fn take_snapshot(&self) -> BoundarySnapshot {
        let Some(cloud) = self.snapshots.load() else {
            return BoundarySnapshot::not_ready();
        };

        let len = cloud.len();
        let points = if len == 0 {
            ptr::null_mut()
        } else {
            match self.allocator.allocate(len) {
                Some(buffer) => {
                    unsafe {
                        ptr::copy_nonoverlapping(cloud.points.as_ptr(), buffer.as_ptr(), len)
                    };
                    buffer.as_ptr()
                },
                None => {
                    self.metrics
                        .snapshot_alloc_failures
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Failed to allocate boundary buffer for {} points (scan {})",
                        len, cloud.scan_id
                    );
                    return BoundarySnapshot::not_ready();
                },
            }
        };

        self.metrics.snapshots_taken.fetch_add(1, Ordering::Relaxed);
        trace!("Snapshot of scan {} with {} points", cloud.scan_id, len);
        BoundarySnapshot {
            ready: true,
            stamp: cloud.stamp,
            scan_id: cloud.scan_id,
            ring_count: cloud.ring_count,
            points,
            len,
            capacity: len,
        }
    }

    /// 释放 `take_snapshot` 产生的缓冲区（空指针被忽略）
    ///
    /// # Safety
    ///
    /// `ptr` 必须是本分配器的 `take_snapshot` 返回的 `points`，且尚未被释放。
    pub unsafe fn release_snapshot_buffer(&self, ptr: *mut Point) {
        if let Some(ptr) = NonNull::new(ptr) {
            unsafe { self.allocator.release(ptr) }
        }
    }
}

/// 释放 [`CAllocator`] 分配的快照缓冲区（空指针被忽略）
///
/// # Safety
///
/// `ptr` 必须是使用 [`CAllocator`] 的 `take_snapshot` 返回的 `points`，且尚未被释放。
pub unsafe fn release_snapshot_buffer(ptr: *mut Point) {
    if let Some(ptr) = NonNull::new(ptr) {
        unsafe { CAllocator.release(ptr) }
    }
}
