//! # Unilidar Driver
//!
//! 串口 LiDAR 的驱动层，包括：
//! - 单步解析状态机（[`LidarReader::parse_step`]）
//! - 整圈点云组装（按声明点数判定完整性）
//! - 最新一圈的无锁发布（ArcSwap）
//! - 跨 C 边界的快照交接（[`Handoff`]）
//! - 可选的后台读取线程（[`ReaderThread`]）
//!
//! # 使用示例
//!
//! ```no_run
//! use unilidar_driver::{MessageTag, ReaderBuilder};
//!
//! let mut reader = ReaderBuilder::new().port("/dev/ttyUSB0").build()?;
//! loop {
//!     if reader.parse_step() == MessageTag::PointCloudComplete {
//!         let cloud = reader.latest_cloud().unwrap();
//!         println!("scan {} with {} points", cloud.scan_id, cloud.len());
//!     }
//! }
//! # Ok::<(), unilidar_driver::DriverError>(())
//! ```

pub mod assembler;
mod builder;
pub mod config;
mod error;
pub mod handoff;
pub mod metrics;
pub mod pipeline;
pub mod point;
mod reader;
pub mod snapshot;
pub mod version;

pub use assembler::{AppendOutcome, AssemblyError, CloudAssembler, PointConverter, ReaderPhase};
pub use builder::ReaderBuilder;
pub use config::ReaderConfig;
pub use error::DriverError;
pub use handoff::{BoundaryAllocator, BoundarySnapshot, CAllocator, Handoff, release_snapshot_buffer};
pub use metrics::{MetricsSnapshot, ReaderMetrics};
pub use pipeline::{PipelineConfig, ReaderThread};
pub use point::{ImuSample, Point, PointCloud, VersionInfo};
pub use reader::{LidarReader, MessageTag};
pub use snapshot::{CloudPublisher, SnapshotReader};
pub use version::SDK_VERSION;
