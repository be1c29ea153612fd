//! 常用类型一次性导入

pub use crate::driver::{
    BoundarySnapshot, DriverError, ImuSample, LidarReader, MessageTag, Point, PointCloud,
    ReaderBuilder, ReaderConfig, ReaderPhase, SnapshotReader, VersionInfo,
};
pub use crate::protocol::WorkingMode;
pub use crate::serial::Transport;
