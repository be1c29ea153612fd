//! Unilidar SDK - Unitree 串口 LiDAR Rust SDK
//!
//! # 架构设计
//!
//! 从底层到高层：
//!
//! - **传输层** (`serial`): 串口抽象，Linux termios 实现和内存 Mock
//! - **协议层** (`protocol`): 帧解码、重同步、消息编解码
//! - **驱动层** (`driver`): 单步解析、整圈组装、快照发布与边界交接
//! - **C ABI** (`ffi`): 供 C/C++ 调用的不透明句柄接口
//!
//! # 快速开始
//!
//! ```no_run
//! use unilidar_sdk::prelude::*;
//!
//! unilidar_sdk::init_logger();
//! let mut reader = ReaderBuilder::new().port("/dev/ttyUSB0").build()?;
//! reader.set_working_mode(WorkingMode::Normal)?;
//! loop {
//!     if reader.parse_step() == MessageTag::PointCloudComplete {
//!         let cloud = reader.latest_cloud().unwrap();
//!         println!("scan {}: {} points", cloud.scan_id, cloud.len());
//!     }
//! }
//! # Ok::<(), DriverError>(())
//! ```

pub mod ffi;
mod logging;
pub mod prelude;

pub use unilidar_driver as driver;
pub use unilidar_protocol as protocol;
pub use unilidar_serial as serial;

pub use logging::{init_logger, init_logger_with_filter};

// 常用类型
pub use driver::{
    BoundarySnapshot, DriverError, Handoff, LidarReader, MessageTag, Point, PointCloud,
    ReaderBuilder, ReaderConfig, SDK_VERSION,
};
pub use protocol::{ProtocolError, WorkingMode};
pub use serial::{SerialError, Transport};
