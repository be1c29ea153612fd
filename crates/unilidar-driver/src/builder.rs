//! Builder 模式实现
//!
//! 提供链式构造 `LidarReader` 的便捷方式。

use crate::config::ReaderConfig;
use crate::error::DriverError;
use crate::reader::LidarReader;
#[cfg(target_os = "linux")]
use unilidar_serial::TtyPort;
use unilidar_serial::Transport;

/// Reader Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use unilidar_driver::ReaderBuilder;
///
/// let reader = ReaderBuilder::new()
///     .port("/dev/ttyACM0")
///     .baud_rate(2_000_000)
///     .range_limits(0.1, 30.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReaderBuilder {
    config: ReaderConfig,
}

impl ReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以完整配置为起点
    pub fn config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置串口设备（默认 `/dev/ttyUSB0`）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.config.port = port.into();
        self
    }

    /// 设置波特率（默认 2M）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.config.baud_rate = baud_rate;
        self
    }

    pub fn max_points_per_revolution(mut self, max_points: usize) -> Self {
        self.config.max_points_per_revolution = max_points;
        self
    }

    pub fn yaw_bias(mut self, yaw_bias: f32) -> Self {
        self.config.yaw_bias = yaw_bias;
        self
    }

    /// 距离换算：`range = raw * scale + bias`
    pub fn range_calibration(mut self, scale: f32, bias: f32) -> Self {
        self.config.range_scale = scale;
        self.config.range_bias = bias;
        self
    }

    /// 有效距离区间（米）
    pub fn range_limits(mut self, min: f32, max: f32) -> Self {
        self.config.range_min = min;
        self.config.range_max = max;
        self
    }

    pub fn current_config(&self) -> &ReaderConfig {
        &self.config
    }

    /// 打开串口并创建 Reader
    ///
    /// 先校验配置再打开设备；任何一步失败都不会留下已打开的串口。
    #[cfg(target_os = "linux")]
    pub fn build(self) -> Result<LidarReader<TtyPort>, DriverError> {
        self.config.validate()?;
        let port = TtyPort::open(self.config.port.clone(), self.config.baud_rate)?;
        LidarReader::new(port, self.config)
    }

    /// 在给定传输上创建 Reader（测试、回放或自定义串口实现）
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<LidarReader<T>, DriverError> {
        LidarReader::new(transport, self.config)
    }
}
