//! Reader 配置
//!
//! 所有字段都有默认值，TOML 文件中只需写出需要覆盖的字段。

use crate::error::DriverError;

/// 默认串口设备
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
/// 默认波特率
pub const DEFAULT_BAUD_RATE: u32 = 2_000_000;
/// 默认单圈点数上限
pub const DEFAULT_MAX_POINTS_PER_REVOLUTION: usize = 120_000;

/// Reader 初始化参数
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReaderConfig {
    /// 单圈最多允许的点数，超过则整圈丢弃
    pub max_points_per_revolution: usize,
    /// 串口设备路径
    pub port: String,
    /// 串口波特率
    pub baud_rate: u32,
    /// 水平角零位偏置（弧度）
    pub yaw_bias: f32,
    /// 距离原始值到米的比例
    pub range_scale: f32,
    /// 距离偏置（米）
    pub range_bias: f32,
    /// 有效距离上限（米）
    pub range_max: f32,
    /// 有效距离下限（米）
    pub range_min: f32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            max_points_per_revolution: DEFAULT_MAX_POINTS_PER_REVOLUTION,
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            yaw_bias: 0.0,
            range_scale: 0.001,
            range_bias: 0.0,
            range_max: 50.0,
            range_min: 0.0,
        }
    }
}

impl ReaderConfig {
    /// 检查参数合法性
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.max_points_per_revolution == 0 {
            return Err(DriverError::InvalidConfig(
                "max_points_per_revolution must be greater than 0".into(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(DriverError::InvalidConfig("baud_rate must be greater than 0".into()));
        }
        if !self.range_scale.is_finite() || self.range_scale == 0.0 {
            return Err(DriverError::InvalidConfig(format!(
                "range_scale must be finite and non-zero, got {}",
                self.range_scale
            )));
        }
        for (name, value) in [
            ("yaw_bias", self.yaw_bias),
            ("range_bias", self.range_bias),
            ("range_min", self.range_min),
            ("range_max", self.range_max),
        ] {
            if value.is_nan() {
                return Err(DriverError::InvalidConfig(format!("{} must not be NaN", name)));
            }
        }
        if self.range_min > self.range_max {
            return Err(DriverError::InvalidConfig(format!(
                "range_min ({}) is greater than range_max ({})",
                self.range_min, self.range_max
            )));
        }
        Ok(())
    }
}
