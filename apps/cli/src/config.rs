//! 配置文件加载
//!
//! 文件内容是 `ReaderConfig` 的 TOML 表示，缺省字段取默认值：
//!
//! ```toml
//! port = "/dev/ttyUSB1"
//! baud_rate = 2000000
//! range_min = 0.1
//! range_max = 30.0
//! ```

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use unilidar_sdk::ReaderConfig;

/// 默认配置文件路径
pub fn default_config_file() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("unilidar");
    path.push("config.toml");
    Some(path)
}

/// 读取配置文件
///
/// 显式指定的文件必须存在；默认位置的文件不存在时使用默认配置。
pub fn load(explicit: Option<&Path>) -> Result<ReaderConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_file() {
            Some(path) if path.exists() => path,
            _ => return Ok(ReaderConfig::default()),
        },
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
    let config: ReaderConfig = toml::from_str(&content)
        .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// 合并配置文件和命令行参数，并校验
pub fn resolve(explicit: Option<&Path>, port: Option<String>, baud: Option<u32>) -> Result<ReaderConfig> {
    let mut config = load(explicit)?;
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(baud) = baud {
        config.baud_rate = baud;
    }
    config.validate().context("配置无效")?;
    Ok(config)
}
