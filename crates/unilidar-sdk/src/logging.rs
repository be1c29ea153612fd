//! 日志初始化
//!
//! 安装 `tracing-subscriber` 的 fmt 输出，过滤规则取自 `RUST_LOG`（缺省 `info`），
//! 并把 `log` crate 的记录桥接到 tracing。

use tracing_subscriber::EnvFilter;

/// 按 `RUST_LOG` 初始化日志（缺省 `info`）
///
/// 已有全局 subscriber 时不做任何事，返回 `false`。
pub fn init_logger() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter)
}

/// 用给定的过滤规则初始化日志，如 `"unilidar_driver=debug,info"`
pub fn init_logger_with_filter(directives: &str) -> bool {
    install(EnvFilter::new(directives))
}

fn install(filter: EnvFilter) -> bool {
    let max_level = match filter.max_level_hint() {
        Some(level) => tracing_log::AsLog::as_log(&level),
        None => log::LevelFilter::Trace,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // 其他 log 实现已安装时保留它
    let _ = tracing_log::LogTracer::builder()
        .with_max_level(max_level)
        .init();
    true
}
