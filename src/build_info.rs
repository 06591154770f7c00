//! 构建元数据（由 build.rs 注入）

pub const BUILD_VERSION: &str = env!("APP_BUILD_VERSION");
pub const BUILD_COMMIT: &str = env!("APP_BUILD_COMMIT");
pub const BUILD_TIMESTAMP: &str = env!("APP_BUILD_TIMESTAMP");

/// Cargo 包版本
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// 启动日志与健康检查使用的版本摘要
pub fn summary() -> String {
    format!(
        "{} (build {}, commit {}, built at {})",
        package_version(),
        BUILD_VERSION,
        BUILD_COMMIT,
        BUILD_TIMESTAMP
    )
}
