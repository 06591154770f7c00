//! 服务器模块
//!
//! - 配置管理 (config.rs)
//! - HTTP服务器设置 (http.rs)
//!
//! 使用示例：
//! ```rust,ignore
//! use aps_viewer::server::ServerBootstrap;
//!
//! let server = ServerBootstrap::new()?;
//! server.start().await?;
//! ```

pub mod config;
pub mod http;

pub use config::{ConfigManager, ConfigValidationReport};
pub use http::{HttpServer, ServerManager};

use crate::build_info;
use crate::util::config::Config;
use crate::AppState;
use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// 服务器引导程序 - 统一的服务器启动入口
pub struct ServerBootstrap {
    config: Config,
    _log_guard: Option<WorkerGuard>,
}

impl ServerBootstrap {
    /// 加载配置、初始化日志并检查配置
    pub fn new() -> Result<Self> {
        let (config, validation_report) = ConfigManager::load_and_validate()?;
        let log_guard = ConfigManager::initialize_logging(&config)?;

        validation_report.log_summary();
        if validation_report.has_errors() {
            return Err(anyhow::anyhow!(
                "配置验证失败: {} 个错误",
                validation_report.error_count()
            ));
        }

        info!("[ok] 服务器引导程序初始化完成");
        Ok(Self {
            config,
            _log_guard: log_guard,
        })
    }

    /// 启动服务器
    pub async fn start(self) -> Result<()> {
        info!("=== APS Viewer 启动 ===");
        info!("版本信息: {}", build_info::summary());
        info!(
            "监听地址: {}:{}",
            self.config.server.host,
            self.config.get_port()
        );
        info!(
            bucket = %self.config.aps.bucket_key,
            output_format = %self.config.translation.output_format,
            poll_interval_secs = self.config.translation.poll_interval_secs,
            translation_timeout_secs = self.config.translation.timeout_secs,
            "APS 配置"
        );

        tokio::fs::create_dir_all(&self.config.uploads.directory)
            .await
            .with_context(|| format!("创建上传目录失败: {}", self.config.uploads.directory))?;

        let server_config = self.config.server.clone();
        let app_state = AppState::new(self.config)?;
        let server = ServerManager::create_server(&server_config, app_state).await?;

        if let Err(e) = ServerManager::start_server(server).await {
            error!("HTTP服务器异常退出: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// 用当前凭据换取一次令牌，确认 APS 接入配置可用
    pub async fn check_credentials(self) -> Result<()> {
        let app_state = AppState::new(self.config)?;
        let token = app_state
            .aps
            .get_access_token()
            .await
            .context("APS 凭据检查失败")?;

        info!(
            bucket = app_state.aps.bucket_key(),
            expires_in = token.expires_in,
            "[ok] APS 凭据有效"
        );
        println!(
            "APS 凭据有效: token_type={}, expires_in={}s, bucket={}",
            token.token_type,
            token.expires_in,
            app_state.aps.bucket_key()
        );
        Ok(())
    }
}

/// 便捷函数：启动服务器
pub async fn start_server() -> Result<()> {
    let bootstrap = ServerBootstrap::new()?;
    bootstrap.start().await
}

/// 便捷函数：检查 APS 凭据
pub async fn check_credentials() -> Result<()> {
    let bootstrap = ServerBootstrap::new()?;
    bootstrap.check_credentials().await
}
