use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub mod api;
pub mod aps;
pub mod build_info;
pub mod model;
pub mod server;
pub mod util;

use aps::ApsClient;
use util::config::Config;
use util::http_client::HttpClient;

/// 应用状态结构
///
/// 只包含启动后不再变化的内容，请求之间不共享可变状态。
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// APS 客户端（内部共享同一个 reqwest 连接池）
    pub aps: Arc<ApsClient>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let http_client = HttpClient::for_aps(&config.aps)?;
        tracing::debug!(http_client = ?http_client, "HTTP客户端已创建");

        let aps = ApsClient::new(http_client.reqwest_client(), config.aps.clone());
        Ok(Self {
            config: Arc::new(config),
            aps: Arc::new(aps),
            started_at: Instant::now(),
        })
    }
}
