//! HTTP客户端模块 - 支持依赖注入和配置管理
//!
//! 所有对 APS 的调用共用同一个连接池，客户端级超时取直传超时，
//! 普通 API 调用在请求级别再设置更短的超时。

use crate::util::config::ApsConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, warn};

/// HTTP客户端配置
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub tcp_keepalive_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            connect_timeout_secs: 30,
            user_agent: format!("APS-Viewer/{}", env!("CARGO_PKG_VERSION")),
            tcp_keepalive_secs: 60,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 10,
            http_proxy: None,
            https_proxy: None,
        }
    }
}

impl HttpClientConfig {
    /// 按 APS 配置推导超时
    pub fn for_aps(aps: &ApsConfig) -> Self {
        Self {
            timeout_secs: aps.upload_timeout_secs.max(aps.request_timeout_secs),
            ..Self::default()
        }
    }

    /// 从环境变量加载代理配置
    pub fn with_env_proxy(mut self) -> Self {
        if let Ok(proxy_url) = std::env::var("HTTP_PROXY") {
            self.http_proxy = Some(proxy_url);
        }
        if let Ok(proxy_url) = std::env::var("HTTPS_PROXY") {
            self.https_proxy = Some(proxy_url);
        }
        self
    }
}

/// HTTP客户端包装器
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = Self::build_reqwest_client(&config)?;
        Ok(Self { client, config })
    }

    /// 按 APS 配置创建客户端（含环境代理）
    pub fn for_aps(aps: &ApsConfig) -> Result<Self> {
        Self::new(HttpClientConfig::for_aps(aps).with_env_proxy())
    }

    fn build_reqwest_client(config: &HttpClientConfig) -> Result<Client> {
        let mut client_builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(&config.user_agent)
            .tcp_keepalive(Duration::from_secs(config.tcp_keepalive_secs))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host);

        if let Some(proxy_url) = &config.http_proxy {
            if let Ok(proxy) = reqwest::Proxy::http(proxy_url) {
                let proxy = proxy.no_proxy(reqwest::NoProxy::from_env());
                info!("使用HTTP代理: {}", proxy_url);
                client_builder = client_builder.proxy(proxy);
            } else {
                warn!("HTTP代理配置无效: {}", proxy_url);
            }
        }

        if let Some(proxy_url) = &config.https_proxy {
            if let Ok(proxy) = reqwest::Proxy::https(proxy_url) {
                let proxy = proxy.no_proxy(reqwest::NoProxy::from_env());
                info!("使用HTTPS代理: {}", proxy_url);
                client_builder = client_builder.proxy(proxy);
            } else {
                warn!("HTTPS代理配置无效: {}", proxy_url);
            }
        }

        client_builder.build().context("构建HTTP客户端失败")
    }

    /// 底层 reqwest 客户端（克隆共享同一连接池）
    pub fn reqwest_client(&self) -> Client {
        self.client.clone()
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::config::ConfigWriter;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.connect_timeout_secs, 30);
        assert_eq!(config.pool_max_idle_per_host, 10);
        assert!(config.user_agent.starts_with("APS-Viewer/"));
    }

    #[test]
    fn test_timeout_follows_upload_timeout() {
        let mut aps = ConfigWriter::generate_template().aps;
        aps.request_timeout_secs = 10;
        aps.upload_timeout_secs = 600;
        assert_eq!(HttpClientConfig::for_aps(&aps).timeout_secs, 600);
    }

    #[test]
    fn test_client_creation() {
        let aps = ConfigWriter::generate_template().aps;
        let client = HttpClient::for_aps(&aps);
        assert!(client.is_ok());
    }
}
