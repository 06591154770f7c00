//! 配置数据结构定义

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_APS_BASE_URL: &str = "https://developer.api.autodesk.com";
pub const DEFAULT_APS_SCOPE: &str = "data:read data:write data:create bucket:read";
/// 模板中的存储桶占位名
pub const TEMPLATE_BUCKET_KEY: &str = "your-bucket-key";

/// 主配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub aps: ApsConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn get_port(&self) -> u16 {
        self.server.port
    }
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 单个请求的最长处理时间，需覆盖整个转换等待窗口
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// APS 平台接入配置
#[derive(Clone, Serialize, Deserialize)]
pub struct ApsConfig {
    #[serde(default = "default_aps_base_url")]
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_aps_scope")]
    pub scope: String,
    pub bucket_key: String,
    /// 普通 API 调用超时（秒）
    #[serde(default = "default_api_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 文件直传超时（秒）
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
}

fn default_aps_base_url() -> String {
    DEFAULT_APS_BASE_URL.to_string()
}

fn default_aps_scope() -> String {
    DEFAULT_APS_SCOPE.to_string()
}

fn default_api_timeout_secs() -> u64 {
    30
}

fn default_upload_timeout_secs() -> u64 {
    120
}

impl ApsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }
}

impl fmt::Debug for ApsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApsConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[hidden]")
            .field("scope", &self.scope)
            .field("bucket_key", &self.bucket_key)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .finish()
    }
}

/// 模型转换配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default = "default_views")]
    pub views: Vec<String>,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_translation_timeout_secs")]
    pub timeout_secs: u64,
    /// 前端 Viewer 脚本版本
    #[serde(default = "default_viewer_version")]
    pub viewer_version: String,
}

fn default_output_format() -> String {
    "svf".to_string()
}

fn default_views() -> Vec<String> {
    vec!["3d".to_string()]
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_translation_timeout_secs() -> u64 {
    120
}

fn default_viewer_version() -> String {
    "7.*".to_string()
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            output_format: default_output_format(),
            views: default_views(),
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_translation_timeout_secs(),
            viewer_version: default_viewer_version(),
        }
    }
}

impl TranslationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 本地上传目录配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub directory: String,
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,
    /// 转换任务提交后是否保留本地副本
    #[serde(default = "default_retain_local_files")]
    pub retain_local_files: bool,
    /// 保留本地副本时，上传目录最多保留的文件数（按时间戳保留最新的）
    #[serde(default = "default_max_retained_files")]
    pub max_retained_files: usize,
}

fn default_max_upload_mb() -> u64 {
    200
}

fn default_retain_local_files() -> bool {
    true
}

fn default_max_retained_files() -> usize {
    50
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: "uploads".to_string(),
            max_upload_mb: default_max_upload_mb(),
            retain_local_files: default_retain_local_files(),
            max_retained_files: default_max_retained_files(),
        }
    }
}

impl UploadConfig {
    pub fn max_upload_bytes(&self) -> usize {
        (self.max_upload_mb as usize) * 1024 * 1024
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: LogFileConfig,
    pub structured: Option<bool>,
    #[serde(default)]
    pub level_config: Option<LevelConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: LogFileConfig::default(),
            structured: Some(false),
            level_config: None,
        }
    }
}

/// 日志文件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogFileConfig {
    pub enabled: bool,
    pub directory: String,
    pub retention_days: Option<u32>,
}

impl Default for LogFileConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: "logs".to_string(),
            retention_days: Some(7),
        }
    }
}

/// 分模块日志级别
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LevelConfig {
    #[serde(default)]
    pub api: Option<String>,
    /// APS 调用链路（aps 模块）
    #[serde(default)]
    pub aps: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}
