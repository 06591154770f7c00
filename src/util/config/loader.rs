//! 配置加载和管理模块
//! 处理配置文件的读取、写入、环境变量覆盖和默认值生成

use super::types::*;
use anyhow::Result;
use std::fs;
use std::path::Path;
use url::Url;

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从YAML文件读取配置
    pub fn read_yaml(path: impl AsRef<Path>) -> Result<Config> {
        let config_str = fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }

    /// 从环境变量读取配置覆盖
    pub fn apply_env_overrides(mut config: Config) -> Config {
        tracing::info!("[tool] 应用环境变量配置覆盖...");

        if let Ok(host) = std::env::var("VIEWER_HOST") {
            config.server.host = host.clone();
            tracing::info!("[ok] 环境变量覆盖服务器地址: {}", host);
        }

        if let Ok(port_str) = std::env::var("VIEWER_PORT") {
            match port_str.parse::<u16>() {
                Ok(port) => {
                    config.server.port = port;
                    tracing::info!("[ok] 环境变量覆盖服务器端口: {}", port);
                }
                Err(_) => tracing::warn!("[warn] VIEWER_PORT 无效: {}", port_str),
            }
        }

        if let Ok(base_url) = std::env::var("APS_BASE_URL") {
            config.aps.base_url = base_url.clone();
            tracing::info!("[ok] 环境变量覆盖APS地址: {}", base_url);
        }

        // 凭据只从环境变量读取时不打印明文
        if let Ok(client_id) = std::env::var("APS_CLIENT_ID") {
            config.aps.client_id = client_id;
            tracing::info!("[ok] 环境变量覆盖APS Client ID");
        }

        if let Ok(client_secret) = std::env::var("APS_CLIENT_SECRET") {
            config.aps.client_secret = client_secret;
            tracing::info!("[ok] 环境变量覆盖APS Client Secret: [安全隐藏]");
        }

        if let Ok(bucket_key) = std::env::var("APS_BUCKET_KEY") {
            config.aps.bucket_key = bucket_key.clone();
            tracing::info!("[ok] 环境变量覆盖存储桶: {}", bucket_key);
        }

        if let Ok(scope) = std::env::var("APS_SCOPE") {
            config.aps.scope = scope.clone();
            tracing::info!("[ok] 环境变量覆盖授权范围: {}", scope);
        }

        if let Ok(upload_dir) = std::env::var("VIEWER_UPLOAD_DIR") {
            config.uploads.directory = upload_dir.clone();
            tracing::info!("[ok] 环境变量覆盖上传目录: {}", upload_dir);
        }

        if let Ok(flag) = std::env::var("VIEWER_RETAIN_UPLOADS") {
            if let Ok(retain) = Self::parse_bool(&flag) {
                config.uploads.retain_local_files = retain;
                tracing::info!("[ok] 环境变量覆盖本地副本保留: {}", retain);
            } else {
                tracing::warn!("[warn] VIEWER_RETAIN_UPLOADS 无法解析为布尔值: {}", flag);
            }
        }

        if let Ok(level) = std::env::var("VIEWER_LOG_LEVEL") {
            config.logging.level = level.trim().to_ascii_lowercase();
            tracing::info!("[ok] 环境变量覆盖日志级别: {}", config.logging.level);
        }

        tracing::info!("[tool] 环境变量覆盖配置应用完成");
        tracing::info!(
            event = "config.summary",
            host = %config.server.host,
            port = config.server.port,
            aps_base_url = %config.aps.base_url,
            bucket = %config.aps.bucket_key,
            output_format = %config.translation.output_format,
            poll_interval_secs = config.translation.poll_interval_secs,
            translation_timeout_secs = config.translation.timeout_secs,
            upload_dir = %config.uploads.directory
        );

        config
    }

    /// 解析布尔环境变量
    fn parse_bool(value: &str) -> Result<bool, ()> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(true),
            "false" | "0" | "no" | "n" => Ok(false),
            _ => Err(()),
        }
    }

    /// 智能配置加载（配置文件 + 环境变量）
    pub fn load_with_env_overrides(path: impl AsRef<Path>) -> Result<Config> {
        // 1. 从配置文件读取基础配置
        let base_config = Self::read_yaml(path)?;

        // 2. 应用环境变量覆盖
        let config = Self::apply_env_overrides(base_config);

        // 3. 验证最终配置
        Self::validate_config(&config)?;

        tracing::info!("[ok] 智能配置加载完成");
        Ok(config)
    }

    /// 验证配置的有效性（硬性错误）
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.server.port == 0 {
            return Err(anyhow::anyhow!("无效的端口号: {}", config.server.port));
        }

        let parsed = Url::parse(&config.aps.base_url)
            .map_err(|e| anyhow::anyhow!("aps.base_url 解析失败: {}", e))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(anyhow::anyhow!(
                "aps.base_url 必须以 http:// 或 https:// 开头: {}",
                config.aps.base_url
            ));
        }

        if config.translation.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("轮询间隔必须大于0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            return Err(anyhow::anyhow!("无效的日志级别: {}", config.logging.level));
        }

        Ok(())
    }
}

/// 配置写入器
pub struct ConfigWriter;

impl ConfigWriter {
    /// 将配置写入YAML文件
    pub fn write_yaml(config: &Config, path: impl AsRef<Path>) -> Result<()> {
        let yaml_content = serde_yaml::to_string(config)?;
        fs::write(path, yaml_content)?;
        Ok(())
    }

    /// 写入配置到指定路径，确保目录存在
    pub fn write_yaml_with_dir(config: &Config, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::write_yaml(config, path)
    }

    /// 生成配置模板
    pub fn generate_template() -> Config {
        Config {
            server: ServerConfig::default(),
            aps: ApsConfig {
                base_url: DEFAULT_APS_BASE_URL.to_string(),
                client_id: "".to_string(), // 通过 APS_CLIENT_ID 注入
                client_secret: "".to_string(),
                scope: DEFAULT_APS_SCOPE.to_string(),
                bucket_key: TEMPLATE_BUCKET_KEY.to_string(),
                request_timeout_secs: 30,
                upload_timeout_secs: 120,
            },
            translation: TranslationConfig::default(),
            uploads: UploadConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_YAML: &str = r#"
server:
  host: 0.0.0.0
  port: 8080
aps:
  client_id: id-123
  client_secret: secret-456
  bucket_key: bucket62218
translation:
  timeout_secs: 60
logging:
  level: debug
  file:
    enabled: false
    directory: logs
    retention_days: null
  structured: true
"#;

    #[test]
    fn test_read_yaml_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE_YAML.as_bytes()).unwrap();

        let config = ConfigLoader::read_yaml(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout_secs, 300);
        assert_eq!(config.aps.base_url, DEFAULT_APS_BASE_URL);
        assert_eq!(config.aps.scope, DEFAULT_APS_SCOPE);
        assert_eq!(config.translation.timeout_secs, 60);
        assert_eq!(config.translation.poll_interval_secs, 3);
        assert_eq!(config.translation.output_format, "svf");
        assert_eq!(config.translation.views, vec!["3d".to_string()]);
        assert_eq!(config.uploads.directory, "uploads");
        assert!(ConfigLoader::validate_config(&config).is_ok());
    }

    #[test]
    fn test_template_roundtrip_through_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("config.yaml");
        ConfigWriter::write_yaml_with_dir(&ConfigWriter::generate_template(), &path).unwrap();

        let loaded = ConfigLoader::read_yaml(&path).unwrap();
        assert_eq!(loaded.aps.bucket_key, "your-bucket-key");
        assert!(!loaded.aps.has_credentials());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ConfigWriter::generate_template();
        config.translation.poll_interval_secs = 0;
        assert!(ConfigLoader::validate_config(&config).is_err());

        let mut config = ConfigWriter::generate_template();
        config.logging.level = "verbose".to_string();
        assert!(ConfigLoader::validate_config(&config).is_err());

        let mut config = ConfigWriter::generate_template();
        config.aps.base_url = "ftp://example.com".to_string();
        assert!(ConfigLoader::validate_config(&config).is_err());
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("APS_BUCKET_KEY", "env-bucket");
        std::env::set_var("VIEWER_RETAIN_UPLOADS", "no");
        let config = ConfigLoader::apply_env_overrides(ConfigWriter::generate_template());
        std::env::remove_var("APS_BUCKET_KEY");
        std::env::remove_var("VIEWER_RETAIN_UPLOADS");

        assert_eq!(config.aps.bucket_key, "env-bucket");
        assert!(!config.uploads.retain_local_files);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config =
            serde_yaml::from_str(include_str!("../../../config.example.yaml")).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.aps.bucket_key, TEMPLATE_BUCKET_KEY);
        assert_eq!(config.translation.views, vec!["3d".to_string()]);
        assert_eq!(config.logging.file.retention_days, Some(7));
        assert_eq!(config.uploads.max_retained_files, 50);
        assert!(ConfigLoader::validate_config(&config).is_ok());
    }

    #[test]
    fn test_secret_hidden_in_debug() {
        let mut config = ConfigWriter::generate_template();
        config.aps.client_secret = "super-secret".to_string();
        let rendered = format!("{:?}", config.aps);
        assert!(!rendered.contains("super-secret"));
    }
}
