//! 配置管理模块
//! 负责配置文件的查找、加载、验证和日志初始化

use crate::util::config::loader::ConfigLoader;
use crate::util::config::{Config, TEMPLATE_BUCKET_KEY};
use crate::util::log::{cleanup_old_logs, log_init_with_config};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

/// 日志文件名前缀
pub const LOG_FILE_PREFIX: &str = "aps-viewer";

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 加载和验证配置
    pub fn load_and_validate() -> Result<(Config, ConfigValidationReport)> {
        let config_path = Self::find_config_file_path("config.yaml");
        info!("配置文件路径: {}", config_path.display());

        let config = match ConfigLoader::load_with_env_overrides(&config_path) {
            Ok(config) => config,
            Err(e) => {
                warn!("[warn] 配置文件读取失败: {} - {}", config_path.display(), e);
                Self::handle_config_load_failure(&config_path)?
            }
        };

        let validation_report = Self::validate_config(&config);

        info!("[ok] 配置加载完成");
        Ok((config, validation_report))
    }

    /// 初始化日志系统，并按保留天数清理旧日志
    pub fn initialize_logging(config: &Config) -> Result<Option<WorkerGuard>> {
        let log_guard = log_init_with_config(LOG_FILE_PREFIX, &config.logging)?;

        if let (true, Some(retention_days)) =
            (config.logging.file.enabled, config.logging.file.retention_days)
        {
            let log_path = Path::new(&config.logging.file.directory);
            match cleanup_old_logs(log_path, LOG_FILE_PREFIX, retention_days) {
                Ok(removed) => info!(
                    removed = removed,
                    "[ok] 日志清理完成，保留 {} 天",
                    retention_days
                ),
                Err(e) => warn!("日志清理失败: {}", e),
            }
        }

        info!("[ok] 日志系统初始化完成");
        Ok(log_guard)
    }

    /// 智能查找配置文件路径，适应开发和生产环境
    pub fn find_config_file_path(filename: &str) -> PathBuf {
        let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        // 当前目录下的 config/
        let config_in_current = current_dir.join("config").join(filename);
        if config_in_current.exists() {
            return config_in_current;
        }

        // 在 bin/ 目录运行时使用上级目录的 config/
        if let Some(parent) = current_dir.parent() {
            let config_in_parent = parent.join("config").join(filename);
            if config_in_parent.exists() {
                return config_in_parent;
            }
        }

        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
        {
            if exe_dir.file_name() == Some(std::ffi::OsStr::new("bin")) {
                if let Some(project_root) = exe_dir.parent() {
                    let config_in_root = project_root.join("config").join(filename);
                    if config_in_root.exists() {
                        return config_in_root;
                    }
                }
            }
        }

        current_dir.join(filename)
    }

    /// 配置文件不存在时写出默认模板；存在但无法解析则报错
    fn handle_config_load_failure(config_path: &Path) -> Result<Config> {
        if !config_path.exists() {
            info!("[note] 创建默认配置文件: {}", config_path.display());
            let config = ConfigLoader::apply_env_overrides(Config::default());
            if let Err(write_err) = Config::default().write_yaml_to_path(config_path) {
                warn!("[fail] 创建默认配置文件失败: {}", write_err);
            }
            Ok(config)
        } else {
            warn!("[fail] 配置文件存在但无法解析，请检查语法");
            Err(anyhow::anyhow!(
                "配置文件解析失败: {}",
                config_path.display()
            ))
        }
    }

    /// 验证配置
    pub fn validate_config(config: &Config) -> ConfigValidationReport {
        let mut report = ConfigValidationReport::new();

        Self::validate_server_settings(config, &mut report);
        Self::validate_aps_settings(config, &mut report);
        Self::validate_translation_settings(config, &mut report);
        Self::validate_upload_settings(config, &mut report);
        report
    }

    fn validate_server_settings(config: &Config, report: &mut ConfigValidationReport) {
        if config.get_port() == 0 {
            report.add_error("server.port", "端口不能为0");
        } else if config.get_port() < 1024 {
            report.add_warning("server.port", "使用了特权端口，可能需要管理员权限");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.logging.level.as_str()) {
            report.add_error("logging.level", "日志级别无效");
        }
    }

    fn validate_aps_settings(config: &Config, report: &mut ConfigValidationReport) {
        if !config.aps.has_credentials() {
            report.add_error("aps.client_id", "APS 凭据未配置（client_id/client_secret）");
        }

        if config.aps.bucket_key == TEMPLATE_BUCKET_KEY {
            report.add_error("aps.bucket_key", "存储桶名称仍是模板占位值");
        } else if !is_valid_bucket_key(&config.aps.bucket_key) {
            report.add_error(
                "aps.bucket_key",
                "存储桶名称须为 3-128 位小写字母、数字或 -_.",
            );
        }

        if config.aps.scope.trim().is_empty() {
            report.add_error("aps.scope", "令牌 scope 不能为空");
        }
    }

    fn validate_translation_settings(config: &Config, report: &mut ConfigValidationReport) {
        let translation = &config.translation;
        if translation.poll_interval_secs == 0 {
            report.add_error("translation.poll_interval_secs", "轮询间隔必须大于0");
        }
        if translation.timeout_secs < translation.poll_interval_secs {
            report.add_error("translation.timeout_secs", "转换超时不能小于轮询间隔");
        }
        if config.server.request_timeout_secs <= translation.timeout_secs {
            report.add_warning(
                "server.request_timeout_secs",
                "请求超时不大于转换超时，长时间转换的请求会被提前中断",
            );
        }
        if translation.output_format.trim().is_empty() {
            report.add_error("translation.output_format", "输出格式不能为空");
        }
    }

    fn validate_upload_settings(config: &Config, report: &mut ConfigValidationReport) {
        if config.uploads.directory.trim().is_empty() {
            report.add_error("uploads.directory", "上传目录不能为空");
        }
        if config.uploads.max_upload_mb == 0 {
            report.add_error("uploads.max_upload_mb", "上传大小上限必须大于0");
        }
        if !config.uploads.retain_local_files {
            report.add_info("uploads.retain_local_files", "流程结束后删除本地上传文件");
        } else if config.uploads.max_retained_files == 0 {
            report.add_error("uploads.max_retained_files", "保留本地副本时最多保留文件数必须大于0");
        }
    }
}

/// APS 存储桶命名规则：`[-_.a-z0-9]{3,128}`
fn is_valid_bucket_key(bucket_key: &str) -> bool {
    (3..=128).contains(&bucket_key.len())
        && bucket_key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.'))
}

/// 配置验证报告
#[derive(Debug, Clone)]
pub struct ConfigValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub info: Vec<ValidationIssue>,
}

/// 验证问题
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ConfigValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_info(&mut self, field: &str, message: &str) {
        self.info.push(ValidationIssue {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_valid(&self) -> bool {
        !self.has_errors()
    }

    /// 输出验证结果（需在日志系统初始化之后调用）
    pub fn log_summary(&self) {
        if self.has_errors() {
            warn!("[warn] 配置验证发现错误: {}", self.error_count());
            for error in &self.errors {
                warn!("  - {}: {}", error.field, error.message);
            }
        }

        if self.has_warnings() {
            info!("配置验证发现警告: {}", self.warning_count());
            for warning in &self.warnings {
                info!("  - {}: {}", warning.field, warning.message);
            }
        }

        for item in &self.info {
            info!("  - {}: {}", item.field, item.message);
        }
    }
}

impl Default for ConfigValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.aps.client_id = "id".to_string();
        config.aps.client_secret = "secret".to_string();
        config.aps.bucket_key = "bucket62218".to_string();
        config
    }

    #[test]
    fn test_valid_config_has_no_errors() {
        let report = ConfigManager::validate_config(&valid_config());
        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors);
        assert!(!report.has_warnings(), "unexpected warnings: {:?}", report.warnings);
    }

    #[test]
    fn test_template_requires_credentials() {
        let report = ConfigManager::validate_config(&Config::default());
        let fields: Vec<&str> = report.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"aps.client_id"));
        assert!(fields.contains(&"aps.bucket_key"));
    }

    #[test]
    fn test_translation_timing_checks() {
        let mut config = valid_config();
        config.translation.poll_interval_secs = 10;
        config.translation.timeout_secs = 5;
        config.server.request_timeout_secs = 5;

        let report = ConfigManager::validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| e.field == "translation.timeout_secs"));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.field == "server.request_timeout_secs"));
    }

    #[test]
    fn test_retained_files_must_be_bounded() {
        let mut config = valid_config();
        config.uploads.max_retained_files = 0;
        let report = ConfigManager::validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| e.field == "uploads.max_retained_files"));

        // 不保留本地副本时该上限不生效
        config.uploads.retain_local_files = false;
        assert!(ConfigManager::validate_config(&config).is_valid());
    }

    #[test]
    fn test_bucket_key_rule() {
        assert!(is_valid_bucket_key("bucket62218"));
        assert!(is_valid_bucket_key("my-bucket_1.v2"));
        assert!(!is_valid_bucket_key("ab"));
        assert!(!is_valid_bucket_key("Bucket"));
        assert!(!is_valid_bucket_key("your bucket"));
        assert!(!is_valid_bucket_key(&"a".repeat(129)));
    }
}
