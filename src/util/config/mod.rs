//! 配置管理模块
//!
//! - types: 配置数据结构定义
//! - loader: 配置加载、环境变量覆盖与模板生成

pub mod loader;
pub mod types;

pub use loader::{ConfigLoader, ConfigWriter};
pub use types::*;

impl Config {
    /// 从YAML文件读取配置
    pub fn read_yaml(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        ConfigLoader::read_yaml(path)
    }

    /// 写入YAML到指定路径
    pub fn write_yaml_to_path(&self, path: &std::path::Path) -> anyhow::Result<()> {
        ConfigWriter::write_yaml_with_dir(self, path)
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigWriter::generate_template()
    }
}
