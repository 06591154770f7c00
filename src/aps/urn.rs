use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::fmt;

/// 模型转换使用的文档标识：对象 ID 的 base64（URL 安全字母表，无填充）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DesignUrn(String);

impl DesignUrn {
    pub fn from_object_id(object_id: &str) -> Self {
        Self(URL_SAFE_NO_PAD.encode(object_id.as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 还原对象 ID，容忍末尾残留的 `=`
    pub fn decode_object_id(&self) -> Result<String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(self.0.trim_end_matches('='))
            .context("URN 不是合法的 base64")?;
        String::from_utf8(bytes).context("URN 解码结果不是 UTF-8")
    }
}

impl fmt::Display for DesignUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
