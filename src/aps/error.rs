use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// APS 调用链路上的错误
///
/// 每一步对应一个变体，调用方据此区分失败位置；没有任何自动重试。
#[derive(Debug, Error)]
pub enum ApsError {
    #[error("APS 认证失败: HTTP {status}: {body}")]
    Authentication { status: StatusCode, body: String },

    #[error("获取签名上传地址失败: HTTP {status}: {body}")]
    SignedUpload { status: StatusCode, body: String },

    #[error("签名上传凭据中没有可用的上传地址")]
    EmptyUploadTicket,

    #[error("文件直传失败: HTTP {status}")]
    Transfer { status: StatusCode },

    /// 直传成功但响应中没有 ETag，无法完成上传
    #[error("文件直传响应缺少 ETag")]
    MissingEtag,

    #[error("完成上传失败: HTTP {status}: {body}")]
    Finalize { status: StatusCode, body: String },

    #[error("提交模型转换任务失败: HTTP {status}: {body}")]
    TranslationSubmit { status: StatusCode, body: String },

    #[error("模型转换失败: urn={urn}")]
    TranslationFailed { urn: String, manifest: Value },

    #[error("模型转换超时: urn={urn}, 已等待 {timeout_secs} 秒")]
    TranslationTimeout { urn: String, timeout_secs: u64 },

    #[error("删除对象失败: HTTP {status}: {body}")]
    Delete { status: StatusCode, body: String },

    #[error("查询对象列表失败: HTTP {status}: {body}")]
    ListObjects { status: StatusCode, body: String },

    #[error("APS 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("读取本地文件失败: {0}")]
    Io(#[from] std::io::Error),
}

impl ApsError {
    /// 远端返回的 HTTP 状态码（若有）
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            ApsError::Authentication { status, .. }
            | ApsError::SignedUpload { status, .. }
            | ApsError::Transfer { status }
            | ApsError::Finalize { status, .. }
            | ApsError::TranslationSubmit { status, .. }
            | ApsError::Delete { status, .. }
            | ApsError::ListObjects { status, .. } => Some(*status),
            ApsError::Http(err) => err.status(),
            _ => None,
        }
    }
}
